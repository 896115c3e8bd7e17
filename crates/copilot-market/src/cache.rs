//! Caching layer for fetched price series

use crate::api::{Interval, MarketDataSource, SeriesRequest};
use crate::error::Result;
use crate::ohlcv::OhlcvPoint;
use async_trait::async_trait;
use cached::{Cached, TimedCache};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Cache key for a series request
///
/// Start and end are truncated to the minute so requests built from "now"
/// a few seconds apart share an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesKey {
    pub symbol: String,
    pub interval: Interval,
    pub start_minute: i64,
    pub end_minute: i64,
}

impl From<&SeriesRequest> for SeriesKey {
    fn from(request: &SeriesRequest) -> Self {
        Self {
            symbol: request.symbol.clone(),
            interval: request.interval,
            start_minute: request.start.timestamp().div_euclid(60),
            end_minute: request.end.timestamp().div_euclid(60),
        }
    }
}

/// Thread-safe TTL cache of price series
///
/// Expired entries are dropped on every insert; keys built from "now" are
/// rarely read again once their minute has passed.
#[derive(Clone)]
pub struct SeriesCache {
    cache: Arc<Mutex<TimedCache<SeriesKey, Vec<OhlcvPoint>>>>,
}

impl SeriesCache {
    /// Create a new cache with specified TTL
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Arc::new(Mutex::new(TimedCache::with_lifespan(ttl))),
        }
    }

    /// Get a series from the cache
    pub async fn get(&self, key: &SeriesKey) -> Option<Vec<OhlcvPoint>> {
        let mut cache = self.cache.lock().await;
        cache.cache_get(key).cloned()
    }

    /// Insert a series into the cache
    pub async fn insert(&self, key: SeriesKey, series: Vec<OhlcvPoint>) {
        let mut cache = self.cache.lock().await;
        cache.flush();
        let _ = cache.cache_set(key, series);
    }

    /// Clear all cached entries
    pub async fn clear(&self) {
        let mut cache = self.cache.lock().await;
        cache.cache_clear();
    }

    /// Get the number of cached entries
    pub async fn len(&self) -> usize {
        let cache = self.cache.lock().await;
        cache.cache_size()
    }

    /// Check if the cache is empty
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Market data source that serves repeated requests from a [`SeriesCache`]
///
/// Only successful fetches are cached.
pub struct CachedSource<S> {
    inner: S,
    cache: SeriesCache,
}

impl<S: MarketDataSource> CachedSource<S> {
    /// Wrap `inner` with a cache of the given TTL
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            cache: SeriesCache::new(ttl),
        }
    }

    /// The underlying cache
    pub fn cache(&self) -> &SeriesCache {
        &self.cache
    }
}

#[async_trait]
impl<S: MarketDataSource> MarketDataSource for CachedSource<S> {
    async fn fetch_series(&self, request: &SeriesRequest) -> Result<Vec<OhlcvPoint>> {
        let key = SeriesKey::from(request);
        if let Some(series) = self.cache.get(&key).await {
            tracing::debug!(symbol = %key.symbol, interval = %key.interval, "Series cache hit");
            return Ok(series);
        }

        tracing::debug!(symbol = %key.symbol, interval = %key.interval, "Series cache miss");
        let series = self.inner.fetch_series(request).await?;
        self.cache.insert(key, series.clone()).await;
        Ok(series)
    }
}

//! Yahoo Finance chart client

use super::{MarketDataSource, SeriesRequest};
use crate::config::MarketConfig;
use crate::error::{MarketError, Result};
use crate::ohlcv::OhlcvPoint;
use async_trait::async_trait;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{debug, instrument, warn};
use yahoo_finance_api as yahoo;

/// Yahoo Finance API client
///
/// Coin symbols are quoted against the configured currency (`BTC` is
/// fetched as `BTC-USD`). Transient failures are retried with exponential
/// backoff.
#[derive(Clone)]
pub struct YahooFinanceClient {
    config: Arc<MarketConfig>,
}

impl YahooFinanceClient {
    /// Create a new Yahoo Finance client
    pub fn new(config: Arc<MarketConfig>) -> Self {
        Self { config }
    }

    async fn fetch_once(&self, ticker: &str, request: &SeriesRequest) -> Result<Vec<OhlcvPoint>> {
        let provider = yahoo::YahooConnector::new()
            .map_err(|e| MarketError::YahooFinanceError(e.to_string()))?;

        let start = to_offset(request.start.timestamp())?;
        let end = to_offset(request.end.timestamp())?;

        let call = provider.get_quote_history_interval(ticker, start, end, request.interval.as_str());
        let response = tokio::time::timeout(self.config.request_timeout, call)
            .await
            .map_err(|_| MarketError::Timeout(self.config.request_timeout))?
            .map_err(|e| MarketError::YahooFinanceError(e.to_string()))?;

        let quotes = response.quotes().map_err(|e| MarketError::DataUnavailable {
            symbol: ticker.to_string(),
            reason: e.to_string(),
        })?;

        let total = quotes.len();
        let series: Vec<OhlcvPoint> = quotes
            .iter()
            .filter_map(|q| {
                let timestamp = i64::try_from(q.timestamp).ok()?;
                OhlcvPoint::new(q.open, q.high, q.low, q.close, q.volume as f64, timestamp)
            })
            .filter(OhlcvPoint::has_prices)
            .collect();

        debug!(ticker, bars = series.len(), dropped = total - series.len(), "Fetched series");
        Ok(series)
    }
}

fn to_offset(timestamp: i64) -> Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp(timestamp)
        .map_err(|e| MarketError::InvalidTimeRange(format!("invalid timestamp {timestamp}: {e}")))
}

fn is_transient(err: &MarketError) -> bool {
    matches!(
        err,
        MarketError::YahooFinanceError(_) | MarketError::Timeout(_)
    )
}

#[async_trait]
impl MarketDataSource for YahooFinanceClient {
    #[instrument(skip(self, request), fields(symbol = %request.symbol, interval = %request.interval))]
    async fn fetch_series(&self, request: &SeriesRequest) -> Result<Vec<OhlcvPoint>> {
        let ticker = self.config.ticker(&request.symbol);
        let mut attempt = 0;
        loop {
            match self.fetch_once(&ticker, request).await {
                Ok(series) => return Ok(series),
                Err(err) if attempt < self.config.max_retries && is_transient(&err) => {
                    let backoff = self.config.retry_backoff(attempt);
                    warn!(%ticker, attempt, error = %err, ?backoff, "Retrying market data fetch");
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

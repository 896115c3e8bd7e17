//! Market data sources

pub mod yahoo;

pub use yahoo::YahooFinanceClient;

use crate::error::{MarketError, Result};
use crate::ohlcv::OhlcvPoint;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

/// Bar size of a price series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interval {
    OneMinute,
    FiveMinutes,
    FifteenMinutes,
    ThirtyMinutes,
    OneHour,
    OneDay,
    OneWeek,
    OneMonth,
}

impl Interval {
    /// Every supported interval, shortest first
    pub const ALL: [Interval; 8] = [
        Self::OneMinute,
        Self::FiveMinutes,
        Self::FifteenMinutes,
        Self::ThirtyMinutes,
        Self::OneHour,
        Self::OneDay,
        Self::OneWeek,
        Self::OneMonth,
    ];

    /// Wire name used by the market-data tool and the chart API
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneMinute => "1m",
            Self::FiveMinutes => "5m",
            Self::FifteenMinutes => "15m",
            Self::ThirtyMinutes => "30m",
            Self::OneHour => "1h",
            Self::OneDay => "1d",
            Self::OneWeek => "1wk",
            Self::OneMonth => "1mo",
        }
    }

    /// Wire names of every supported interval
    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|i| i.as_str()).collect()
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|i| i.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| MarketError::InvalidInterval(s.to_string()))
    }
}

/// A request for the bars of one symbol over a time window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesRequest {
    /// Coin or ticker symbol as the user named it (`BTC`)
    pub symbol: String,
    pub interval: Interval,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SeriesRequest {
    /// Create a request, rejecting empty symbols and empty windows
    pub fn new(
        symbol: impl Into<String>,
        interval: Interval,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Self> {
        let symbol = symbol.into().trim().to_uppercase();
        if symbol.is_empty() {
            return Err(MarketError::InvalidParameter("symbol must not be empty".to_string()));
        }
        if start >= end {
            return Err(MarketError::InvalidTimeRange(format!(
                "start {start} is not before end {end}"
            )));
        }
        Ok(Self {
            symbol,
            interval,
            start,
            end,
        })
    }
}

/// Capability that returns an ordered OHLCV series
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Fetch the bars for `request`, oldest first
    async fn fetch_series(&self, request: &SeriesRequest) -> Result<Vec<OhlcvPoint>>;
}

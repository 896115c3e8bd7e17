//! Configuration for market data access

use crate::api::Interval;
use crate::error::{MarketError, Result};
use chrono::{Duration as Span, Months};
use std::time::Duration;

/// Configuration for fetching market data
#[derive(Debug, Clone)]
pub struct MarketConfig {
    /// Quote currency appended to coin symbols (`BTC` -> `BTC-USD`)
    pub quote_currency: String,

    /// Bar interval used when a request does not name one
    pub default_interval: Interval,

    /// Lookback used when a request has no start time (e.g. `2mo`, `7d`)
    pub default_lookback: String,

    /// How long fetched series stay cached
    pub cache_ttl: Duration,

    /// Maximum number of retries for API calls
    pub max_retries: u32,

    /// Initial backoff duration for retries
    pub retry_backoff_base: Duration,

    /// Request timeout duration
    pub request_timeout: Duration,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            quote_currency: "USD".to_string(),
            default_interval: Interval::OneDay,
            default_lookback: "2mo".to_string(),
            cache_ttl: Duration::from_secs(60),
            max_retries: 3,
            retry_backoff_base: Duration::from_secs(1),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl MarketConfig {
    /// Create a new configuration builder
    pub fn builder() -> MarketConfigBuilder {
        MarketConfigBuilder::default()
    }

    /// Load configuration from environment variables
    ///
    /// Reads `MARKET_QUOTE_CURRENCY`, `MARKET_INTERVAL`, `MARKET_LOOKBACK` and
    /// `MARKET_CACHE_TTL_SECS`; unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        let mut builder = Self::builder();
        if let Ok(currency) = std::env::var("MARKET_QUOTE_CURRENCY") {
            builder = builder.quote_currency(currency);
        }
        if let Ok(interval) = std::env::var("MARKET_INTERVAL") {
            builder = builder.default_interval(interval.parse()?);
        }
        if let Ok(lookback) = std::env::var("MARKET_LOOKBACK") {
            builder = builder.default_lookback(lookback);
        }
        if let Ok(ttl) = std::env::var("MARKET_CACHE_TTL_SECS") {
            let secs = ttl.parse::<u64>().map_err(|e| {
                MarketError::ConfigError(format!("MARKET_CACHE_TTL_SECS is not a number: {e}"))
            })?;
            builder = builder.cache_ttl(Duration::from_secs(secs));
        }
        builder.build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.quote_currency.trim().is_empty() {
            return Err(MarketError::ConfigError(
                "quote_currency must not be empty".to_string(),
            ));
        }

        if self.max_retries == 0 {
            return Err(MarketError::ConfigError(
                "max_retries must be greater than 0".to_string(),
            ));
        }

        parse_lookback(&self.default_lookback)
            .map_err(|e| MarketError::ConfigError(e.to_string()))?;
        Ok(())
    }

    /// Get retry backoff duration for attempt number
    pub fn retry_backoff(&self, attempt: u32) -> Duration {
        self.retry_backoff_base * 2_u32.saturating_pow(attempt)
    }

    /// Exchange ticker for a coin symbol
    ///
    /// Symbols that already name a pair (`ETH-EUR`) are kept as given.
    pub fn ticker(&self, symbol: &str) -> String {
        let symbol = symbol.trim().to_uppercase();
        if symbol.contains('-') {
            symbol
        } else {
            format!("{symbol}-{}", self.quote_currency)
        }
    }
}

/// Parse a lookback such as `12h`, `7d`, `2w`, `2mo` or `1y`
pub fn parse_lookback(lookback: &str) -> Result<Lookback> {
    let lookback = lookback.trim();
    let split = lookback
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(lookback.len());
    let (count, unit) = lookback.split_at(split);
    let invalid = || MarketError::InvalidTimeRange(format!("invalid lookback '{lookback}'"));
    let count: u32 = count.parse().map_err(|_| invalid())?;

    let span = match unit {
        "h" => Span::try_hours(i64::from(count)),
        "d" => Span::try_days(i64::from(count)),
        "w" | "wk" => Span::try_weeks(i64::from(count)),
        "mo" => return Ok(Lookback::Months(Months::new(count))),
        "y" => {
            let months = count.checked_mul(12).ok_or_else(invalid)?;
            return Ok(Lookback::Months(Months::new(months)));
        }
        _ => None,
    };
    span.map(Lookback::Span).ok_or_else(invalid)
}

/// Parsed lookback window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookback {
    /// Fixed duration
    Span(Span),
    /// Calendar months
    Months(Months),
}

impl Lookback {
    /// Start of the window ending at `end`
    pub fn start_from(self, end: chrono::DateTime<chrono::Utc>) -> Result<chrono::DateTime<chrono::Utc>> {
        let start = match self {
            Self::Span(span) => end.checked_sub_signed(span),
            Self::Months(months) => end.checked_sub_months(months),
        };
        start.ok_or_else(|| MarketError::InvalidTimeRange("lookback is out of range".to_string()))
    }
}

/// Builder for MarketConfig
#[derive(Debug, Default)]
pub struct MarketConfigBuilder {
    quote_currency: Option<String>,
    default_interval: Option<Interval>,
    default_lookback: Option<String>,
    cache_ttl: Option<Duration>,
    max_retries: Option<u32>,
    retry_backoff_base: Option<Duration>,
    request_timeout: Option<Duration>,
}

impl MarketConfigBuilder {
    /// Set the quote currency
    pub fn quote_currency(mut self, currency: impl Into<String>) -> Self {
        self.quote_currency = Some(currency.into());
        self
    }

    /// Set the default bar interval
    pub fn default_interval(mut self, interval: Interval) -> Self {
        self.default_interval = Some(interval);
        self
    }

    /// Set the default lookback
    pub fn default_lookback(mut self, lookback: impl Into<String>) -> Self {
        self.default_lookback = Some(lookback.into());
        self
    }

    /// Set the series cache TTL
    pub fn cache_ttl(mut self, duration: Duration) -> Self {
        self.cache_ttl = Some(duration);
        self
    }

    /// Set maximum retries
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Set retry backoff base duration
    pub fn retry_backoff_base(mut self, duration: Duration) -> Self {
        self.retry_backoff_base = Some(duration);
        self
    }

    /// Set request timeout
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<MarketConfig> {
        let defaults = MarketConfig::default();

        let config = MarketConfig {
            quote_currency: self
                .quote_currency
                .map_or(defaults.quote_currency, |c| c.trim().to_uppercase()),
            default_interval: self.default_interval.unwrap_or(defaults.default_interval),
            default_lookback: self.default_lookback.unwrap_or(defaults.default_lookback),
            cache_ttl: self.cache_ttl.unwrap_or(defaults.cache_ttl),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            retry_backoff_base: self.retry_backoff_base.unwrap_or(defaults.retry_backoff_base),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
        };

        config.validate()?;
        Ok(config)
    }
}

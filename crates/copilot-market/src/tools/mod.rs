//! Market tools exposed to the language model

mod market_data;
mod technical;

pub use market_data::{FETCH_MARKET_DATA, FetchMarketDataTool};
pub use technical::{ANALYZE_TECHNICAL_INDICATORS, TechnicalIndicatorTool};

use crate::api::{MarketDataSource, SeriesRequest};
use crate::config::{MarketConfig, parse_lookback};
use crate::error::{MarketError, Result};
use chrono::{DateTime, Days, NaiveDate, Utc};
use copilot_tools::ToolRegistry;
use std::sync::Arc;

/// Registry holding both market tools, market data first
pub fn registry(
    source: Arc<dyn MarketDataSource>,
    config: Arc<MarketConfig>,
) -> copilot_core::Result<ToolRegistry> {
    ToolRegistry::builder()
        .register(Arc::new(FetchMarketDataTool::new(source.clone(), config.clone())))
        .register(Arc::new(TechnicalIndicatorTool::new(source, config)))
        .build()
}

/// Build a series request from tool arguments
///
/// `end` defaults to now and `start` to the configured lookback before
/// `end`. A date-only `end` covers that whole day.
fn series_request(
    config: &MarketConfig,
    symbol: &str,
    interval: Option<&str>,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<SeriesRequest> {
    let interval = match interval {
        Some(name) => name.parse()?,
        None => config.default_interval,
    };
    let end = match end {
        Some(text) => parse_time(text, true)?,
        None => Utc::now(),
    };
    let start = match start {
        Some(text) => parse_time(text, false)?,
        None => parse_lookback(&config.default_lookback)?.start_from(end)?,
    };
    SeriesRequest::new(symbol, interval, start, end)
}

/// Parse an RFC 3339 timestamp or a `YYYY-MM-DD` date
fn parse_time(text: &str, end_of_day: bool) -> Result<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(text) {
        return Ok(at.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|_| {
        MarketError::InvalidTimeRange(format!(
            "'{text}' is neither an RFC 3339 timestamp nor a YYYY-MM-DD date"
        ))
    })?;
    let date = if end_of_day {
        date.checked_add_days(Days::new(1))
            .ok_or_else(|| MarketError::InvalidTimeRange(format!("'{text}' is out of range")))?
    } else {
        date
    };
    Ok(date.and_time(chrono::NaiveTime::MIN).and_utc())
}

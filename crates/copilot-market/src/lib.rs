//! Market data and technical analysis for the trading copilot
//!
//! This crate provides:
//!
//! - [`OhlcvPoint`] price bars and the [`MarketDataSource`] capability
//! - A Yahoo Finance client with retries and a TTL [`CachedSource`]
//! - The pure [`indicators`] engine (SMA, EMA, RSI, MACD, Bollinger Bands)
//! - The local buy/sell/hold decision in [`analysis`]
//! - The `fetch_market_data` and `analyze_technical_indicators` tools
//! - Chart screenshot analysis via a multi-modal model in [`vision`]

pub mod analysis;
pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod indicators;
pub mod ohlcv;
pub mod tools;
pub mod vision;

pub use analysis::{IndicatorRow, Recommendation, Signal, indicator_rows, recommend, summarize};
pub use api::{Interval, MarketDataSource, SeriesRequest, YahooFinanceClient};
pub use cache::{CachedSource, SeriesCache};
pub use config::MarketConfig;
pub use error::{MarketError, Result};
pub use ohlcv::{OhlcvPoint, PriceField};
pub use tools::{
    ANALYZE_TECHNICAL_INDICATORS, FETCH_MARKET_DATA, FetchMarketDataTool, TechnicalIndicatorTool,
};
pub use vision::{ChartDescription, ChartImageAnalyzer};

//! Error types for market data and indicator operations

use thiserror::Error;

/// Market data and indicator errors
#[derive(Debug, Error)]
pub enum MarketError {
    /// Indicator parameter out of range
    #[error("Invalid indicator parameter: {0}")]
    InvalidParameter(String),

    /// Unsupported bar interval
    #[error("Unsupported interval: {0}")]
    InvalidInterval(String),

    /// Requested time range is malformed or empty
    #[error("Invalid time range: {0}")]
    InvalidTimeRange(String),

    /// Data not available for the requested symbol
    #[error("Data not available for {symbol}: {reason}")]
    DataUnavailable {
        /// Ticker that was requested
        symbol: String,
        /// Provider explanation
        reason: String,
    },

    /// Yahoo Finance API error
    #[error("Yahoo Finance error: {0}")]
    YahooFinanceError(String),

    /// The request did not complete within the configured timeout
    #[error("Request timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Chart image could not be analysed
    #[error("Image analysis error: {0}")]
    VisionError(String),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type alias for market operations
pub type Result<T> = std::result::Result<T, MarketError>;

/// Market failures inside a conversation are tool failures
impl From<MarketError> for copilot_core::Error {
    fn from(err: MarketError) -> Self {
        match err {
            MarketError::ConfigError(msg) => copilot_core::Error::Configuration(msg),
            MarketError::VisionError(msg) => copilot_core::Error::Capability(msg),
            other => copilot_core::Error::ToolFailure(other.to_string()),
        }
    }
}

impl From<copilot_llm::LLMError> for MarketError {
    fn from(err: copilot_llm::LLMError) -> Self {
        MarketError::VisionError(err.to_string())
    }
}

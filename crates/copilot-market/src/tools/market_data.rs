//! Tool for fetching OHLCV bars

use super::series_request;
use crate::api::{Interval, MarketDataSource};
use crate::config::MarketConfig;
use crate::error::{MarketError, Result};
use async_trait::async_trait;
use copilot_core::Result as CoreResult;
use copilot_llm::tools::schema;
use copilot_tools::Tool;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::info;

/// Registered name of the market-data tool
pub const FETCH_MARKET_DATA: &str = "fetch_market_data";

/// Tool returning the ordered OHLCV series for a coin
pub struct FetchMarketDataTool {
    source: Arc<dyn MarketDataSource>,
    config: Arc<MarketConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FetchParams {
    symbol: String,
    #[serde(default)]
    interval: Option<String>,
    #[serde(default)]
    time_start: Option<String>,
    #[serde(default)]
    time_end: Option<String>,
}

impl FetchMarketDataTool {
    /// Create a new market-data tool
    pub fn new(source: Arc<dyn MarketDataSource>, config: Arc<MarketConfig>) -> Self {
        Self { source, config }
    }

    async fn fetch(&self, params: FetchParams) -> Result<Value> {
        let request = series_request(
            &self.config,
            &params.symbol,
            params.interval.as_deref(),
            params.time_start.as_deref(),
            params.time_end.as_deref(),
        )?;
        let series = self.source.fetch_series(&request).await?;
        info!(
            symbol = %request.symbol,
            interval = %request.interval,
            bars = series.len(),
            "Market data fetched"
        );
        Ok(serde_json::to_value(series)?)
    }
}

#[async_trait]
impl Tool for FetchMarketDataTool {
    async fn execute(&self, params: Value) -> CoreResult<Value> {
        let params: FetchParams = serde_json::from_value(params)
            .map_err(|e| MarketError::InvalidParameter(e.to_string()))?;

        Ok(self.fetch(params).await?)
    }

    fn name(&self) -> &str {
        FETCH_MARKET_DATA
    }

    fn description(&self) -> &str {
        "Fetch historical OHLCV price bars for a cryptocurrency (e.g. BTC, ETH, SOL) \
         over a time window. Use it before giving any trading recommendation."
    }

    fn input_schema(&self) -> Value {
        schema::object(
            json!({
                "symbol": schema::string("The cryptocurrency symbol, e.g. \"BTC\""),
                "interval": schema::string_enum("Bar size. Default is \"1d\"", &Interval::names()),
                "timeStart": schema::string(
                    "Window start as an RFC 3339 timestamp or YYYY-MM-DD date. Defaults to the configured lookback"
                ),
                "timeEnd": schema::string(
                    "Window end as an RFC 3339 timestamp or YYYY-MM-DD date. Defaults to now"
                ),
            }),
            vec!["symbol"],
        )
    }

    fn failure_label(&self) -> String {
        "Failed to fetch market data".to_string()
    }
}

//! Tool computing technical indicators over a fetched series

use super::series_request;
use crate::analysis::{
    BOLLINGER_MULTIPLIER, BOLLINGER_PERIOD, MACD_FAST, MACD_SIGNAL, MACD_SLOW, RSI_PERIOD,
    SMA_PERIOD,
};
use crate::api::{Interval, MarketDataSource};
use crate::config::MarketConfig;
use crate::error::{MarketError, Result};
use crate::indicators::{self, BollingerBands, IndicatorSeries, MacdSeries};
use crate::ohlcv::{OhlcvPoint, PriceField};
use async_trait::async_trait;
use copilot_core::Result as CoreResult;
use copilot_llm::tools::schema;
use copilot_tools::Tool;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::info;

/// Registered name of the technical-analysis tool
pub const ANALYZE_TECHNICAL_INDICATORS: &str = "analyze_technical_indicators";

const INDICATOR_NAMES: [&str; 4] = ["sma", "rsi", "macd", "bollinger"];

/// Tool returning a series together with the requested indicators
pub struct TechnicalIndicatorTool {
    source: Arc<dyn MarketDataSource>,
    config: Arc<MarketConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum IndicatorKind {
    Sma,
    Rsi,
    Macd,
    Bollinger,
}

#[derive(Debug, Deserialize)]
struct AnalyzeParams {
    symbol: String,
    #[serde(default)]
    interval: Option<String>,
    indicators: Vec<IndicatorKind>,
    #[serde(default)]
    params: IndicatorParams,
}

/// Indicator periods; zero or absent values take the defaults
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndicatorParams {
    sma_period: Option<usize>,
    rsi_period: Option<usize>,
    macd_fast_period: Option<usize>,
    macd_slow_period: Option<usize>,
    macd_signal_period: Option<usize>,
    bollinger_period: Option<usize>,
    bollinger_multiplier: Option<f64>,
}

fn or_default(value: Option<usize>, default: usize) -> usize {
    value.filter(|v| *v != 0).unwrap_or(default)
}

#[derive(Debug, Default, Serialize)]
struct IndicatorValues {
    #[serde(skip_serializing_if = "Option::is_none")]
    sma: Option<IndicatorSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rsi: Option<IndicatorSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    macd: Option<MacdSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bollinger: Option<BollingerBands>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisResult {
    market_data: Vec<OhlcvPoint>,
    indicators: IndicatorValues,
}

fn compute(series: &[OhlcvPoint], kinds: &[IndicatorKind], params: &IndicatorParams) -> Result<IndicatorValues> {
    let mut values = IndicatorValues::default();
    for kind in kinds {
        match kind {
            IndicatorKind::Sma => {
                let period = or_default(params.sma_period, SMA_PERIOD);
                values.sma = Some(indicators::sma(series, period, PriceField::Close)?);
            }
            IndicatorKind::Rsi => {
                let period = or_default(params.rsi_period, RSI_PERIOD);
                values.rsi = Some(indicators::rsi(series, period)?);
            }
            IndicatorKind::Macd => {
                values.macd = Some(indicators::macd(
                    series,
                    or_default(params.macd_fast_period, MACD_FAST),
                    or_default(params.macd_slow_period, MACD_SLOW),
                    or_default(params.macd_signal_period, MACD_SIGNAL),
                )?);
            }
            IndicatorKind::Bollinger => {
                let multiplier = params
                    .bollinger_multiplier
                    .filter(|m| *m != 0.0)
                    .unwrap_or(BOLLINGER_MULTIPLIER);
                values.bollinger = Some(indicators::bollinger(
                    series,
                    or_default(params.bollinger_period, BOLLINGER_PERIOD),
                    multiplier,
                )?);
            }
        }
    }
    Ok(values)
}

impl TechnicalIndicatorTool {
    /// Create a new technical-analysis tool
    pub fn new(source: Arc<dyn MarketDataSource>, config: Arc<MarketConfig>) -> Self {
        Self { source, config }
    }

    async fn analyze(&self, params: AnalyzeParams) -> Result<Value> {
        let request = series_request(&self.config, &params.symbol, params.interval.as_deref(), None, None)?;
        let series = self.source.fetch_series(&request).await?;
        let indicators = compute(&series, &params.indicators, &params.params)?;
        info!(
            symbol = %request.symbol,
            bars = series.len(),
            indicators = ?params.indicators,
            "Technical indicators computed"
        );

        Ok(serde_json::to_value(AnalysisResult {
            market_data: series,
            indicators,
        })?)
    }
}

#[async_trait]
impl Tool for TechnicalIndicatorTool {
    async fn execute(&self, params: Value) -> CoreResult<Value> {
        let params: AnalyzeParams = serde_json::from_value(params)
            .map_err(|e| MarketError::InvalidParameter(e.to_string()))?;

        Ok(self.analyze(params).await?)
    }

    fn name(&self) -> &str {
        ANALYZE_TECHNICAL_INDICATORS
    }

    fn description(&self) -> &str {
        "Compute technical indicators (SMA, RSI, MACD, Bollinger Bands) for a \
         cryptocurrency over its recent price history."
    }

    fn input_schema(&self) -> Value {
        schema::object(
            json!({
                "symbol": schema::string("The cryptocurrency symbol, e.g. \"BTC\""),
                "interval": schema::string_enum("Bar size. Default is \"1d\"", &Interval::names()),
                "indicators": schema::array(
                    "Indicators to compute",
                    schema::string_enum("Indicator name", &INDICATOR_NAMES),
                ),
                "params": schema::object(
                    json!({
                        "smaPeriod": schema::integer("SMA period. Default 14"),
                        "rsiPeriod": schema::integer("RSI period. Default 14"),
                        "macdFastPeriod": schema::integer("MACD fast EMA period. Default 12"),
                        "macdSlowPeriod": schema::integer("MACD slow EMA period. Default 26"),
                        "macdSignalPeriod": schema::integer("MACD signal period. Default 9"),
                        "bollingerPeriod": schema::integer("Bollinger period. Default 20"),
                        "bollingerMultiplier": schema::number("Bollinger band width in standard deviations. Default 2"),
                    }),
                    vec![],
                ),
            }),
            vec!["symbol", "indicators"],
        )
    }

    fn failure_label(&self) -> String {
        "Failed to perform technical analysis".to_string()
    }
}

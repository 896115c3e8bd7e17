//! Chart image analysis through a multi-modal language model

use crate::error::{MarketError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use copilot_llm::{CompletionRequest, ImageSource, LLMProvider, Message};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Default vision model
pub const DEFAULT_VISION_MODEL: &str = "gpt-4o";

const VISION_TEMPERATURE: f32 = 0.2;
const VISION_MAX_TOKENS: usize = 1024;

const EXTRACTION_PROMPT: &str = "You are an expert trading chart analyzer. Analyze this trading chart image and extract:
1. The cryptocurrency or stock symbol (e.g., BTC, ETH, AAPL)
2. The timeframe of the chart (e.g., 1m, 5m, 15m, 1h, 4h, 1d)
3. Any key price levels visible (support/resistance)
4. Current trend direction (bullish, bearish, or ranging)

Format your response as a JSON object with these exact keys:
{
  \"symbol\": \"detected_symbol\",
  \"timeframe\": \"detected_timeframe\",
  \"priceLevels\": [list_of_key_levels],
  \"trend\": \"detected_trend\"
}

Only return the JSON object, no other text.";

/// A support or resistance level as the model reported it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PriceLevel {
    Price(f64),
    Label(String),
}

impl std::fmt::Display for PriceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Price(p) => write!(f, "{p}"),
            Self::Label(l) => f.write_str(l),
        }
    }
}

/// Fields detected on a chart image; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDescription {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub timeframe: Option<String>,
    #[serde(default)]
    pub price_levels: Option<Vec<PriceLevel>>,
    #[serde(default)]
    pub trend: Option<String>,
}

impl ChartDescription {
    /// Bracketed note appended to the user's message, `None` when nothing was detected
    ///
    /// ```
    /// use copilot_market::vision::ChartDescription;
    ///
    /// let chart = ChartDescription {
    ///     symbol: Some("BTC".into()),
    ///     timeframe: Some("4h".into()),
    ///     ..Default::default()
    /// };
    /// assert_eq!(
    ///     chart.annotation().as_deref(),
    ///     Some("[Chart image: symbol BTC; timeframe 4h]")
    /// );
    /// ```
    pub fn annotation(&self) -> Option<String> {
        let mut parts = Vec::new();
        if let Some(symbol) = self.symbol.as_deref().filter(|s| !s.is_empty()) {
            parts.push(format!("symbol {symbol}"));
        }
        if let Some(timeframe) = self.timeframe.as_deref().filter(|s| !s.is_empty()) {
            parts.push(format!("timeframe {timeframe}"));
        }
        if let Some(levels) = self.price_levels.as_ref().filter(|l| !l.is_empty()) {
            let mut text = String::from("price levels ");
            for (i, level) in levels.iter().enumerate() {
                if i > 0 {
                    text.push_str(", ");
                }
                let _ = write!(text, "{level}");
            }
            parts.push(text);
        }
        if let Some(trend) = self.trend.as_deref().filter(|s| !s.is_empty()) {
            parts.push(format!("trend {trend}"));
        }

        if parts.is_empty() {
            None
        } else {
            Some(format!("[Chart image: {}]", parts.join("; ")))
        }
    }
}

/// Extracts symbol, timeframe, levels and trend from a chart screenshot
pub struct ChartImageAnalyzer {
    provider: Arc<dyn LLMProvider>,
    model: String,
}

impl ChartImageAnalyzer {
    /// Create an analyzer using the default vision model
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self::with_model(provider, DEFAULT_VISION_MODEL)
    }

    /// Create an analyzer using a specific model
    pub fn with_model(provider: Arc<dyn LLMProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// Ask the model to describe `image`
    #[instrument(skip(self, image), fields(model = %self.model))]
    pub async fn analyze(&self, image: ImageSource) -> Result<ChartDescription> {
        let request = CompletionRequest::builder(&self.model)
            .add_message(Message::human_with_images(EXTRACTION_PROMPT, vec![image]))
            .temperature(VISION_TEMPERATURE)
            .max_tokens(VISION_MAX_TOKENS)
            .build();

        let response = self.provider.complete(request).await?;
        let text = response.message.text().unwrap_or_default();
        let description = parse_description(text)?;
        debug!(?description, "Chart analysed");
        Ok(description)
    }
}

/// Parse the JSON object spanning the first `{` to the last `}` of `text`
fn parse_description(text: &str) -> Result<ChartDescription> {
    let object = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => {
            return Err(MarketError::VisionError(
                "Could not extract JSON from model response".to_string(),
            ));
        }
    };
    Ok(serde_json::from_str(object)?)
}

/// Load an image file as base64 with a media type guessed from its extension
pub async fn image_from_file(path: &Path) -> Result<ImageSource> {
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        MarketError::VisionError(format!("cannot read image {}: {e}", path.display()))
    })?;
    Ok(ImageSource::Base64 {
        media_type: media_type(path).to_string(),
        data: STANDARD.encode(bytes),
    })
}

/// Media type for an image path
pub fn media_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use copilot_llm::{CompletionResponse, LLMError};
    use mockall::mock;

    mock! {
        Provider {}

        #[async_trait]
        impl LLMProvider for Provider {
            async fn complete(&self, request: CompletionRequest) -> copilot_llm::Result<CompletionResponse>;
            fn name(&self) -> &str;
        }
    }

    #[test]
    fn test_parse_description_with_surrounding_text() {
        let text = "Sure! Here it is:\n```json\n{\"symbol\": \"ETH\", \"timeframe\": \"1h\", \
                    \"priceLevels\": [3200, \"3450 resistance\"], \"trend\": \"bullish\"}\n```";
        let description = parse_description(text).unwrap();
        assert_eq!(description.symbol.as_deref(), Some("ETH"));
        assert_eq!(
            description.price_levels,
            Some(vec![
                PriceLevel::Price(3200.0),
                PriceLevel::Label("3450 resistance".to_string())
            ])
        );
        assert_eq!(
            description.annotation().unwrap(),
            "[Chart image: symbol ETH; timeframe 1h; price levels 3200, 3450 resistance; trend bullish]"
        );
    }

    #[test]
    fn test_parse_description_without_json() {
        assert!(parse_description("I cannot see a chart").is_err());
        assert!(parse_description("} {").is_err());
    }

    #[test]
    fn test_empty_description_has_no_annotation() {
        let description = parse_description("{}").unwrap();
        assert_eq!(description, ChartDescription::default());
        assert!(description.annotation().is_none());
    }

    #[test]
    fn test_media_type() {
        assert_eq!(media_type(Path::new("chart.PNG")), "image/png");
        assert_eq!(media_type(Path::new("chart.webp")), "image/webp");
        assert_eq!(media_type(Path::new("chart")), "image/jpeg");
    }

    #[tokio::test]
    async fn test_analyze_sends_image() {
        let mut provider = MockProvider::new();
        provider
            .expect_complete()
            .withf(|req| {
                req.model == DEFAULT_VISION_MODEL
                    && req.messages.len() == 1
                    && req.messages[0].images().len() == 1
            })
            .returning(|_| {
                Ok(CompletionResponse::from_message(Message::assistant(
                    r#"{"symbol": "SOL", "trend": "ranging"}"#,
                )))
            });

        let analyzer = ChartImageAnalyzer::new(Arc::new(provider));
        let image = ImageSource::Url {
            url: "https://example.com/chart.png".to_string(),
        };
        let description = analyzer.analyze(image).await.unwrap();
        assert_eq!(description.symbol.as_deref(), Some("SOL"));
        assert!(description.timeframe.is_none());
    }

    #[tokio::test]
    async fn test_provider_failure_is_vision_error() {
        let mut provider = MockProvider::new();
        provider
            .expect_complete()
            .returning(|_| Err(LLMError::RateLimitExceeded("slow down".to_string())));

        let analyzer = ChartImageAnalyzer::new(Arc::new(provider));
        let err = analyzer
            .analyze(ImageSource::Url { url: "x".to_string() })
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::VisionError(_)));
    }
}

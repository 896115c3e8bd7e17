//! OpenAI provider implementation
//!
//! Implements [`LLMProvider`] against the Chat Completions API. Any
//! OpenAI-compatible endpoint works through [`OpenAIConfig::with_api_base`].
//! See: https://platform.openai.com/docs/api-reference/chat
//!
//! # Example
//!
//! ```no_run
//! use copilot_llm::{CompletionRequest, Message, LLMProvider};
//! use copilot_llm::providers::OpenAIProvider;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = OpenAIProvider::from_env()?;
//!
//!     let request = CompletionRequest::builder("gpt-4o-mini")
//!         .add_message(Message::human("What is BTC doing today?"))
//!         .temperature(0.0)
//!         .build();
//!
//!     let response = provider.complete(request).await?;
//!     println!("{}", response.message.text().unwrap_or_default());
//!     Ok(())
//! }
//! ```

use crate::{
    CompletionRequest, CompletionResponse, ImageSource, LLMError, LLMProvider, Message, Result,
    Role, StopReason, TokenUsage, ToolCall, ToolDefinition,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Configuration for OpenAI provider
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// API key for authentication
    pub api_key: String,

    /// Base URL for the API (default: "https://api.openai.com/v1")
    pub api_base: String,

    /// Request timeout in seconds (default: 120)
    pub timeout_secs: u64,

    /// Optional allow-list of model names; `None` accepts any model
    pub supported_models: Option<Vec<String>>,
}

impl OpenAIConfig {
    /// Create a new config with the given API key and default settings
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_OPENAI_API_BASE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            supported_models: None,
        }
    }

    /// Create config from environment variables
    ///
    /// Reads the API key from `OPENAI_API_KEY` and, if set, the base URL
    /// from `OPENAI_API_BASE`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            LLMError::ConfigurationError("OPENAI_API_KEY environment variable not set".to_string())
        })?;

        let api_base = std::env::var("OPENAI_API_BASE")
            .unwrap_or_else(|_| DEFAULT_OPENAI_API_BASE.to_string());

        Ok(Self {
            api_key,
            api_base,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            supported_models: None,
        })
    }

    /// Set custom API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Set request timeout in seconds
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Restrict the provider to the given models
    pub fn with_supported_models(mut self, models: Vec<String>) -> Self {
        self.supported_models = Some(models);
        self
    }
}

/// OpenAI chat-completions provider
pub struct OpenAIProvider {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIProvider {
    /// Create a provider with custom configuration
    pub fn with_config(config: OpenAIConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    /// Create a provider with an API key and default settings
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(OpenAIConfig::new(api_key))
    }

    /// Create a provider from environment variables
    pub fn from_env() -> Result<Self> {
        Self::with_config(OpenAIConfig::from_env()?)
    }

    /// Get the current configuration
    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }

    fn validate_model(&self, model: &str) -> Result<()> {
        match &self.config.supported_models {
            Some(supported) if !supported.iter().any(|m| m == model) => {
                Err(LLMError::InvalidRequest(format!(
                    "Model '{model}' is not in the supported models list: {supported:?}"
                )))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    #[instrument(skip(self, request), fields(model = %request.model, api_base = %self.config.api_base))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        debug!(
            messages = request.messages.len(),
            tools = ?request.tool_names(),
            "Sending chat completion request"
        );

        self.validate_model(&request.model)?;

        let openai_request = OpenAIRequest {
            model: request.model.clone(),
            messages: build_openai_messages(request.system, &request.messages),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            tools: request.tools.as_deref().map(convert_tools),
            stop: request.stop_sequences,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.api_base))
            .bearer_auth(&self.config.api_key)
            .json(&openai_request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;

            return Err(match status.as_u16() {
                401 => LLMError::AuthenticationFailed,
                429 => LLMError::RateLimitExceeded(error_text),
                400 => LLMError::InvalidRequest(error_text),
                404 => LLMError::ModelNotFound(request.model),
                _ => LLMError::RequestFailed(format!("HTTP {status}: {error_text}")),
            });
        }

        let openai_response: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| LLMError::UnexpectedResponse(format!("Failed to parse response: {e}")))?;

        let choice = openai_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LLMError::UnexpectedResponse("No choices in response".to_string()))?;

        debug!(
            finish_reason = %choice.finish_reason,
            prompt_tokens = openai_response.usage.prompt_tokens,
            completion_tokens = openai_response.usage.completion_tokens,
            "Received chat completion"
        );

        Ok(CompletionResponse {
            message: parse_openai_response(choice.message)?,
            stop_reason: map_stop_reason(&choice.finish_reason),
            usage: TokenUsage {
                input_tokens: openai_response.usage.prompt_tokens,
                output_tokens: openai_response.usage.completion_tokens,
            },
        })
    }

    fn name(&self) -> &str {
        "openai"
    }
}

// ============================================================================
// OpenAI-specific request types
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAITool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<OpenAIContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<OpenAIToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

impl OpenAIMessage {
    fn text(role: &'static str, text: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(OpenAIContent::Text(text.into())),
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum OpenAIContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Serialize)]
struct OpenAITool {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: OpenAIFunction,
}

#[derive(Debug, Serialize)]
struct OpenAIFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct OpenAIToolCall {
    id: String,
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: OpenAIFunctionCall,
}

#[derive(Debug, Serialize)]
struct OpenAIFunctionCall {
    name: String,
    arguments: String,
}

// ============================================================================
// OpenAI-specific response types
// ============================================================================

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    usage: OpenAIUsage,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
    finish_reason: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<OpenAIResponseToolCall>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseToolCall {
    id: String,
    function: OpenAIResponseFunctionCall,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
}

// ============================================================================
// Conversion functions
// ============================================================================

/// Build the wire message list, system prompt first
fn build_openai_messages(system: Option<String>, messages: &[Message]) -> Vec<OpenAIMessage> {
    system
        .map(|sys| OpenAIMessage::text("system", sys))
        .into_iter()
        .chain(messages.iter().map(convert_message))
        .collect()
}

fn convert_message(msg: &Message) -> OpenAIMessage {
    let text = msg.text().unwrap_or_default();
    match msg.role() {
        Role::Human if msg.images().is_empty() => OpenAIMessage::text("user", text),
        Role::Human => {
            let mut parts = vec![ContentPart::Text {
                text: text.to_string(),
            }];
            parts.extend(msg.images().iter().map(|image| ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: image_url(image),
                },
            }));
            OpenAIMessage {
                content: Some(OpenAIContent::Parts(parts)),
                ..OpenAIMessage::text("user", "")
            }
        }
        Role::Assistant => OpenAIMessage {
            role: "assistant",
            content: msg.text().map(|t| OpenAIContent::Text(t.to_string())),
            tool_calls: msg.tool_calls().iter().map(convert_tool_call).collect(),
            tool_call_id: None,
            name: None,
        },
        Role::Tool => OpenAIMessage {
            tool_call_id: msg.call_id().map(str::to_string),
            name: msg.tool_name().map(str::to_string),
            ..OpenAIMessage::text("tool", text)
        },
    }
}

fn image_url(source: &ImageSource) -> String {
    match source {
        ImageSource::Url { url } => url.clone(),
        ImageSource::Base64 { media_type, data } => format!("data:{media_type};base64,{data}"),
    }
}

fn convert_tool_call(call: &ToolCall) -> OpenAIToolCall {
    OpenAIToolCall {
        id: call.id.clone(),
        tool_type: "function",
        function: OpenAIFunctionCall {
            name: call.name.clone(),
            arguments: call.arguments.to_string(),
        },
    }
}

fn convert_tools(tools: &[ToolDefinition]) -> Vec<OpenAITool> {
    tools
        .iter()
        .map(|tool| OpenAITool {
            tool_type: "function",
            function: OpenAIFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.input_schema.clone(),
            },
        })
        .collect()
}

/// Parse the assistant reply; tool-call arguments arrive as a JSON string
fn parse_openai_response(msg: OpenAIResponseMessage) -> Result<Message> {
    if msg.tool_calls.is_empty() {
        return Ok(Message::assistant(msg.content.unwrap_or_default()));
    }

    let calls = msg
        .tool_calls
        .into_iter()
        .map(|call| {
            let arguments = serde_json::from_str(&call.function.arguments).map_err(|e| {
                LLMError::UnexpectedResponse(format!("Failed to parse tool arguments: {e}"))
            })?;
            Ok(ToolCall::new(call.id, call.function.name, arguments))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Message::assistant_with_tool_calls(msg.content, calls))
}

fn map_stop_reason(reason: &str) -> StopReason {
    match reason {
        "stop" => StopReason::EndTurn,
        "length" => StopReason::MaxTokens,
        "tool_calls" => StopReason::ToolUse,
        _ => {
            debug!("Unmapped finish reason: {}", reason);
            StopReason::EndTurn
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_provider_creation() {
        let provider = OpenAIProvider::new("test-key").unwrap();
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.config().api_key, "test-key");
        assert_eq!(provider.config().api_base, "https://api.openai.com/v1");
    }

    #[test]
    fn test_custom_config() {
        let config = OpenAIConfig::new("k")
            .with_api_base("http://localhost:8000/v1")
            .with_timeout(30);
        let provider = OpenAIProvider::with_config(config).unwrap();
        assert_eq!(provider.config().api_base, "http://localhost:8000/v1");
        assert_eq!(provider.config().timeout_secs, 30);
    }

    #[test]
    fn test_model_validation() {
        let config = OpenAIConfig::new("k").with_supported_models(vec!["gpt-4o-mini".to_string()]);
        let provider = OpenAIProvider::with_config(config).unwrap();
        assert!(provider.validate_model("gpt-4o-mini").is_ok());
        assert!(matches!(
            provider.validate_model("gpt-3.5-turbo"),
            Err(LLMError::InvalidRequest(_))
        ));

        let open = OpenAIProvider::new("k").unwrap();
        assert!(open.validate_model("anything").is_ok());
    }

    #[test]
    fn test_system_prompt_comes_first() {
        let messages = build_openai_messages(
            Some("You are a reception agent".to_string()),
            &[Message::human("hi")],
        );
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].role, "user");
    }

    #[test]
    fn test_human_with_image_uses_parts() {
        let msg = Message::human_with_images(
            "What's on this chart?",
            vec![ImageSource::Base64 {
                media_type: "image/png".to_string(),
                data: "abc123".to_string(),
            }],
        );
        let wire = serde_json::to_value(convert_message(&msg)).unwrap();
        assert_eq!(wire["role"], "user");
        assert_eq!(wire["content"][0]["type"], "text");
        assert_eq!(wire["content"][1]["type"], "image_url");
        assert_eq!(
            wire["content"][1]["image_url"]["url"],
            "data:image/png;base64,abc123"
        );
    }

    #[test]
    fn test_assistant_tool_calls_conversion() {
        let msg = Message::assistant_with_tool_calls(
            None,
            vec![ToolCall::new(
                "call_1",
                "fetch_market_data",
                json!({"symbol": "BTC"}),
            )],
        );
        let wire = serde_json::to_value(convert_message(&msg)).unwrap();
        assert_eq!(wire["role"], "assistant");
        assert!(wire.get("content").is_none());
        assert_eq!(wire["tool_calls"][0]["id"], "call_1");
        assert_eq!(wire["tool_calls"][0]["type"], "function");
        assert_eq!(
            wire["tool_calls"][0]["function"]["arguments"],
            r#"{"symbol":"BTC"}"#
        );
    }

    #[test]
    fn test_tool_result_conversion() {
        let msg = Message::tool_result("call_1", "fetch_market_data", "[]");
        let wire = convert_message(&msg);
        assert_eq!(wire.role, "tool");
        assert_eq!(wire.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(wire.name.as_deref(), Some("fetch_market_data"));
    }

    #[test]
    fn test_tool_definition_conversion() {
        let tools = convert_tools(&[ToolDefinition::new(
            "analyze_technical_indicators",
            "Compute indicators",
            json!({"type": "object"}),
        )]);
        assert_eq!(tools[0].tool_type, "function");
        assert_eq!(tools[0].function.name, "analyze_technical_indicators");
    }

    #[test]
    fn test_response_with_tool_calls() {
        let response: OpenAIResponseMessage = serde_json::from_value(json!({
            "role": "assistant",
            "content": null,
            "tool_calls": [{
                "id": "call_9",
                "type": "function",
                "function": {"name": "fetch_market_data", "arguments": "{\"symbol\":\"ETH\"}"}
            }]
        }))
        .unwrap();

        let message = parse_openai_response(response).unwrap();
        assert_eq!(message.role(), Role::Assistant);
        assert_eq!(message.text(), None);
        assert_eq!(message.tool_calls()[0].arguments["symbol"], "ETH");
    }

    #[test]
    fn test_response_with_bad_arguments() {
        let response: OpenAIResponseMessage = serde_json::from_value(json!({
            "content": null,
            "tool_calls": [{
                "id": "call_9",
                "type": "function",
                "function": {"name": "fetch_market_data", "arguments": "{not json"}
            }]
        }))
        .unwrap();

        let result = parse_openai_response(response);
        assert!(matches!(result, Err(LLMError::UnexpectedResponse(_))));
    }

    #[test]
    fn test_stop_reason_mapping() {
        assert_eq!(map_stop_reason("stop"), StopReason::EndTurn);
        assert_eq!(map_stop_reason("length"), StopReason::MaxTokens);
        assert_eq!(map_stop_reason("tool_calls"), StopReason::ToolUse);
        assert_eq!(map_stop_reason("content_filter"), StopReason::EndTurn);
    }
}

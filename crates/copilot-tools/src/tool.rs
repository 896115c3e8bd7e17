//! Tool trait definition

use async_trait::async_trait;
use copilot_core::Result;
use copilot_llm::ToolDefinition;
use serde_json::Value;

/// Trait for tools the model can request
///
/// Each tool provides a name, a description, and a JSON schema for its
/// input. Arguments reaching [`Tool::execute`] have already been validated
/// against [`Tool::input_schema`] by the registry.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Execute the tool with validated parameters
    ///
    /// Failures should be reported as [`copilot_core::Error::ToolFailure`];
    /// the registry records them as conversational data.
    async fn execute(&self, params: Value) -> Result<Value>;

    /// Get the tool's name
    ///
    /// Must be unique within a ToolRegistry
    fn name(&self) -> &str;

    /// Get the tool's description
    fn description(&self) -> &str;

    /// Get the tool's input schema (JSON Schema format)
    ///
    /// # Example
    ///
    /// ```
    /// use serde_json::json;
    ///
    /// let schema = json!({
    ///     "type": "object",
    ///     "properties": {
    ///         "symbol": { "type": "string" },
    ///         "interval": { "type": "string", "enum": ["1h", "1d"] }
    ///     },
    ///     "required": ["symbol"]
    /// });
    /// ```
    fn input_schema(&self) -> Value;

    /// Short label used as the `error` field when this tool fails
    fn failure_label(&self) -> String {
        format!("Failed to run {}", self.name())
    }

    /// Definition advertised to the language model
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description(), self.input_schema())
    }
}

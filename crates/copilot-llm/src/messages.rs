//! Message types for conversation history
//!
//! A conversation is an append-only list of [`Message`]s. Assistant messages
//! may carry tool-call intents instead of (or alongside) text; tool messages
//! link a tool result back to the call that produced it through its call id.
//! Messages have no mutating API: once built they are only read.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Message role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Message written by the user
    Human,
    /// Message produced by the model or by a local node
    Assistant,
    /// Result of a tool invocation
    Tool,
}

/// Image source for multi-modal human messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImageSource {
    /// Image from URL
    Url {
        /// Image URL
        url: String,
    },
    /// Base64-encoded image
    Base64 {
        /// Media type (e.g., "image/png")
        media_type: String,
        /// Base64-encoded image data
        data: String,
    },
}

/// A tool invocation requested by the assistant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique ID for this call, echoed back by the tool result
    pub id: String,
    /// Tool name
    pub name: String,
    /// Tool input parameters (JSON)
    pub arguments: Value,
}

impl ToolCall {
    /// Create a new tool call
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    role: Role,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<ToolCall>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    call_id: Option<String>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    is_error: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    images: Vec<ImageSource>,
}

impl Message {
    fn base(role: Role, content: Option<String>) -> Self {
        Self {
            role,
            content,
            tool_calls: Vec::new(),
            tool_name: None,
            call_id: None,
            is_error: false,
            images: Vec::new(),
        }
    }

    /// Create a human message with text
    pub fn human(text: impl Into<String>) -> Self {
        Self::base(Role::Human, Some(text.into()))
    }

    /// Create a human message with text and attached images
    pub fn human_with_images(text: impl Into<String>, images: Vec<ImageSource>) -> Self {
        Self {
            images,
            ..Self::human(text)
        }
    }

    /// Create an assistant message with text
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::base(Role::Assistant, Some(text.into()))
    }

    /// Create an assistant message carrying tool-call intents
    ///
    /// Empty text is normalised to `None`.
    pub fn assistant_with_tool_calls(text: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::base(Role::Assistant, text.filter(|t| !t.is_empty()))
        }
    }

    /// Create a tool result message linked to `call_id`
    pub fn tool_result(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            tool_name: Some(tool_name.into()),
            call_id: Some(call_id.into()),
            ..Self::base(Role::Tool, Some(content.into()))
        }
    }

    /// Create a tool result carrying a structured `{error, message}` payload
    pub fn tool_error(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        error: &str,
        message: &str,
    ) -> Self {
        let payload = json!({ "error": error, "message": message });
        Self {
            is_error: true,
            ..Self::tool_result(call_id, tool_name, payload.to_string())
        }
    }

    /// Message role
    pub fn role(&self) -> Role {
        self.role
    }

    /// Text content, if any
    pub fn text(&self) -> Option<&str> {
        self.content.as_deref()
    }

    /// Pending tool calls (assistant messages only)
    pub fn tool_calls(&self) -> &[ToolCall] {
        &self.tool_calls
    }

    /// Check if this message carries any tool calls
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Name of the tool that produced this result (tool messages only)
    pub fn tool_name(&self) -> Option<&str> {
        self.tool_name.as_deref()
    }

    /// Call id this result answers (tool messages only)
    pub fn call_id(&self) -> Option<&str> {
        self.call_id.as_deref()
    }

    /// Whether this tool result is a structured error payload
    pub fn is_error(&self) -> bool {
        self.is_error
    }

    /// Attached images (human messages only)
    pub fn images(&self) -> &[ImageSource] {
        &self.images
    }

    /// Check if this is a tool result produced by the named tool
    pub fn is_tool_result_for(&self, name: &str) -> bool {
        self.role == Role::Tool && self.tool_name.as_deref() == Some(name)
    }
}

//! Language-model capability for the trading copilot
//!
//! This crate provides provider-agnostic abstractions for talking to a
//! chat model that can request tool calls. It includes:
//!
//! - The conversation [`Message`] model (human, assistant, tool)
//! - Completion request/response types
//! - Tool definitions and JSON-schema builders for function calling
//! - The [`LLMProvider`] trait
//! - An OpenAI-compatible provider (behind the `openai` feature)

pub mod completion;
pub mod error;
pub mod messages;
pub mod provider;
pub mod tools;

// Re-export main types
pub use completion::{CompletionRequest, CompletionResponse, StopReason, TokenUsage};
pub use error::{LLMError, Result};
pub use messages::{ImageSource, Message, Role, ToolCall};
pub use provider::LLMProvider;
pub use tools::ToolDefinition;

// Provider implementations (feature-gated)
#[cfg(feature = "openai")]
pub mod providers;

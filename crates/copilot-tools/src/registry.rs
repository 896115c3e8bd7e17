//! Read-only registry of the tools available to a conversation
//!
//! The registry is assembled once with [`ToolRegistryBuilder`] and never
//! mutated afterwards, so it can be shared between concurrent runs behind an
//! `Arc` without locking.

use crate::{Tool, schema};
use copilot_core::{Error, Result};
use copilot_llm::ToolDefinition;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of dispatching one tool call
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    /// The tool ran and produced a value
    Success(Value),
    /// The arguments were rejected or the tool failed
    Failure {
        /// Short failure label
        error: String,
        /// Failure detail
        message: String,
    },
}

impl ToolOutcome {
    /// Whether this outcome is a failure payload
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    /// Render the outcome as tool-result message content
    pub fn to_content(&self) -> String {
        match self {
            Self::Success(Value::String(text)) => text.clone(),
            Self::Success(value) => value.to_string(),
            Self::Failure { error, message } => {
                json!({ "error": error, "message": message }).to_string()
            }
        }
    }
}

/// Registry of named tools
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Start building a registry
    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder::default()
    }

    /// An empty registry
    pub fn empty() -> Self {
        Self { tools: Vec::new() }
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    /// Tool names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Definitions to advertise to the language model
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    /// Get the number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Validate `arguments` and invoke the named tool
    ///
    /// Fails closed with [`Error::InvalidState`] when no tool has that name.
    /// Invalid arguments and tool errors come back as
    /// [`ToolOutcome::Failure`].
    pub async fn dispatch(&self, name: &str, arguments: Value) -> Result<ToolOutcome> {
        let tool = self
            .get(name)
            .ok_or_else(|| Error::InvalidState(format!("unknown tool requested: {name}")))?;

        if let Err(reason) = schema::validate(&tool.input_schema(), &arguments) {
            warn!(tool = name, %reason, "Rejected tool arguments");
            return Ok(ToolOutcome::Failure {
                error: format!("Invalid arguments for {name}"),
                message: reason,
            });
        }

        debug!(tool = name, "Executing tool");
        match tool.execute(arguments).await {
            Ok(value) => Ok(ToolOutcome::Success(value)),
            Err(err) => {
                warn!(tool = name, error = %err, "Tool failed");
                let message = match err {
                    Error::ToolFailure(message) => message,
                    other => other.to_string(),
                };
                Ok(ToolOutcome::Failure {
                    error: tool.failure_label(),
                    message,
                })
            }
        }
    }
}

/// Builder for [`ToolRegistry`]
#[derive(Default)]
pub struct ToolRegistryBuilder {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistryBuilder {
    /// Add a tool
    pub fn register(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    /// Finish the registry, rejecting duplicate tool names
    pub fn build(self) -> Result<ToolRegistry> {
        for (i, tool) in self.tools.iter().enumerate() {
            if self.tools[..i].iter().any(|t| t.name() == tool.name()) {
                return Err(Error::Configuration(format!(
                    "tool registered twice: {}",
                    tool.name()
                )));
            }
        }
        Ok(ToolRegistry { tools: self.tools })
    }
}

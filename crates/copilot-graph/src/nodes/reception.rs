//! Reception node: asks the language model for the next step

use super::Node;
use crate::config::OrchestratorConfig;
use crate::prompt::reception_prompt;
use crate::router::SENTINEL;
use crate::state::{ConversationState, NodeName, StateDelta};
use async_trait::async_trait;
use copilot_core::{Error, Result};
use copilot_llm::{CompletionRequest, LLMProvider, Role, ToolDefinition};
use copilot_tools::ToolRegistry;
use std::sync::Arc;
use tracing::{debug, info};

/// Presents the history and the tool list to the model
pub struct ReceptionNode {
    provider: Arc<dyn LLMProvider>,
    tools: Vec<ToolDefinition>,
    system_prompt: String,
    config: OrchestratorConfig,
}

impl ReceptionNode {
    /// Create the node, rendering its system instruction once
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        registry: &ToolRegistry,
        config: OrchestratorConfig,
    ) -> Result<Self> {
        Ok(Self {
            provider,
            tools: registry.definitions(),
            system_prompt: reception_prompt(&registry.names(), SENTINEL)?,
            config,
        })
    }
}

#[async_trait]
impl Node for ReceptionNode {
    fn name(&self) -> NodeName {
        NodeName::Reception
    }

    async fn run(&self, state: &ConversationState) -> Result<StateDelta> {
        let mut builder = CompletionRequest::builder(&self.config.model)
            .messages(state.messages().to_vec())
            .system(self.system_prompt.clone())
            .max_tokens(self.config.max_tokens)
            .temperature(self.config.temperature);
        if !self.tools.is_empty() {
            builder = builder.tools(self.tools.clone());
        }

        info!(
            model = %self.config.model,
            messages = state.messages().len(),
            tool_count = self.tools.len(),
            "Sending request to LLM"
        );
        let response = self.provider.complete(builder.build()).await?;
        info!(
            stop_reason = ?response.stop_reason,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "LLM response received"
        );

        let message = response.message;
        if message.role() != Role::Assistant {
            return Err(Error::Capability(format!(
                "model answered with a {:?} message",
                message.role()
            )));
        }

        let preview: String = message.text().unwrap_or("").chars().take(200).collect();
        debug!(tool_calls = message.tool_calls().len(), %preview, "Reception reply");

        Ok(StateDelta::message(NodeName::Reception, message))
    }
}

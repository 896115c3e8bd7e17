//! Tool execution node: runs the pending tool calls

use super::Node;
use crate::state::{ConversationState, NodeName, StateDelta};
use async_trait::async_trait;
use copilot_core::{Error, Result};
use copilot_llm::{Message, Role};
use copilot_tools::{ToolOutcome, ToolRegistry};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Dispatches every tool call of the latest assistant message
///
/// Tool failures become `{error, message}` tool results; only an unknown
/// tool name aborts the run.
pub struct ToolExecutionNode {
    registry: Arc<ToolRegistry>,
}

impl ToolExecutionNode {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Node for ToolExecutionNode {
    fn name(&self) -> NodeName {
        NodeName::ToolExecution
    }

    async fn run(&self, state: &ConversationState) -> Result<StateDelta> {
        let last = state
            .last_message()
            .filter(|m| m.role() == Role::Assistant && m.has_tool_calls())
            .ok_or_else(|| {
                Error::InvalidState("no pending tool calls on the latest message".to_string())
            })?;

        let mut results = Vec::with_capacity(last.tool_calls().len());
        for call in last.tool_calls() {
            let input_preview: String = call.arguments.to_string().chars().take(500).collect();
            info!(tool_name = %call.name, tool_id = %call.id, %input_preview, "Executing tool");

            let started = Instant::now();
            let outcome = self.registry.dispatch(&call.name, call.arguments.clone()).await?;
            let duration_ms = started.elapsed().as_millis() as u64;

            let message = match outcome {
                ToolOutcome::Failure { error, message } => {
                    warn!(tool_name = %call.name, duration_ms, %error, %message, "Tool call failed");
                    Message::tool_error(&call.id, &call.name, &error, &message)
                }
                success @ ToolOutcome::Success(_) => {
                    let content = success.to_content();
                    info!(tool_name = %call.name, duration_ms, result_length = content.len(), "Tool call succeeded");
                    Message::tool_result(&call.id, &call.name, content)
                }
            };
            results.push(message);
        }

        Ok(StateDelta {
            messages: results,
            sender: NodeName::ToolExecution,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Sender;
    use copilot_llm::ToolCall;
    use copilot_tools::Tool;
    use serde_json::{Value, json};

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        async fn execute(&self, params: Value) -> Result<Value> {
            if params["symbol"] == "DOWN" {
                return Err(Error::ToolFailure("upstream unavailable".to_string()));
            }
            Ok(params)
        }

        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the arguments"
        }

        fn input_schema(&self) -> Value {
            json!({
                "type": "object",
                "properties": {"symbol": {"type": "string"}},
                "required": ["symbol"]
            })
        }
    }

    fn node() -> ToolExecutionNode {
        let registry = ToolRegistry::builder().register(Arc::new(EchoTool)).build().unwrap();
        ToolExecutionNode::new(Arc::new(registry))
    }

    fn state(calls: Vec<ToolCall>) -> ConversationState {
        ConversationState::new(
            vec![Message::human("go"), Message::assistant_with_tool_calls(None, calls)],
            Vec::new(),
            Sender::Node(NodeName::Reception),
        )
    }

    #[tokio::test]
    async fn test_one_result_per_call() {
        let delta = node()
            .run(&state(vec![
                ToolCall::new("a", "echo", json!({"symbol": "BTC"})),
                ToolCall::new("b", "echo", json!({"symbol": "DOWN"})),
                ToolCall::new("c", "echo", json!({"symbol": 7})),
            ]))
            .await
            .unwrap();

        assert_eq!(delta.sender, NodeName::ToolExecution);
        let ids: Vec<_> = delta.messages.iter().map(|m| m.call_id().unwrap()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        assert!(!delta.messages[0].is_error());
        assert_eq!(delta.messages[0].text(), Some(r#"{"symbol":"BTC"}"#));

        let payload: Value = serde_json::from_str(delta.messages[1].text().unwrap()).unwrap();
        assert_eq!(payload["error"], "Failed to run echo");
        assert_eq!(payload["message"], "upstream unavailable");

        assert!(delta.messages[2].is_error());
    }

    #[tokio::test]
    async fn test_unknown_tool_fails_closed() {
        let err = node()
            .run(&state(vec![ToolCall::new("a", "place_order", json!({}))]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_state");
    }

    #[tokio::test]
    async fn test_requires_pending_calls() {
        let err = node().run(&ConversationState::from_human("hi")).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_state");
    }
}

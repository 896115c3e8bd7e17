//! Terminal node: finalises the visible answer

use super::Node;
use crate::router::strip_sentinel;
use crate::state::{ConversationState, NodeName, StateDelta};
use async_trait::async_trait;
use copilot_core::{Error, Result};
use copilot_llm::{Message, Role};

/// Repeats the latest assistant text with the sentinel stripped
pub struct TerminalNode;

#[async_trait]
impl Node for TerminalNode {
    fn name(&self) -> NodeName {
        NodeName::Terminal
    }

    async fn run(&self, state: &ConversationState) -> Result<StateDelta> {
        let text = state
            .messages()
            .iter()
            .rev()
            .filter(|m| m.role() == Role::Assistant)
            .find_map(Message::text)
            .ok_or_else(|| Error::InvalidState("no assistant answer to finalise".to_string()))?;

        Ok(StateDelta::message(
            NodeName::Terminal,
            Message::assistant(strip_sentinel(text)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Sender;

    #[tokio::test]
    async fn test_passes_through_stripped_answer() {
        let mut state = ConversationState::from_human("favourite colour?");
        state.apply(StateDelta::message(
            NodeName::Reception,
            Message::assistant("FINAL ANSWER: I can only help with trading."),
        ));

        let delta = TerminalNode.run(&state).await.unwrap();
        assert_eq!(delta.messages[0].text(), Some("I can only help with trading."));
    }

    #[tokio::test]
    async fn test_without_answer_is_invalid() {
        let state = ConversationState::new(vec![Message::human("hi")], Vec::new(), Sender::User);
        assert!(TerminalNode.run(&state).await.is_err());
    }
}

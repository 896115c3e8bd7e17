//! Analysis node: local recommendation over the installed series

use super::Node;
use crate::state::{ConversationState, NodeName, StateDelta};
use async_trait::async_trait;
use copilot_core::Result;
use copilot_llm::Message;
use copilot_market::summarize;
use tracing::info;

/// Runs the indicator engine and writes a recommendation
pub struct AnalysisNode;

#[async_trait]
impl Node for AnalysisNode {
    fn name(&self) -> NodeName {
        NodeName::Analysis
    }

    async fn run(&self, state: &ConversationState) -> Result<StateDelta> {
        let series = state.market_series();
        let summary = summarize(series)?;
        info!(bars = series.len(), "Market data analysed");
        Ok(StateDelta::message(NodeName::Analysis, Message::assistant(summary)))
    }
}

//! Nodes of the orchestration graph
//!
//! Each node reads the conversation state and returns a [`StateDelta`];
//! only the orchestrator applies deltas.

mod analysis;
mod reception;
mod terminal;
mod tool_execution;

pub use analysis::AnalysisNode;
pub use reception::ReceptionNode;
pub use terminal::TerminalNode;
pub use tool_execution::ToolExecutionNode;

use crate::state::{ConversationState, NodeName, StateDelta};
use async_trait::async_trait;
use copilot_core::Result;

/// One step of the graph
#[async_trait]
pub trait Node: Send + Sync {
    /// Name recorded as the sender of this node's delta
    fn name(&self) -> NodeName;

    /// Execute against the current state
    async fn run(&self, state: &ConversationState) -> Result<StateDelta>;
}

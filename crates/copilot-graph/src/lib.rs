//! Conversation orchestration for the trading copilot
//!
//! A run threads a [`ConversationState`] through four nodes
//! (Reception, ToolExecution, Analysis, Terminal). After every node the
//! pure [`route`] function picks the next one; the [`Orchestrator`] drives
//! the loop under a node-visit ceiling and exposes every step as a
//! [`Snapshot`] stream. [`ChatService`] adapts runs to the transports.

pub mod config;
pub mod nodes;
pub mod orchestrator;
pub mod prompt;
pub mod router;
pub mod service;
pub mod state;

pub use config::OrchestratorConfig;
pub use orchestrator::{Orchestrator, OrchestratorBuilder, RunOutcome, Snapshot};
pub use router::{Route, SENTINEL, route};
pub use service::{ChatResponse, ChatService, StreamEvent};
pub use state::{ConversationState, NodeName, Sender, StateDelta};

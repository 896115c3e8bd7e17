//! Conversation state threaded through the node graph

use copilot_core::{Error, Result};
use copilot_llm::{Message, Role};
use copilot_market::OhlcvPoint;
use serde::Serialize;
use std::fmt;

/// Nodes of the orchestration graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeName {
    Reception,
    ToolExecution,
    Analysis,
    Terminal,
}

impl NodeName {
    /// Stable name used in logs and snapshots
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reception => "reception_agent",
            Self::ToolExecution => "call_tool",
            Self::Analysis => "analyze_market_data",
            Self::Terminal => "end",
        }
    }
}

impl fmt::Display for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which party produced the latest state delta
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    /// No node has run yet
    User,
    Node(NodeName),
}

impl Sender {
    /// Whether `node` produced the latest delta
    pub fn is(self, node: NodeName) -> bool {
        self == Self::Node(node)
    }
}

/// State of one conversation run
///
/// `messages` is append-only and `market_series` is replaced wholesale. The
/// state is owned by exactly one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationState {
    messages: Vec<Message>,
    market_series: Vec<OhlcvPoint>,
    sender: Sender,
}

impl ConversationState {
    /// Build a state with every field given explicitly
    pub fn new(messages: Vec<Message>, market_series: Vec<OhlcvPoint>, sender: Sender) -> Self {
        Self {
            messages,
            market_series,
            sender,
        }
    }

    /// Seed a run with prior turns followed by one new human message
    pub fn seeded(history: Vec<Message>, message: Message) -> Result<Self> {
        if message.role() != Role::Human {
            return Err(Error::InvalidState(format!(
                "a run must be seeded with a human message, got {:?}",
                message.role()
            )));
        }
        let mut messages = history;
        messages.push(message);
        Ok(Self::new(messages, Vec::new(), Sender::User))
    }

    /// Seed a run with a single human message
    pub fn from_human(text: impl Into<String>) -> Self {
        Self::new(vec![Message::human(text)], Vec::new(), Sender::User)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn market_series(&self) -> &[OhlcvPoint] {
        &self.market_series
    }

    pub fn sender(&self) -> Sender {
        self.sender
    }

    /// Most recent message
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Replace the market series
    pub fn install_series(&mut self, series: Vec<OhlcvPoint>) {
        self.market_series = series;
    }

    /// Apply a node's delta: append its messages and record it as sender
    pub fn apply(&mut self, delta: StateDelta) {
        self.messages.extend(delta.messages);
        self.sender = Sender::Node(delta.sender);
    }
}

/// What one node execution adds to the state
#[derive(Debug, Clone, PartialEq)]
pub struct StateDelta {
    pub messages: Vec<Message>,
    pub sender: NodeName,
}

impl StateDelta {
    /// Delta appending a single message
    pub fn message(sender: NodeName, message: Message) -> Self {
        Self {
            messages: vec![message],
            sender,
        }
    }
}

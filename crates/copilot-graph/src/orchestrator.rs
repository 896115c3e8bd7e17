//! Orchestration loop over the node graph
//!
//! A run starts at Reception and alternates node execution with
//! [`route`] until the Terminal node has run. Every node execution is
//! yielded as a [`Snapshot`] from a lazy stream; nothing runs until the
//! consumer polls, and dropping the stream abandons the run.

use crate::config::OrchestratorConfig;
use crate::nodes::{AnalysisNode, Node, ReceptionNode, TerminalNode, ToolExecutionNode};
use crate::router::{route, strip_sentinel};
use crate::state::{ConversationState, NodeName, Sender};
use copilot_core::{Error, Result};
use copilot_llm::{LLMProvider, Message, Role};
use copilot_tools::ToolRegistry;
use futures::stream::{self, BoxStream, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// State after one node execution
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    /// 1-based visit number
    pub visit: usize,
    pub node: NodeName,
    /// Text this node produced for the caller, sentinel stripped
    pub chunk: Option<String>,
    pub state: ConversationState,
}

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Final answer text
    pub answer: String,
    pub state: ConversationState,
    /// Node executions performed
    pub visits: usize,
}

/// Drives the node → router → node loop
#[derive(Clone)]
pub struct Orchestrator {
    reception: Arc<dyn Node>,
    tool_execution: Arc<dyn Node>,
    analysis: Arc<dyn Node>,
    terminal: Arc<dyn Node>,
    max_visits: usize,
}

struct Run {
    orchestrator: Orchestrator,
    state: ConversationState,
    visits: usize,
    finished: bool,
}

impl Orchestrator {
    /// Create an orchestrator from a provider and a tool registry
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        registry: Arc<ToolRegistry>,
        config: OrchestratorConfig,
    ) -> Result<Self> {
        let max_visits = config.max_visits;
        let reception = ReceptionNode::new(provider, &registry, config)?;
        Ok(Self::with_nodes(
            Arc::new(reception),
            Arc::new(ToolExecutionNode::new(registry)),
            Arc::new(AnalysisNode),
            Arc::new(TerminalNode),
            max_visits,
        ))
    }

    /// Assemble from explicit nodes
    pub fn with_nodes(
        reception: Arc<dyn Node>,
        tool_execution: Arc<dyn Node>,
        analysis: Arc<dyn Node>,
        terminal: Arc<dyn Node>,
        max_visits: usize,
    ) -> Self {
        Self {
            reception,
            tool_execution,
            analysis,
            terminal,
            max_visits,
        }
    }

    /// Start building an orchestrator
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    fn node(&self, name: NodeName) -> &Arc<dyn Node> {
        match name {
            NodeName::Reception => &self.reception,
            NodeName::ToolExecution => &self.tool_execution,
            NodeName::Analysis => &self.analysis,
            NodeName::Terminal => &self.terminal,
        }
    }

    /// Stream one snapshot per node execution
    ///
    /// The stream ends after the Terminal snapshot or after the first error.
    pub fn stream(&self, seed: ConversationState) -> BoxStream<'static, Result<Snapshot>> {
        let run = Run {
            orchestrator: self.clone(),
            state: seed,
            visits: 0,
            finished: false,
        };
        stream::unfold(run, |mut run| async move {
            if run.finished {
                return None;
            }
            let item = run.step().await;
            run.finished = match &item {
                Ok(snapshot) => snapshot.node == NodeName::Terminal,
                Err(_) => true,
            };
            Some((item, run))
        })
        .boxed()
    }

    /// Drive a run to completion
    pub async fn run(&self, seed: ConversationState) -> Result<RunOutcome> {
        let mut snapshots = self.stream(seed);
        let mut last = None;
        while let Some(item) = snapshots.next().await {
            last = Some(item?);
        }

        let snapshot = last
            .filter(|s| s.node == NodeName::Terminal)
            .ok_or_else(|| Error::InvalidState("run ended before the terminal node".to_string()))?;
        let answer = snapshot
            .state
            .last_message()
            .and_then(Message::text)
            .unwrap_or_default()
            .to_string();

        Ok(RunOutcome {
            answer,
            visits: snapshot.visit,
            state: snapshot.state,
        })
    }

    /// Run with caller-supplied prior turns followed by a new human message
    pub async fn run_with_history(
        &self,
        history: Vec<Message>,
        message: impl Into<String>,
    ) -> Result<RunOutcome> {
        let seed = ConversationState::seeded(history, Message::human(message))?;
        self.run(seed).await
    }
}

impl Run {
    async fn step(&mut self) -> Result<Snapshot> {
        let next = if self.visits == 0 {
            validate_seed(&self.state)?;
            NodeName::Reception
        } else {
            let decision = route(&self.state)?;
            if let Some(series) = decision.market_series {
                info!(bars = series.len(), "Installed market series");
                self.state.install_series(series);
            }
            decision.next
        };

        let limit = self.orchestrator.max_visits;
        if self.visits >= limit {
            warn!(visits = self.visits, limit, "Node visit ceiling reached");
            return Err(Error::RunawayConversation {
                visits: self.visits + 1,
                limit,
            });
        }
        self.visits += 1;

        info!(node = %next, visit = self.visits, "Executing node");
        let delta = self.orchestrator.node(next).run(&self.state).await?;
        let chunk = match next {
            NodeName::Reception | NodeName::Analysis => delta
                .messages
                .iter()
                .filter_map(Message::text)
                .map(strip_sentinel)
                .find(|t| !t.trim().is_empty()),
            NodeName::ToolExecution | NodeName::Terminal => None,
        };
        self.state.apply(delta);

        Ok(Snapshot {
            visit: self.visits,
            node: next,
            chunk,
            state: self.state.clone(),
        })
    }
}

fn validate_seed(state: &ConversationState) -> Result<()> {
    if state.sender() != Sender::User {
        return Err(Error::InvalidState("seed state was already advanced by a node".to_string()));
    }
    match state.last_message() {
        Some(m) if m.role() == Role::Human => Ok(()),
        Some(_) => Err(Error::InvalidState(
            "seed state must end with a human message".to_string(),
        )),
        None => Err(Error::InvalidState("seed state has no messages".to_string())),
    }
}

/// Builder for [`Orchestrator`]
pub struct OrchestratorBuilder {
    provider: Option<Arc<dyn LLMProvider>>,
    registry: Arc<ToolRegistry>,
    config: OrchestratorConfig,
}

impl OrchestratorBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            provider: None,
            registry: Arc::new(ToolRegistry::empty()),
            config: OrchestratorConfig::default(),
        }
    }

    /// Set the LLM provider
    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the tool registry
    pub fn tool_registry(mut self, registry: Arc<ToolRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Set the full configuration
    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the model
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    /// Set maximum node visits
    pub fn max_visits(mut self, max: usize) -> Self {
        self.config.max_visits = max;
        self
    }

    /// Set max tokens
    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.config.max_tokens = max_tokens;
        self
    }

    /// Set temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = temperature;
        self
    }

    /// Build the orchestrator
    pub fn build(self) -> Result<Orchestrator> {
        let provider = self
            .provider
            .ok_or_else(|| Error::Configuration("Provider not set".to_string()))?;
        Orchestrator::new(provider, self.registry, self.config)
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

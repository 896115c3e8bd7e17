//! Transport-facing chat service
//!
//! Wraps the orchestrator with message validation, optional chart-image
//! enrichment and the record types the HTTP and CLI front ends emit.

use crate::config::OrchestratorConfig;
use crate::orchestrator::Orchestrator;
use crate::state::ConversationState;
use copilot_core::{Error, Result};
use copilot_llm::providers::OpenAIProvider;
use copilot_llm::{ImageSource, LLMProvider, Message};
use copilot_market::{
    CachedSource, ChartImageAnalyzer, MarketConfig, MarketDataSource, YahooFinanceClient,
};
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// One record of a streamed answer
///
/// Serialises to exactly one of `{"content": ...}`, `{"done": true}` or
/// `{"error": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StreamEvent {
    Content { content: String },
    Done { done: bool },
    Error { error: String },
}

impl StreamEvent {
    pub fn content(text: impl Into<String>) -> Self {
        Self::Content {
            content: text.into(),
        }
    }

    pub fn done() -> Self {
        Self::Done { done: true }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    /// Whether the stream ends with this event
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Content { .. })
    }
}

/// Response of the single-shot endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

/// Entry point used by the transports
#[derive(Clone)]
pub struct ChatService {
    orchestrator: Orchestrator,
    vision: Option<Arc<ChartImageAnalyzer>>,
}

impl ChatService {
    /// Create a service without image support
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator,
            vision: None,
        }
    }

    /// Assemble the OpenAI-backed service with Yahoo Finance market data
    ///
    /// Reads the provider, market and orchestrator settings from the
    /// environment.
    pub fn from_env() -> Result<Self> {
        let provider: Arc<dyn LLMProvider> = Arc::new(OpenAIProvider::from_env()?);
        let market = Arc::new(MarketConfig::from_env()?);
        let source: Arc<dyn MarketDataSource> = Arc::new(CachedSource::new(
            YahooFinanceClient::new(market.clone()),
            market.cache_ttl,
        ));
        let registry = Arc::new(copilot_market::tools::registry(source, market)?);
        let config = OrchestratorConfig::from_env()?;
        info!(model = %config.model, tools = ?registry.names(), "Assembling chat service");

        let orchestrator = Orchestrator::new(provider.clone(), registry, config)?;
        Ok(Self::new(orchestrator).with_vision(Arc::new(ChartImageAnalyzer::new(provider))))
    }

    /// Enable the image-assisted variants
    pub fn with_vision(mut self, analyzer: Arc<ChartImageAnalyzer>) -> Self {
        self.vision = Some(analyzer);
        self
    }

    /// Answer a message
    pub async fn chat(&self, message: &str) -> Result<String> {
        let seed = seed(message)?;
        let outcome = self.orchestrator.run(seed).await?;
        info!(visits = outcome.visits, "Chat answered");
        Ok(outcome.answer)
    }

    /// Answer a message that follows earlier turns of the same conversation
    pub async fn chat_with_history(&self, history: Vec<Message>, message: &str) -> Result<String> {
        validate(message)?;
        let outcome = self
            .orchestrator
            .run_with_history(history, message.trim())
            .await?;
        Ok(outcome.answer)
    }

    /// Answer a message about a chart image
    pub async fn chat_with_image(&self, message: &str, image: ImageSource) -> Result<String> {
        let enriched = self.enrich(message, image).await?;
        self.chat(&enriched).await
    }

    /// Stream the answer to a message
    ///
    /// Validation and run failures arrive as a final error event.
    pub fn chat_stream(&self, message: &str) -> BoxStream<'static, StreamEvent> {
        match seed(message) {
            Ok(seed) => self.events(seed),
            Err(err) => stream::once(async move { StreamEvent::error(err.to_string()) }).boxed(),
        }
    }

    /// Stream the answer to a message about a chart image
    pub async fn chat_with_image_stream(
        &self,
        message: &str,
        image: ImageSource,
    ) -> BoxStream<'static, StreamEvent> {
        match self.enrich(message, image).await {
            Ok(enriched) => self.chat_stream(&enriched),
            Err(err) => stream::once(async move { StreamEvent::error(err.to_string()) }).boxed(),
        }
    }

    fn events(&self, seed: ConversationState) -> BoxStream<'static, StreamEvent> {
        let snapshots = self.orchestrator.stream(seed);
        stream::unfold(Some(snapshots), |snapshots| async move {
            let mut snapshots = snapshots?;
            loop {
                match snapshots.next().await {
                    Some(Ok(snapshot)) => {
                        if let Some(chunk) = snapshot.chunk {
                            return Some((StreamEvent::content(chunk), Some(snapshots)));
                        }
                    }
                    Some(Err(err)) => {
                        warn!(kind = err.kind(), error = %err, "Run failed");
                        return Some((StreamEvent::error(err.to_string()), None));
                    }
                    None => return Some((StreamEvent::done(), None)),
                }
            }
        })
        .boxed()
    }

    /// Append the chart description to the user's text
    async fn enrich(&self, message: &str, image: ImageSource) -> Result<String> {
        validate(message)?;
        let analyzer = self
            .vision
            .as_ref()
            .ok_or_else(|| Error::Configuration("image analysis is not configured".to_string()))?;

        let description = analyzer.analyze(image).await?;
        Ok(match description.annotation() {
            Some(note) => format!("{}\n\n{note}", message.trim()),
            None => message.trim().to_string(),
        })
    }
}

fn validate(message: &str) -> Result<()> {
    if message.trim().is_empty() {
        return Err(Error::InvalidState("message must not be empty".to_string()));
    }
    Ok(())
}

fn seed(message: &str) -> Result<ConversationState> {
    validate(message)?;
    ConversationState::seeded(Vec::new(), Message::human(message.trim()))
}

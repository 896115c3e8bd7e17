//! Orchestrator configuration

use copilot_core::{Error, Result};

/// Configuration of a conversation run
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Model used by the reception node
    pub model: String,

    /// Max tokens per completion
    pub max_tokens: usize,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum node visits before a run is aborted as runaway
    pub max_visits: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_tokens: 4096,
            temperature: 0.0,
            max_visits: 12,
        }
    }
}

impl OrchestratorConfig {
    /// Defaults overridden by `COPILOT_MODEL` and `COPILOT_MAX_VISITS`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(model) = lookup("COPILOT_MODEL").filter(|m| !m.trim().is_empty()) {
            config.model = model;
        }
        if let Some(max) = lookup("COPILOT_MAX_VISITS") {
            config.max_visits = match max.trim().parse() {
                Ok(0) => {
                    return Err(Error::Configuration(
                        "COPILOT_MAX_VISITS must be greater than 0".to_string(),
                    ));
                }
                Ok(n) => n,
                Err(e) => {
                    return Err(Error::Configuration(format!(
                        "COPILOT_MAX_VISITS is not a number: {e}"
                    )));
                }
            };
        }
        Ok(config)
    }
}

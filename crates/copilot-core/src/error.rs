//! Error types for conversation runs

use thiserror::Error;

/// Result type alias for copilot-core
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for conversation runs
///
/// The first four variants are the run-level taxonomy. `ToolFailure` is the
/// only one a run recovers from: the tool execution node turns it into a
/// structured tool-result message. Everything else aborts the run.
#[derive(Error, Debug)]
pub enum Error {
    /// A tool capability failed while executing
    #[error("Tool failure: {0}")]
    ToolFailure(String),

    /// The language-model capability failed (timeout, provider fault)
    #[error("Capability error: {0}")]
    Capability(String),

    /// The conversation state is structurally invalid for the requested step
    #[error("Invalid conversation state: {0}")]
    InvalidState(String),

    /// The node-visit ceiling was exceeded without reaching the terminal node
    #[error("Runaway conversation: {visits} node visits exceeded the limit of {limit}")]
    RunawayConversation {
        /// Visits performed when the run was aborted
        visits: usize,
        /// Configured ceiling
        limit: usize,
    },

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Generic error message
    #[error("{0}")]
    Generic(String),
}

impl Error {
    /// Stable machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ToolFailure(_) => "tool_failure",
            Self::Capability(_) => "capability_error",
            Self::InvalidState(_) => "invalid_state",
            Self::RunawayConversation { .. } => "runaway_conversation",
            Self::Configuration(_) => "configuration_error",
            Self::Generic(_) => "error",
        }
    }

    /// Whether a run can continue after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::ToolFailure(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Generic(format!("JSON error: {err}"))
    }
}

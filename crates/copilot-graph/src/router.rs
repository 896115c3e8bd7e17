//! Routing policy of the node graph
//!
//! [`route`] is a pure function of the conversation state. Rules are
//! checked in order and the first match wins:
//!
//! 1. latest message is a usable `fetch_market_data` result: Analysis
//! 2. Analysis produced the latest delta: Terminal
//! 3. latest message carries pending tool calls: ToolExecution
//! 4. latest message text contains the sentinel: Terminal
//! 5. otherwise: Reception

use crate::state::{ConversationState, NodeName};
use copilot_core::{Error, Result};
use copilot_llm::{Message, Role};
use copilot_market::{FETCH_MARKET_DATA, OhlcvPoint};
use tracing::debug;

/// Marker an assistant message carries when the run is complete
pub const SENTINEL: &str = "FINAL ANSWER";

/// Routing decision
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Node to run next
    pub next: NodeName,
    /// Series to install before running `next` (rule 1 only)
    pub market_series: Option<Vec<OhlcvPoint>>,
}

impl Route {
    fn to(next: NodeName) -> Self {
        Self {
            next,
            market_series: None,
        }
    }
}

/// Decide the next node for `state`
///
/// Fails with [`Error::InvalidState`] when the history is empty.
pub fn route(state: &ConversationState) -> Result<Route> {
    let last = state
        .last_message()
        .ok_or_else(|| Error::InvalidState("cannot route an empty conversation".to_string()))?;

    let decision = if let Some(series) = market_series_result(last) {
        Route {
            next: NodeName::Analysis,
            market_series: Some(series),
        }
    } else if state.sender().is(NodeName::Analysis) {
        Route::to(NodeName::Terminal)
    } else if last.role() == Role::Assistant && last.has_tool_calls() {
        Route::to(NodeName::ToolExecution)
    } else if last.text().is_some_and(|t| t.contains(SENTINEL)) {
        Route::to(NodeName::Terminal)
    } else {
        Route::to(NodeName::Reception)
    };

    debug!(sender = ?state.sender(), next = %decision.next, "Routed");
    Ok(decision)
}

/// Series carried by a successful market-data tool result
///
/// Error payloads and content that does not parse as a series are not
/// market data.
fn market_series_result(message: &Message) -> Option<Vec<OhlcvPoint>> {
    if !message.is_tool_result_for(FETCH_MARKET_DATA) || message.is_error() {
        return None;
    }
    OhlcvPoint::parse_series(message.text()?).ok()
}

/// Remove the sentinel and the punctuation that usually follows it
pub fn strip_sentinel(text: &str) -> String {
    match text.find(SENTINEL) {
        Some(at) => {
            let before = text[..at].trim_end();
            let after = text[at + SENTINEL.len()..]
                .trim_start_matches([':', '-', ' '])
                .trim_start();
            match (before.is_empty(), after.is_empty()) {
                (true, _) => after.to_string(),
                (false, true) => before.to_string(),
                (false, false) => format!("{before}\n{after}"),
            }
        }
        None => text.to_string(),
    }
}

//! HTTP transport for the trading copilot
//!
//! Exposes [`copilot_graph::ChatService`] over JSON endpoints and
//! server-sent-event streams.

pub mod api;
pub mod config;

pub use api::{ApiError, ApiState, router, serve};
pub use config::ServerConfig;

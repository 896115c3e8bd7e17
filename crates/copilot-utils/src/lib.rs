//! Shared utilities for the trading copilot
//!
//! Logging setup and application configuration used by the binaries.

pub mod config;
pub mod logging;

pub use config::{Config, LogFormat};
pub use logging::{init_tracing, init_tracing_with};

//! Core error types for the trading copilot
//!
//! Every crate in the workspace converts its own failures into
//! [`Error`] at the point where they cross into a conversation run.

pub mod error;

pub use error::{Error, Result};

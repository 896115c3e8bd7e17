//! Tool management and execution framework for the trading copilot
//!
//! Tools are named capabilities the model may request. Each one declares a
//! JSON-schema input shape; the [`ToolRegistry`] validates arguments against
//! it before dispatching, and turns tool failures into [`ToolOutcome::Failure`]
//! data instead of errors.

pub mod registry;
pub mod schema;
pub mod tool;

pub use registry::{ToolOutcome, ToolRegistry, ToolRegistryBuilder};
pub use tool::Tool;

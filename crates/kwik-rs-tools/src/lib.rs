//! Tool interfaces and the coded tools behind Kwik knowledge agents.

pub mod coded;
pub mod context;
pub mod output_policy;
pub mod registry;
pub mod tool;

/// Coded tools and registration helpers.
pub use coded::{coded_tool_registry, register_coded_tools};
/// Tool context and shared services.
pub use context::{KnowledgeSettings, ToolContext, ToolServices};
pub use output_policy::ToolOutputPolicy;
pub use registry::ToolRegistry;
/// Tool trait and spec type.
pub use tool::{Tool, ToolSpec};

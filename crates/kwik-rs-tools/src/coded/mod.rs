//! Coded tools bound into the knowledge agent network.

mod documents;
mod memory;
mod utils;


use crate::ToolRegistry;
use log::info;
use std::sync::Arc;

pub use documents::{
    AddPdfToKnowledgeTool, ExtractPdfKnowledgeTool, ListDocumentsTool, QueryPdfKnowledgeTool,
};
pub use memory::{CommitToMemoryTool, ListTopicsTool, RecallMemoryTool, ReorganizeMemoryTool};

/// Message returned when the vector store has not been created yet.
pub const NO_KNOWLEDGE_BASE: &str = "No knowledge base found. Please upload PDF documents first.";
/// Message returned when a query matched nothing.
pub const NO_RELEVANT_INFORMATION: &str =
    "No relevant information found in the knowledge base for this query.";

/// Register every coded tool with `registry`.
pub fn register_coded_tools(registry: &ToolRegistry) {
    registry.register(Arc::new(AddPdfToKnowledgeTool));
    registry.register(Arc::new(ExtractPdfKnowledgeTool));
    registry.register(Arc::new(QueryPdfKnowledgeTool));
    registry.register(Arc::new(ListDocumentsTool));
    registry.register(Arc::new(CommitToMemoryTool));
    registry.register(Arc::new(RecallMemoryTool));
    registry.register(Arc::new(ListTopicsTool));
    registry.register(Arc::new(ReorganizeMemoryTool));
    info!("registered coded tools (count={})", registry.list().len());
}

/// A registry pre-populated with the coded tools.
pub fn coded_tool_registry() -> ToolRegistry {
    let registry = ToolRegistry::new();
    register_coded_tools(&registry);
    registry
}

//! Error types for the core runtime crate.

use kwik_rs_config::ConfigError;
use kwik_rs_knowledge::KnowledgeError;
use kwik_rs_memory::MemoryError;
use kwik_rs_protocol::{LlmError, ToolError};
use thiserror::Error;

/// Errors returned by the agent runtime and the assistant facade.
#[derive(Debug, Error)]
pub enum KwikCoreError {
    /// Config or network manifest is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Chat model or embeddings backend failed.
    #[error("llm error: {0}")]
    Llm(#[from] LlmError),
    /// Topic memory failed.
    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),
    /// Document store or vector index failed.
    #[error("knowledge error: {0}")]
    Knowledge(#[from] KnowledgeError),
    /// A coded tool invoked outside a turn failed.
    #[error("tool error: {0}")]
    Tool(#[from] ToolError),
    /// Agent id is not part of the network.
    #[error("unknown agent: {0}")]
    UnknownAgent(String),
    /// Agent execution error.
    #[error("executor error: {0}")]
    Executor(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

//! Error types for document loading and retrieval.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    /// Text extraction failed.
    #[error("failed to extract text: {0}")]
    Extraction(String),
    #[error("embedding failed: {0}")]
    Embedding(String),
    /// The persisted index was built with a different embedder.
    #[error("vector store built with {found}, current embedder is {expected}")]
    EmbedderMismatch { expected: String, found: String },
    /// Nothing has been indexed yet.
    #[error("knowledge base is empty")]
    EmptyKnowledgeBase,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// A blocking task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(String),
}

//! Error types for topic memory operations.

/// Errors returned by topic memory stores and synthesizers.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// The backing file could not be read or written.
    #[error("memory storage unavailable: {0}")]
    StorageUnavailable(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Empty topic or fact.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("regex error: {0}")]
    Regex(String),
    /// A synthesizer failed to produce derived facts.
    #[error("synthesis failed: {0}")]
    Synthesis(String),
}

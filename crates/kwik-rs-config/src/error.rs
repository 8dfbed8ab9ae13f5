//! Config and network manifest errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON5 syntax error in a config layer or manifest.
    #[error("config syntax error: {0}")]
    Syntax(#[from] json5::Error),
    /// Merged JSON did not match the typed model.
    #[error("config does not match the schema: {0}")]
    Decode(#[from] serde_json::Error),
    /// A specific key or value was rejected; `path` is a dotted key path.
    #[error("invalid config at {path}: {message}")]
    InvalidField { path: String, message: String },
    #[error("invalid config: {0}")]
    Invalid(String),
    /// Agent network manifest is inconsistent.
    #[error("invalid agent network: {0}")]
    InvalidNetwork(String),
}

//! Configuration for the Kwik knowledge assistant.
//!
//! Owns the config schema, layered JSON5 loading, environment overrides, and
//! the agent network manifest format.

mod error;
mod loader;
mod model;
mod network;

/// Public error type returned by config loading and validation APIs.
pub use error::ConfigError;
/// Layered config types and loader options.
pub use loader::{ConfigLayer, ConfigLayerSource, LayeredConfig, LayeredConfigOptions};
/// Configuration schema models.
pub use model::*;
/// Agent network manifests.
pub use network::{AgentSpec, NetworkConfig};

//! Environment variable overrides applied after layer merging.

use crate::{ConfigError, KwikConfig};
use log::debug;

/// Data directory holding memory, registry, vector store and uploads.
pub const ENV_DATA_DIR: &str = "KWIK_DATA_DIR";
/// Path to a JSON5 agent network manifest.
pub const ENV_NETWORK_MANIFEST: &str = "KWIK_NETWORK_MANIFEST";
pub const ENV_HOST: &str = "KWIK_HOST";
pub const ENV_PORT: &str = "KWIK_PORT";

impl KwikConfig {
    /// Apply overrides from the process environment.
    pub fn apply_process_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides resolved through `lookup`; empty values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(dir) = get(ENV_DATA_DIR) {
            debug!("env override (key={ENV_DATA_DIR}, value={dir})");
            self.storage.root = Some(dir);
        }
        if let Some(manifest) = get(ENV_NETWORK_MANIFEST) {
            debug!("env override (key={ENV_NETWORK_MANIFEST}, value={manifest})");
            self.agents.manifest = Some(manifest);
        }
        if let Some(host) = get(ENV_HOST) {
            debug!("env override (key={ENV_HOST}, value={host})");
            self.server.host = host;
        }
        if let Some(port) = get(ENV_PORT) {
            self.server.port = port.trim().parse().map_err(|_| ConfigError::InvalidField {
                path: format!("env:{ENV_PORT}"),
                message: format!("expected a port number, got {port:?}"),
            })?;
            debug!("env override (key={ENV_PORT}, value={})", self.server.port);
        }
        Ok(())
    }
}

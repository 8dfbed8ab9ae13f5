//! Layered configuration loader.
//!
//! Discovers config layers (system, user, project, cwd, repo, runtime), checks
//! each against the schema, deep-merges them and produces a `KwikConfig`.

mod env;
mod layer_io;
mod merge;
mod schema;
mod utils;

#[cfg(test)]
mod tests;

use crate::{ConfigError, KwikConfig};
use log::{debug, info};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Config filename looked up in local layers.
const DEFAULT_CONFIG_FILE: &str = "kwik.json5";
/// Config directory under the home directory or a repo root.
const DEFAULT_CONFIG_DIR: &str = ".kwik";
/// Entries marking a project root.
const DEFAULT_PROJECT_ROOT_MARKERS: &[&str] = &[".git"];
/// System-wide config location on Unix.
const SYSTEM_CONFIG_PATH: &str = "/etc/kwik/kwik.json5";

/// Effective config plus the layers it was built from.
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub config: KwikConfig,
    pub layers: Vec<ConfigLayer>,
}

/// Origin of a config layer, lowest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayerSource {
    System,
    User,
    /// `kwik.json5` at the project root.
    Project,
    /// `kwik.json5` in the working directory.
    Cwd,
    /// `.kwik/kwik.json5` under the project root.
    Repo,
    /// Explicit `--config` paths.
    Runtime,
}

/// A layer that contributed to the effective config.
#[derive(Debug, Clone)]
pub struct ConfigLayer {
    pub source: ConfigLayerSource,
    pub path: Option<PathBuf>,
}

/// Where to look for layers.
#[derive(Debug, Clone)]
pub struct LayeredConfigOptions {
    /// Working directory for local layers and relative storage paths.
    pub cwd: PathBuf,
    pub system_config_path: Option<PathBuf>,
    pub user_config_path: Option<PathBuf>,
    /// Paths applied last, in order.
    pub runtime_paths: Vec<PathBuf>,
    pub project_root_markers: Vec<String>,
}

impl LayeredConfigOptions {
    /// Default layer locations for `cwd`.
    pub fn new(cwd: impl AsRef<Path>) -> Self {
        Self {
            cwd: cwd.as_ref().to_path_buf(),
            system_config_path: layer_io::default_system_config_path(),
            user_config_path: layer_io::default_user_config_path(),
            runtime_paths: Vec::new(),
            project_root_markers: DEFAULT_PROJECT_ROOT_MARKERS
                .iter()
                .map(|marker| marker.to_string())
                .collect(),
        }
    }

    /// Options that only consider local and runtime layers.
    pub fn isolated(cwd: impl AsRef<Path>) -> Self {
        Self {
            system_config_path: None,
            user_config_path: None,
            ..Self::new(cwd)
        }
    }

    pub fn with_runtime_path(mut self, path: impl AsRef<Path>) -> Self {
        self.runtime_paths.push(path.as_ref().to_path_buf());
        self
    }
}

impl KwikConfig {
    /// Load a single config file without layering.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        info!("loading config from path: {}", path.as_ref().display());
        let contents = fs::read_to_string(path)?;
        Self::load_from_str(&contents)
    }

    /// Load a single config from JSON5 contents.
    pub fn load_from_str(contents: &str) -> Result<Self, ConfigError> {
        debug!("loading config from raw contents (len={})", contents.len());
        let value: Value = json5::from_str(contents)?;
        config_from_value(value, "config")
    }

    /// Load the layered stack from the default locations.
    pub fn load_layered(cwd: impl AsRef<Path>) -> Result<LayeredConfig, ConfigError> {
        Self::load_layered_with_options(LayeredConfigOptions::new(cwd))
    }

    /// Load the layered stack.
    ///
    /// Precedence (low -> high): system, user, project, cwd, repo, runtime.
    pub fn load_layered_with_options(
        options: LayeredConfigOptions,
    ) -> Result<LayeredConfig, ConfigError> {
        let cwd = utils::normalize_path(&options.cwd)?;
        debug!("normalized cwd for config load: {}", cwd.display());
        let mut loaded = Vec::new();
        let mut seen_paths = HashSet::new();

        for (source, path) in [
            (
                ConfigLayerSource::System,
                options.system_config_path.as_deref(),
            ),
            (ConfigLayerSource::User, options.user_config_path.as_deref()),
        ] {
            if let Some(layer) = layer_io::load_optional_layer(source, path)? {
                if let Some(path) = layer.meta.path.as_deref() {
                    seen_paths.insert(utils::unique_path(path));
                }
                loaded.push(layer);
            }
        }

        let project_root = utils::find_project_root(&cwd, &options.project_root_markers);
        let mut local = Vec::new();
        if let Some(root) = project_root.as_ref() {
            debug!("resolved project root: {}", root.display());
            local.push((ConfigLayerSource::Project, root.join(DEFAULT_CONFIG_FILE)));
        }
        local.push((ConfigLayerSource::Cwd, cwd.join(DEFAULT_CONFIG_FILE)));
        if let Some(root) = project_root.as_ref() {
            local.push((
                ConfigLayerSource::Repo,
                root.join(DEFAULT_CONFIG_DIR).join(DEFAULT_CONFIG_FILE),
            ));
        }
        for (source, path) in local {
            if !path.exists() {
                continue;
            }
            if !seen_paths.insert(utils::unique_path(&path)) {
                debug!(
                    "skipping duplicate layer (source={:?}, path={})",
                    source,
                    path.display()
                );
                continue;
            }
            loaded.push(layer_io::load_required_layer(source, &path)?);
        }

        for path in &options.runtime_paths {
            loaded.push(layer_io::load_required_layer(
                ConfigLayerSource::Runtime,
                path,
            )?);
        }

        let mut merged = Value::Object(serde_json::Map::new());
        let mut layers = Vec::with_capacity(loaded.len());
        for layer in loaded {
            merge::merge_json_values(&mut merged, &layer.value);
            layers.push(layer.meta);
        }

        let config = config_from_value(merged, "effective")?;
        info!("layered config loaded (layers={})", layers.len());
        Ok(LayeredConfig { config, layers })
    }

    /// Cross-field invariants serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let retrieval = &self.retrieval;
        if retrieval.chunk_size == 0 {
            return Err(ConfigError::Invalid(
                "retrieval.chunk_size must be positive".to_string(),
            ));
        }
        if retrieval.chunk_overlap >= retrieval.chunk_size {
            return Err(ConfigError::Invalid(format!(
                "retrieval.chunk_overlap ({}) must be smaller than retrieval.chunk_size ({})",
                retrieval.chunk_overlap, retrieval.chunk_size
            )));
        }
        if retrieval.top_k == 0 {
            return Err(ConfigError::Invalid(
                "retrieval.top_k must be positive".to_string(),
            ));
        }
        if retrieval.dimensions == 0 {
            return Err(ConfigError::Invalid(
                "retrieval.dimensions must be positive".to_string(),
            ));
        }
        if self.agents.max_tool_rounds == 0 {
            return Err(ConfigError::Invalid(
                "agents.max_tool_rounds must be positive".to_string(),
            ));
        }
        if self.server.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid(
                "server.max_upload_bytes must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct LoadedLayer {
    meta: ConfigLayer,
    value: Value,
}

fn config_from_value(value: Value, label: &str) -> Result<KwikConfig, ConfigError> {
    schema::validate_layer_schema(&value, label)?;
    let config: KwikConfig = serde_json::from_value(value)?;
    config.validate()?;
    Ok(config)
}

//! Agent network manifests: a front-man agent plus nested specialists.

use crate::ConfigError;
use globset::{Glob, GlobSet, GlobSetBuilder};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// Declarative agent hierarchy interpreted by the orchestration runtime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// Network name, used in logs and the CLI.
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Id of the top-level coordinator agent.
    pub front_man: String,
    pub agents: Vec<AgentSpec>,
}

/// One role in the hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentSpec {
    pub id: String,
    /// Short description shown to parent agents when delegating.
    pub description: String,
    /// System instructions for the agent.
    pub instructions: String,
    /// Glob patterns over registered coded-tool names.
    #[serde(default)]
    pub tools: Vec<String>,
    /// Ids of child agents this agent may delegate to.
    #[serde(default)]
    pub delegates: Vec<String>,
}

impl AgentSpec {
    /// Compile the tool binding patterns into a matcher.
    pub fn tool_matcher(&self) -> Result<GlobSet, ConfigError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.tools {
            let glob = Glob::new(pattern).map_err(|err| {
                ConfigError::InvalidNetwork(format!(
                    "agent {} has invalid tool pattern {pattern:?}: {err}",
                    self.id
                ))
            })?;
            builder.add(glob);
        }
        builder
            .build()
            .map_err(|err| ConfigError::InvalidNetwork(err.to_string()))
    }
}

impl NetworkConfig {
    /// Load and validate a network manifest from a JSON5 file.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        info!("loading agent network from path: {}", path.as_ref().display());
        let contents = fs::read_to_string(path)?;
        Self::load_from_str(&contents)
    }

    /// Load and validate a network manifest from JSON5 contents.
    pub fn load_from_str(contents: &str) -> Result<Self, ConfigError> {
        let network: NetworkConfig = json5::from_str(contents)?;
        network.validate()?;
        debug!(
            "agent network loaded (name={}, agents={})",
            network.name,
            network.agents.len()
        );
        Ok(network)
    }

    /// Look up an agent by id.
    pub fn agent(&self, id: &str) -> Option<&AgentSpec> {
        self.agents.iter().find(|agent| agent.id == id)
    }

    /// The front-man agent.
    pub fn front_man(&self) -> Option<&AgentSpec> {
        self.agent(&self.front_man)
    }

    /// Check that the network forms a tree-shaped delegation graph rooted at the front-man.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agents.is_empty() {
            return Err(ConfigError::InvalidNetwork(
                "network declares no agents".to_string(),
            ));
        }
        let mut ids = HashSet::new();
        for agent in &self.agents {
            if agent.id.trim().is_empty() {
                return Err(ConfigError::InvalidNetwork(
                    "agent id cannot be empty".to_string(),
                ));
            }
            if !agent
                .id
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
            {
                return Err(ConfigError::InvalidNetwork(format!(
                    "agent id {:?} may only contain letters, digits, '_' or '-'",
                    agent.id
                )));
            }
            if !ids.insert(agent.id.as_str()) {
                return Err(ConfigError::InvalidNetwork(format!(
                    "duplicate agent id: {}",
                    agent.id
                )));
            }
            agent.tool_matcher()?;
        }
        if !ids.contains(self.front_man.as_str()) {
            return Err(ConfigError::InvalidNetwork(format!(
                "front-man {} is not declared",
                self.front_man
            )));
        }

        let mut edges: HashMap<&str, &[String]> = HashMap::new();
        for agent in &self.agents {
            for delegate in &agent.delegates {
                if !ids.contains(delegate.as_str()) {
                    return Err(ConfigError::InvalidNetwork(format!(
                        "agent {} delegates to unknown agent {delegate}",
                        agent.id
                    )));
                }
                if *delegate == self.front_man {
                    return Err(ConfigError::InvalidNetwork(format!(
                        "agent {} delegates to the front-man",
                        agent.id
                    )));
                }
            }
            edges.insert(agent.id.as_str(), agent.delegates.as_slice());
        }

        let mut visiting = HashSet::new();
        let mut done = HashSet::new();
        for agent in &self.agents {
            detect_cycle(agent.id.as_str(), &edges, &mut visiting, &mut done)?;
        }
        Ok(())
    }
}

/// Depth-first search for a delegation cycle.
fn detect_cycle<'a>(
    id: &'a str,
    edges: &HashMap<&'a str, &'a [String]>,
    visiting: &mut HashSet<&'a str>,
    done: &mut HashSet<&'a str>,
) -> Result<(), ConfigError> {
    if done.contains(id) {
        return Ok(());
    }
    if !visiting.insert(id) {
        return Err(ConfigError::InvalidNetwork(format!(
            "delegation cycle through agent {id}"
        )));
    }
    if let Some(children) = edges.get(id) {
        for child in children.iter() {
            detect_cycle(child.as_str(), edges, visiting, done)?;
        }
    }
    visiting.remove(id);
    done.insert(id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::NetworkConfig;
    use pretty_assertions::assert_eq;

    fn manifest(agents: &str) -> String {
        format!(r#"{{ name: "test", front_man: "lead", agents: [{agents}] }}"#)
    }

    #[test]
    fn parses_nested_hierarchy() {
        let json5 = manifest(
            r#"
            { id: "lead", description: "d", instructions: "i", delegates: ["child"] },
            { id: "child", description: "d", instructions: "i", tools: ["recall_*"] },
            "#,
        );
        let network = NetworkConfig::load_from_str(&json5).expect("network");
        assert_eq!(network.front_man().map(|a| a.id.as_str()), Some("lead"));
        let matcher = network.agent("child").expect("child").tool_matcher().expect("glob");
        assert!(matcher.is_match("recall_memory"));
        assert!(!matcher.is_match("commit_to_memory"));
    }

    #[test]
    fn rejects_unknown_delegate() {
        let json5 = manifest(
            r#"{ id: "lead", description: "d", instructions: "i", delegates: ["ghost"] }"#,
        );
        let err = NetworkConfig::load_from_str(&json5).unwrap_err();
        assert!(err.to_string().contains("unknown agent ghost"));
    }

    #[test]
    fn rejects_delegation_cycle() {
        let json5 = manifest(
            r#"
            { id: "lead", description: "d", instructions: "i", delegates: ["a"] },
            { id: "a", description: "d", instructions: "i", delegates: ["b"] },
            { id: "b", description: "d", instructions: "i", delegates: ["a"] },
            "#,
        );
        let err = NetworkConfig::load_from_str(&json5).unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn rejects_missing_front_man() {
        let json5 = r#"{ name: "t", front_man: "boss", agents: [
            { id: "lead", description: "d", instructions: "i" },
        ] }"#;
        let err = NetworkConfig::load_from_str(json5).unwrap_err();
        assert!(err.to_string().contains("front-man boss"));
    }

    #[test]
    fn rejects_delegation_back_to_front_man() {
        let json5 = manifest(
            r#"
            { id: "lead", description: "d", instructions: "i", delegates: ["a"] },
            { id: "a", description: "d", instructions: "i", delegates: ["lead"] },
            "#,
        );
        let err = NetworkConfig::load_from_str(&json5).unwrap_err();
        assert!(err.to_string().contains("delegates to the front-man"));
    }
}

//! Agent networks bound to the coded tool registry.

use crate::error::KwikCoreError;
use kwik_rs_config::{AgentSpec, NetworkConfig};
use kwik_rs_protocol::ToolDefinition;
use kwik_rs_tools::{Tool, ToolRegistry};
use log::{debug, info, warn};
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::Path;
use std::sync::Arc;

/// Name of the built-in PDF knowledge network.
pub const PDF_KNOWLEDGE_NETWORK: &str = "pdf_knowledge_agent";
/// Name of the built-in banking customer-service network.
pub const BANKING_OPS_NETWORK: &str = "banking_ops";

const BUNDLED: [(&str, &str); 2] = [
    (
        PDF_KNOWLEDGE_NETWORK,
        include_str!("../networks/pdf_knowledge_agent.json5"),
    ),
    (
        BANKING_OPS_NETWORK,
        include_str!("../networks/banking_ops.json5"),
    ),
];

/// Names of the networks compiled into the binary.
pub fn bundled_network_names() -> Vec<&'static str> {
    BUNDLED.iter().map(|(name, _)| *name).collect()
}

/// Parse a bundled network manifest by name.
pub fn bundled_network(name: &str) -> Option<Result<NetworkConfig, KwikCoreError>> {
    BUNDLED
        .iter()
        .find(|(bundled, _)| *bundled == name)
        .map(|(_, contents)| NetworkConfig::load_from_str(contents).map_err(Into::into))
}

/// Resolve a manifest reference: a bundled network name or a path to a JSON5 file.
/// `None` selects the PDF knowledge network.
pub fn load_network(manifest: Option<&str>) -> Result<NetworkConfig, KwikCoreError> {
    let reference = manifest.unwrap_or(PDF_KNOWLEDGE_NETWORK);
    if let Some(network) = bundled_network(reference) {
        debug!("using bundled agent network (name={})", reference);
        return network;
    }
    Ok(NetworkConfig::load_from_path(Path::new(reference))?)
}

/// One agent with its bound coded tools.
pub struct AgentNode {
    pub spec: AgentSpec,
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl AgentNode {
    pub fn id(&self) -> &str {
        &self.spec.id
    }

    pub fn tool(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Names of bound coded tools, sorted.
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn is_delegate(&self, name: &str) -> bool {
        self.spec.delegates.iter().any(|delegate| delegate == name)
    }
}

impl std::fmt::Debug for AgentNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentNode")
            .field("id", &self.spec.id)
            .field("tools", &self.tool_names())
            .field("delegates", &self.spec.delegates)
            .finish()
    }
}

/// A validated agent hierarchy with tool bindings resolved.
#[derive(Debug)]
pub struct AgentNetwork {
    config: NetworkConfig,
    nodes: BTreeMap<String, AgentNode>,
}

impl AgentNetwork {
    /// Bind every agent's tool patterns against `registry`.
    pub fn build(config: NetworkConfig, registry: &ToolRegistry) -> Result<Self, KwikCoreError> {
        config.validate()?;
        let mut nodes = BTreeMap::new();
        for spec in &config.agents {
            let matcher = spec.tool_matcher()?;
            let tools: BTreeMap<String, Arc<dyn Tool>> = registry
                .matching(|name| matcher.is_match(name))
                .into_iter()
                .map(|tool| (tool.name().to_string(), tool))
                .collect();
            if !spec.tools.is_empty() && tools.is_empty() {
                warn!(
                    "agent tool patterns matched no registered tools (agent_id={}, patterns={:?})",
                    spec.id, spec.tools
                );
            }
            if let Some(clash) = spec
                .delegates
                .iter()
                .find(|delegate| tools.contains_key(delegate.as_str()))
            {
                return Err(KwikCoreError::Executor(format!(
                    "agent {} binds a tool with the same name as its delegate {clash}",
                    spec.id
                )));
            }
            nodes.insert(
                spec.id.clone(),
                AgentNode {
                    spec: spec.clone(),
                    tools,
                },
            );
        }
        info!(
            "agent network ready (name={}, agents={}, front_man={})",
            config.name,
            nodes.len(),
            config.front_man
        );
        Ok(Self { config, nodes })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn front_man_id(&self) -> &str {
        &self.config.front_man
    }

    pub fn node(&self, id: &str) -> Result<&AgentNode, KwikCoreError> {
        self.nodes
            .get(id)
            .ok_or_else(|| KwikCoreError::UnknownAgent(id.to_string()))
    }

    /// System prompt for `id`: its instructions plus a roster of delegates.
    pub fn system_prompt(&self, id: &str) -> Result<String, KwikCoreError> {
        let node = self.node(id)?;
        let mut prompt = node.spec.instructions.trim().to_string();
        if !node.spec.delegates.is_empty() {
            prompt.push_str(
                "\n\nYou can hand a request to one of these agents by calling it as a tool \
                 with an `inquiry`:",
            );
            for delegate in &node.spec.delegates {
                let description = self
                    .nodes
                    .get(delegate)
                    .map(|child| child.spec.description.as_str())
                    .unwrap_or_default();
                let _ = write!(prompt, "\n- {delegate}: {description}");
            }
        }
        Ok(prompt)
    }

    /// Coded tools followed by one delegation tool per child agent.
    pub fn tool_definitions(&self, id: &str) -> Result<Vec<ToolDefinition>, KwikCoreError> {
        let node = self.node(id)?;
        let mut definitions: Vec<ToolDefinition> =
            node.tools.values().map(|tool| tool.spec().into()).collect();
        for delegate in &node.spec.delegates {
            let child = self.node(delegate)?;
            definitions.push(ToolDefinition {
                name: delegate.clone(),
                description: child.spec.description.clone(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "inquiry": {
                            "type": "string",
                            "description": "The request for this agent, with every detail it needs"
                        }
                    },
                    "required": ["inquiry"]
                }),
            });
        }
        Ok(definitions)
    }

    /// Indented tree of agents starting at the front-man.
    pub fn describe(&self) -> String {
        let mut out = self.config.name.clone();
        if let Some(description) = &self.config.description {
            let _ = write!(out, ": {description}");
        }
        out.push('\n');
        self.describe_node(self.front_man_id(), 1, &mut out);
        out
    }

    fn describe_node(&self, id: &str, depth: usize, out: &mut String) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        let indent = "  ".repeat(depth);
        let _ = write!(out, "{indent}- {id}");
        let tools = node.tool_names();
        if !tools.is_empty() {
            let _ = write!(out, " [{}]", tools.join(", "));
        }
        out.push('\n');
        for delegate in &node.spec.delegates {
            self.describe_node(delegate, depth + 1, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        AgentNetwork, BANKING_OPS_NETWORK, PDF_KNOWLEDGE_NETWORK, bundled_network,
        bundled_network_names, load_network,
    };
    use kwik_rs_config::NetworkConfig;
    use kwik_rs_tools::coded_tool_registry;
    use pretty_assertions::assert_eq;

    #[test]
    fn bundled_networks_parse_and_bind() {
        let registry = coded_tool_registry();
        for name in bundled_network_names() {
            let config = bundled_network(name).expect("bundled").expect("valid");
            AgentNetwork::build(config, &registry).expect("build");
        }
    }

    #[test]
    fn knowledge_network_binds_tools_by_role() {
        let network =
            AgentNetwork::build(load_network(None).expect("network"), &coded_tool_registry())
                .expect("build");
        assert_eq!(network.name(), PDF_KNOWLEDGE_NETWORK);
        let processor = network.node("document_processor").expect("processor");
        assert_eq!(
            processor.tool_names(),
            vec![
                "add_pdf_to_knowledge",
                "commit_to_memory",
                "extract_pdf_knowledge",
                "list_topics"
            ]
        );
        let front = network.node(network.front_man_id()).expect("front");
        assert!(front.tool("add_pdf_to_knowledge").is_none());
        assert!(front.is_delegate("document_processor"));

        let names: Vec<String> = network
            .tool_definitions(network.front_man_id())
            .expect("definitions")
            .into_iter()
            .map(|definition| definition.name)
            .collect();
        assert_eq!(names.last().map(String::as_str), Some("document_processor"));
    }

    #[test]
    fn banking_network_is_declarative() {
        let network = AgentNetwork::build(
            load_network(Some(BANKING_OPS_NETWORK)).expect("network"),
            &coded_tool_registry(),
        )
        .expect("build");
        let tree = network.describe();
        assert!(tree.starts_with("banking_ops"));
        assert!(tree.contains("\n  - customer_service\n"));
        assert!(tree.contains("\n      - mortgages\n"));
        let prompt = network.system_prompt("customer_service").expect("prompt");
        assert!(prompt.contains("- lending: Personal loans"));
    }

    #[test]
    fn rejects_delegate_named_like_bound_tool() {
        let config = NetworkConfig::load_from_str(
            r#"{ name: "n", front_man: "lead", agents: [
                { id: "lead", description: "d", instructions: "i", tools: ["*"], delegates: ["list_topics"] },
                { id: "list_topics", description: "d", instructions: "i" },
            ] }"#,
        )
        .expect("config");
        let err = AgentNetwork::build(config, &coded_tool_registry()).unwrap_err();
        assert!(err.to_string().contains("same name as its delegate"));
    }
}

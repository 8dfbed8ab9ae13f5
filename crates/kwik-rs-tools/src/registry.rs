//! Registry for tool implementations.

use crate::tool::{Tool, ToolSpec};
use log::debug;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Named tools shared between agents.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Arc<RwLock<BTreeMap<String, Arc<dyn Tool>>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name.
    pub fn register(&self, tool: Arc<dyn Tool>) {
        debug!("registering tool (name={})", tool.name());
        self.tools.write().insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.read().get(name).cloned()
    }

    /// Registered names in sorted order.
    pub fn list(&self) -> Vec<String> {
        self.tools.read().keys().cloned().collect()
    }

    /// Tools whose names satisfy `filter`, sorted by name.
    pub fn matching(&self, filter: impl Fn(&str) -> bool) -> Vec<Arc<dyn Tool>> {
        self.tools
            .read()
            .iter()
            .filter(|(name, _)| filter(name))
            .map(|(_, tool)| tool.clone())
            .collect()
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.read().values().map(|tool| tool.spec()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::ToolRegistry;
    use crate::{Tool, ToolContext};
    use async_trait::async_trait;
    use kwik_rs_protocol::ToolError;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use std::sync::Arc;

    #[derive(Debug)]
    struct NamedTool(&'static str);

    #[async_trait]
    impl Tool for NamedTool {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "named"
        }

        fn args_schema(&self) -> Value {
            json!({ "type": "object", "properties": {} })
        }

        async fn call(&self, _ctx: &ToolContext, _args: Value) -> Result<Value, ToolError> {
            Ok(Value::Null)
        }
    }

    #[test]
    fn lists_and_filters_by_name() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(NamedTool("recall_memory")));
        registry.register(Arc::new(NamedTool("commit_to_memory")));
        registry.register(Arc::new(NamedTool("query_pdf_knowledge")));

        assert_eq!(
            registry.list(),
            vec!["commit_to_memory", "query_pdf_knowledge", "recall_memory"]
        );
        let memory_tools: Vec<String> = registry
            .matching(|name| name.ends_with("_memory"))
            .iter()
            .map(|tool| tool.name().to_string())
            .collect();
        assert_eq!(memory_tools, vec!["commit_to_memory", "recall_memory"]);
        assert!(registry.get("missing").is_none());
    }
}

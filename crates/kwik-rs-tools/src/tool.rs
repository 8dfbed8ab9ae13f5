//! Tool trait definition and metadata spec.

use crate::context::ToolContext;
use async_trait::async_trait;
use kwik_rs_protocol::{SourceTag, ToolDefinition, ToolError};
use serde_json::Value;
use std::fmt::Debug;

/// Tool metadata advertised to agents.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema for tool arguments.
    pub args_schema: Value,
}

impl From<ToolSpec> for ToolDefinition {
    fn from(spec: ToolSpec) -> Self {
        ToolDefinition {
            name: spec.name,
            description: spec.description,
            parameters: spec.args_schema,
        }
    }
}

/// Interface for executable tools.
#[async_trait]
pub trait Tool: Send + Sync + Debug {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    /// JSON schema for the arguments object.
    fn args_schema(&self) -> Value;

    /// Invoke the tool with a context and arguments.
    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, ToolError>;

    /// Attribution earned by a successful call that produced `output`.
    fn attribution(&self, _output: &Value) -> Option<SourceTag> {
        None
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            args_schema: self.args_schema(),
        }
    }
}

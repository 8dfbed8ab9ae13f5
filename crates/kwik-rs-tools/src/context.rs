//! Tool execution context and the services tools share.

use crate::output_policy::ToolOutputPolicy;
use crate::tool::Tool;
use kwik_rs_knowledge::{DocumentLoader, DocumentRegistry, Retriever};
use kwik_rs_memory::{FactSynthesizer, TopicMemory};
use kwik_rs_protocol::{SessionId, ToolError};
use log::{debug, warn};
use serde_json::Value;
use std::sync::Arc;

/// Tunables for the document tools.
#[derive(Debug, Clone, Copy)]
pub struct KnowledgeSettings {
    /// Default passages returned by `query_pdf_knowledge`.
    pub top_k: usize,
    /// Characters of document text placed in an extraction brief.
    pub sample_chars: usize,
    /// Keywords stored as a document's topics.
    pub keyword_count: usize,
}

impl Default for KnowledgeSettings {
    fn default() -> Self {
        Self {
            top_k: 4,
            sample_chars: 10_000,
            keyword_count: 8,
        }
    }
}

/// Shared handles every coded tool works against.
pub struct ToolServices {
    pub memory: Arc<dyn TopicMemory>,
    pub knowledge: Arc<dyn Retriever>,
    pub documents: Arc<DocumentRegistry>,
    pub loader: Arc<dyn DocumentLoader>,
    /// Synthesizer used by `reorganize_memory`.
    pub synthesizer: Arc<dyn FactSynthesizer>,
    pub output_policy: Option<ToolOutputPolicy>,
    pub settings: KnowledgeSettings,
}

/// Per-invocation context; services sit behind an `Arc` so cloning is cheap.
#[derive(Clone)]
pub struct ToolContext {
    pub session_id: SessionId,
    /// Agent that requested the tool.
    pub agent_id: String,
    /// Model-assigned id of the call being served.
    pub tool_call_id: Option<String>,
    pub services: Arc<ToolServices>,
}

impl ToolContext {
    pub fn new(session_id: SessionId, agent_id: impl Into<String>, services: Arc<ToolServices>) -> Self {
        Self {
            session_id,
            agent_id: agent_id.into(),
            tool_call_id: None,
            services,
        }
    }

    /// Apply the configured output policy to a tool result.
    pub fn apply_output_policy(&self, value: Value) -> Value {
        match self.services.output_policy.as_ref() {
            Some(policy) => policy.apply(value),
            None => value,
        }
    }

    /// Run `tool` and bound its output with the output policy.
    pub async fn execute_tool(&self, tool: &dyn Tool, args: Value) -> Result<Value, ToolError> {
        debug!(
            "executing tool (session_id={}, agent_id={}, tool_name={})",
            self.session_id,
            self.agent_id,
            tool.name()
        );
        match tool.call(self, args).await {
            Ok(output) => Ok(self.apply_output_policy(output)),
            Err(err) => {
                warn!(
                    "tool failed (session_id={}, agent_id={}, tool_name={}): {}",
                    self.session_id,
                    self.agent_id,
                    tool.name(),
                    err
                );
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolContext")
            .field("session_id", &self.session_id)
            .field("agent_id", &self.agent_id)
            .field("tool_call_id", &self.tool_call_id)
            .finish()
    }
}

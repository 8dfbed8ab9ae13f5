//! Shared types for Kwik agents: tool errors, chat model contracts, and the
//! records exchanged between the runtime and the web front end.

mod llm;
mod tool;

pub use llm::{
    ChatMessage, ChatModel, ChatResponse, ChatRole, LlmError, ToolCall, ToolDefinition,
};
pub use tool::ToolError;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a conversation session.
pub type SessionId = Uuid;

/// Where an answer's supporting material came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SourceTag {
    /// Facts recalled from topic memory.
    #[serde(rename = "from memory")]
    Memory,
    /// Passages retrieved from indexed documents.
    #[serde(rename = "from document")]
    Document,
}

impl SourceTag {
    /// Human-readable attribution label.
    pub fn label(self) -> &'static str {
        match self {
            SourceTag::Memory => "from memory",
            SourceTag::Document => "from document",
        }
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Kind of tool invocation performed during a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallKind {
    /// A coded tool from the registry.
    Coded,
    /// A hand-off to a child agent.
    Delegation,
}

/// Record of a tool call that actually executed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    /// Agent that issued the call.
    pub agent_id: String,
    /// Tool or delegate name.
    pub tool_name: String,
    pub kind: ToolCallKind,
    /// Arguments as sent by the model.
    pub arguments: Value,
    /// Whether the call completed without error.
    pub success: bool,
    pub created_at: DateTime<Utc>,
}

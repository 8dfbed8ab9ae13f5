//! Topic memory tools.

use super::utils::{memory_error, parse_args, required};
use crate::{Tool, ToolContext};
use async_trait::async_trait;
use kwik_rs_protocol::{SourceTag, ToolError};
use log::info;
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Deserialize)]
struct CommitArgs {
    #[serde(default)]
    topic: String,
    #[serde(default)]
    fact: String,
}

/// Store one fact under a topic.
#[derive(Debug, Default)]
pub struct CommitToMemoryTool;

#[async_trait]
impl Tool for CommitToMemoryTool {
    fn name(&self) -> &str {
        "commit_to_memory"
    }

    fn description(&self) -> &str {
        "Commit a fact to long-term memory under a topic"
    }

    fn args_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "topic": { "type": "string", "description": "Topic the fact belongs to" },
                "fact": { "type": "string", "description": "The fact to remember" }
            },
            "required": ["topic", "fact"]
        })
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, ToolError> {
        let input: CommitArgs = parse_args(args)?;
        let topic = required(&input.topic, "topic")?;
        let fact = required(&input.fact, "fact")?;
        let record = ctx
            .services
            .memory
            .commit(topic, fact)
            .await
            .map_err(memory_error)?;
        info!(
            "committed fact (session_id={}, topic={}, record_id={})",
            ctx.session_id, record.topic, record.id
        );
        Ok(json!({
            "status": "committed",
            "topic": record.topic,
            "id": record.id,
        }))
    }
}

#[derive(Debug, Deserialize)]
struct RecallArgs {
    #[serde(default)]
    topic: String,
}

/// Every fact stored under a topic, in commit order.
#[derive(Debug, Default)]
pub struct RecallMemoryTool;

#[async_trait]
impl Tool for RecallMemoryTool {
    fn name(&self) -> &str {
        "recall_memory"
    }

    fn description(&self) -> &str {
        "Recall every fact stored in memory under a topic"
    }

    fn args_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "topic": { "type": "string", "description": "Topic to recall" }
            },
            "required": ["topic"]
        })
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, ToolError> {
        let input: RecallArgs = parse_args(args)?;
        let topic = required(&input.topic, "topic")?;
        let facts = ctx
            .services
            .memory
            .recall(topic)
            .await
            .map_err(memory_error)?;
        Ok(json!({ "topic": topic, "facts": facts }))
    }

    fn attribution(&self, output: &Value) -> Option<SourceTag> {
        let found = output["facts"]
            .as_array()
            .is_some_and(|facts| !facts.is_empty());
        found.then_some(SourceTag::Memory)
    }
}

/// Distinct topics in first-appearance order.
#[derive(Debug, Default)]
pub struct ListTopicsTool;

#[async_trait]
impl Tool for ListTopicsTool {
    fn name(&self) -> &str {
        "list_topics"
    }

    fn description(&self) -> &str {
        "List every topic currently held in memory"
    }

    fn args_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn call(&self, ctx: &ToolContext, _args: Value) -> Result<Value, ToolError> {
        let topics = ctx
            .services
            .memory
            .list_topics()
            .await
            .map_err(memory_error)?;
        Ok(json!({ "topics": topics }))
    }
}

/// Append synthesized facts derived from what is already stored.
#[derive(Debug, Default)]
pub struct ReorganizeMemoryTool;

#[async_trait]
impl Tool for ReorganizeMemoryTool {
    fn name(&self) -> &str {
        "reorganize_memory"
    }

    fn description(&self) -> &str {
        "Synthesize new facts from existing memory and append them; existing facts are never changed"
    }

    fn args_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn call(&self, ctx: &ToolContext, _args: Value) -> Result<Value, ToolError> {
        let services = &ctx.services;
        let derived = services
            .memory
            .reorganize(services.synthesizer.as_ref())
            .await
            .map_err(memory_error)?;
        info!(
            "reorganized memory (synthesizer={}, derived={})",
            services.synthesizer.name(),
            derived.len()
        );
        let facts: Vec<Value> = derived
            .iter()
            .map(|record| json!({ "topic": record.topic, "fact": record.fact }))
            .collect();
        Ok(json!({ "derived": facts, "count": facts.len() }))
    }
}

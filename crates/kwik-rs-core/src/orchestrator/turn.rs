//! Turn execution: the tool loop for one agent and delegation to children.

use super::RunLimits;
use crate::error::KwikCoreError;
use crate::network::{AgentNetwork, AgentNode};
use chrono::Utc;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use kwik_rs_protocol::{
    ChatMessage, ChatModel, SessionId, SourceTag, ToolCall, ToolCallKind, ToolCallRecord,
    ToolError,
};
use kwik_rs_tools::{ToolContext, ToolServices};
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Reply used when the model ends a turn without any text.
pub const NO_RESPONSE: &str = "No response from agent.";

#[derive(Debug, Default)]
struct TurnLog {
    tool_calls: Vec<ToolCallRecord>,
    sources: BTreeSet<SourceTag>,
}

#[derive(Debug, Deserialize)]
struct DelegationArgs {
    #[serde(default)]
    inquiry: String,
}

/// Executes a single user turn across the agent tree.
pub(crate) struct TurnExecutor<'a> {
    pub(crate) session_id: SessionId,
    pub(crate) network: &'a AgentNetwork,
    pub(crate) model: &'a dyn ChatModel,
    pub(crate) services: &'a Arc<ToolServices>,
    pub(crate) limits: RunLimits,
    log: Mutex<TurnLog>,
}

impl<'a> TurnExecutor<'a> {
    pub(crate) fn new(
        session_id: SessionId,
        network: &'a AgentNetwork,
        model: &'a dyn ChatModel,
        services: &'a Arc<ToolServices>,
        limits: RunLimits,
    ) -> Self {
        Self {
            session_id,
            network,
            model,
            services,
            limits,
            log: Mutex::new(TurnLog::default()),
        }
    }

    /// Executed tool calls and the sources they earned.
    pub(crate) fn finish(self) -> (Vec<ToolCallRecord>, Vec<SourceTag>) {
        let log = self.log.into_inner();
        (log.tool_calls, log.sources.into_iter().collect())
    }

    /// Run `agent_id` on `history` + `input` until it answers in text.
    pub(crate) fn run_agent<'b>(
        &'b self,
        agent_id: &'b str,
        history: &'b [ChatMessage],
        input: &'b str,
        depth: usize,
    ) -> BoxFuture<'b, Result<String, KwikCoreError>> {
        async move {
            let node = self.network.node(agent_id)?;
            let definitions = self.network.tool_definitions(agent_id)?;
            let mut messages = Vec::with_capacity(history.len() + 2);
            messages.push(ChatMessage::system(self.network.system_prompt(agent_id)?));
            messages.extend_from_slice(history);
            messages.push(ChatMessage::user(input));
            debug!(
                "running agent (session_id={}, agent_id={}, depth={}, tools={})",
                self.session_id,
                agent_id,
                depth,
                definitions.len()
            );

            for round in 0..self.limits.max_tool_rounds {
                let response = self.model.chat(&messages, &definitions).await?;
                if response.tool_calls.is_empty() {
                    return Ok(final_text(response.text));
                }
                debug!(
                    "model requested tools (agent_id={}, round={}, calls={})",
                    agent_id,
                    round,
                    response.tool_calls.len()
                );
                messages.push(ChatMessage::assistant_tool_calls(
                    response.text.unwrap_or_default(),
                    response.tool_calls.clone(),
                ));
                for call in &response.tool_calls {
                    let output = self.dispatch(node, call, depth).await?;
                    messages.push(ChatMessage::tool_result(&call.id, output.to_string()));
                }
            }

            warn!(
                "tool round limit reached (session_id={}, agent_id={}, limit={})",
                self.session_id, agent_id, self.limits.max_tool_rounds
            );
            let response = self.model.chat(&messages, &[]).await?;
            Ok(final_text(response.text))
        }
        .boxed()
    }

    /// Execute one tool call and return the JSON fed back to the model.
    async fn dispatch(
        &self,
        node: &AgentNode,
        call: &ToolCall,
        depth: usize,
    ) -> Result<Value, KwikCoreError> {
        if node.is_delegate(&call.name) {
            return self.delegate(node, call, depth).await;
        }
        let Some(tool) = node.tool(&call.name) else {
            warn!(
                "model called an unbound tool (agent_id={}, tool_name={})",
                node.id(),
                call.name
            );
            self.record(node, call, ToolCallKind::Coded, false);
            return Ok(error_value(&ToolError::ToolNotFound(call.name.clone())));
        };

        let mut ctx = ToolContext::new(self.session_id, node.id(), self.services.clone());
        ctx.tool_call_id = Some(call.id.clone());
        match ctx.execute_tool(tool.as_ref(), call.arguments.clone()).await {
            Ok(output) => {
                let source = tool.attribution(&output);
                self.record(node, call, ToolCallKind::Coded, true);
                if let Some(source) = source {
                    self.log.lock().sources.insert(source);
                }
                Ok(output)
            }
            Err(err) => {
                self.record(node, call, ToolCallKind::Coded, false);
                Ok(error_value(&err))
            }
        }
    }

    async fn delegate(
        &self,
        node: &AgentNode,
        call: &ToolCall,
        depth: usize,
    ) -> Result<Value, KwikCoreError> {
        let inquiry = serde_json::from_value::<DelegationArgs>(call.arguments.clone())
            .map(|args| args.inquiry.trim().to_string())
            .unwrap_or_default();
        if inquiry.is_empty() {
            self.record(node, call, ToolCallKind::Delegation, false);
            return Ok(error_value(&ToolError::InvalidArguments(
                "Missing required input 'inquiry'.".to_string(),
            )));
        }
        if depth >= self.limits.max_delegation_depth {
            warn!(
                "delegation depth limit reached (agent_id={}, delegate={}, depth={})",
                node.id(),
                call.name,
                depth
            );
            self.record(node, call, ToolCallKind::Delegation, false);
            return Ok(error_value(&ToolError::ExecutionFailed(format!(
                "delegation depth limit of {} reached",
                self.limits.max_delegation_depth
            ))));
        }

        info!(
            "delegating (session_id={}, from={}, to={}, depth={})",
            self.session_id,
            node.id(),
            call.name,
            depth + 1
        );
        let response = self.run_agent(&call.name, &[], &inquiry, depth + 1).await?;
        self.record(node, call, ToolCallKind::Delegation, true);
        Ok(json!({ "agent": call.name, "response": response }))
    }

    fn record(&self, node: &AgentNode, call: &ToolCall, kind: ToolCallKind, success: bool) {
        self.log.lock().tool_calls.push(ToolCallRecord {
            agent_id: node.id().to_string(),
            tool_name: call.name.clone(),
            kind,
            arguments: call.arguments.clone(),
            success,
            created_at: Utc::now(),
        });
    }
}

fn final_text(text: Option<String>) -> String {
    text.map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| NO_RESPONSE.to_string())
}

fn error_value(err: &ToolError) -> Value {
    json!({ "error": err.to_string() })
}

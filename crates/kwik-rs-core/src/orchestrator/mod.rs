//! Orchestrator: runs user turns through the agent network.

mod turn;

pub use turn::NO_RESPONSE;

use crate::error::KwikCoreError;
use crate::network::AgentNetwork;
use kwik_rs_config::AgentsConfig;
use kwik_rs_protocol::{ChatMessage, ChatModel, SessionId, SourceTag, ToolCallRecord};
use kwik_rs_tools::ToolServices;
use log::{debug, info};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use turn::TurnExecutor;
use uuid::Uuid;

/// Result payload for a single run invocation.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    /// Session id that produced the response.
    pub session_id: SessionId,
    /// Final answer of the front-man.
    pub response: String,
    /// Attribution derived from the tools that ran, deduplicated and ordered.
    pub sources: Vec<SourceTag>,
    /// Every tool call executed during the turn, delegations included.
    pub tool_calls: Vec<ToolCallRecord>,
}

/// Bounds applied to every turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunLimits {
    pub max_tool_rounds: usize,
    pub max_delegation_depth: usize,
    /// Front-man messages replayed into the next turn.
    pub history_window: usize,
}

impl Default for RunLimits {
    fn default() -> Self {
        Self::from(&AgentsConfig::default())
    }
}

impl From<&AgentsConfig> for RunLimits {
    fn from(config: &AgentsConfig) -> Self {
        Self {
            max_tool_rounds: config.max_tool_rounds,
            max_delegation_depth: config.max_delegation_depth,
            history_window: config.history_window,
        }
    }
}

/// The front-man's conversation, stored as user/assistant pairs.
///
/// Windows are trimmed in whole pairs, so replay never starts mid-exchange.
#[derive(Debug)]
struct Thread {
    session_id: SessionId,
    messages: Vec<ChatMessage>,
}

impl Thread {
    fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            messages: Vec::new(),
        }
    }

    fn window(&self, size: usize) -> &[ChatMessage] {
        let start = self.messages.len().saturating_sub(paired(size));
        &self.messages[start..]
    }

    fn push_exchange(&mut self, input: &str, response: &str, size: usize) {
        self.messages.push(ChatMessage::user(input));
        self.messages.push(ChatMessage::assistant(response));
        let excess = self.messages.len().saturating_sub(paired(size));
        self.messages.drain(..excess);
    }
}

/// Largest even message count not above `size`.
fn paired(size: usize) -> usize {
    size - size % 2
}

/// Main orchestration facade: owns the network, the model and the thread.
pub struct Orchestrator {
    network: Arc<AgentNetwork>,
    model: Arc<dyn ChatModel>,
    services: Arc<ToolServices>,
    limits: RunLimits,
    thread: Mutex<Thread>,
}

impl Orchestrator {
    pub fn new(
        network: AgentNetwork,
        model: Arc<dyn ChatModel>,
        services: Arc<ToolServices>,
        limits: RunLimits,
    ) -> Self {
        info!(
            "initializing orchestrator (network={}, model={}, max_tool_rounds={}, max_delegation_depth={})",
            network.name(),
            model.model_name(),
            limits.max_tool_rounds,
            limits.max_delegation_depth
        );
        Self {
            network: Arc::new(network),
            model,
            services,
            limits,
            thread: Mutex::new(Thread::new()),
        }
    }

    pub fn network(&self) -> &AgentNetwork {
        &self.network
    }

    pub fn services(&self) -> &Arc<ToolServices> {
        &self.services
    }

    pub fn limits(&self) -> RunLimits {
        self.limits
    }

    /// Current session id.
    pub async fn session_id(&self) -> SessionId {
        self.thread.lock().await.session_id
    }

    /// Messages currently kept for the front-man.
    pub async fn history(&self) -> Vec<ChatMessage> {
        self.thread.lock().await.messages.clone()
    }

    /// Drop the conversation and start a new session.
    pub async fn reset(&self) -> SessionId {
        let mut thread = self.thread.lock().await;
        *thread = Thread::new();
        info!("started new session (session_id={})", thread.session_id);
        thread.session_id
    }

    /// Run one user turn through the front-man. Turns are serialized.
    pub async fn run(&self, input: &str) -> Result<RunResult, KwikCoreError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(KwikCoreError::Executor("input cannot be empty".to_string()));
        }
        let mut thread = self.thread.lock().await;
        let session_id = thread.session_id;
        let front_man = self.network.front_man_id();
        info!(
            "running turn (session_id={}, agent_id={}, prompt_len={})",
            session_id,
            front_man,
            input.len()
        );

        let executor = TurnExecutor::new(
            session_id,
            &self.network,
            self.model.as_ref(),
            &self.services,
            self.limits,
        );
        let history = thread.window(self.limits.history_window).to_vec();
        let response = executor.run_agent(front_man, &history, input, 0).await?;
        let (tool_calls, sources) = executor.finish();
        thread.push_exchange(input, &response, self.limits.history_window);
        debug!(
            "turn finished (session_id={}, tool_calls={}, sources={:?})",
            session_id,
            tool_calls.len(),
            sources
        );
        Ok(RunResult {
            session_id,
            response,
            sources,
            tool_calls,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Thread;
    use kwik_rs_protocol::ChatRole;
    use pretty_assertions::assert_eq;

    #[test]
    fn thread_keeps_most_recent_exchanges() {
        let mut thread = Thread::new();
        thread.push_exchange("q1", "a1", 4);
        thread.push_exchange("q2", "a2", 4);
        thread.push_exchange("q3", "a3", 4);
        let contents: Vec<_> = thread.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["q2", "a2", "q3", "a3"]);
        assert_eq!(thread.window(2).len(), 2);
        assert_eq!(thread.window(10).len(), 4);
    }

    #[test]
    fn odd_window_never_starts_with_an_assistant_message() {
        let mut thread = Thread::new();
        thread.push_exchange("q1", "a1", 3);
        thread.push_exchange("q2", "a2", 3);
        assert_eq!(thread.messages.len(), 2);
        assert_eq!(thread.messages[0].content, "q2");
        assert_eq!(thread.messages[0].role, ChatRole::User);

        thread.push_exchange("q3", "a3", 10);
        let window = thread.window(3);
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].role, ChatRole::User);
        assert_eq!(window[0].content, "q3");
    }

    #[test]
    fn zero_window_keeps_nothing() {
        let mut thread = Thread::new();
        thread.push_exchange("q", "a", 0);
        assert!(thread.messages.is_empty());
    }
}

use async_trait::async_trait;
use autoagents_llm::chat::{
    ChatMessage as LlmChatMessage, ChatProvider, ChatResponse as LlmChatResponse,
    StructuredOutputFormat, Tool,
};
use autoagents_llm::completion::{CompletionProvider, CompletionRequest, CompletionResponse};
use autoagents_llm::embedding::EmbeddingProvider;
use autoagents_llm::error::LLMError;
use autoagents_llm::models::ModelsProvider;
use autoagents_llm::{FunctionCall, LLMProvider, ToolCall as LlmToolCall};
use kwik_rs_protocol::{
    ChatMessage, ChatModel, ChatResponse, LlmError, ToolCall, ToolDefinition,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;

/// Build a tool call with a generated id.
pub fn tool_call(name: impl Into<String>, arguments: Value) -> ToolCall {
    ToolCall::new(format!("call_{}", uuid::Uuid::new_v4().simple()), name, arguments)
}

/// Always answers with the same text and never calls tools.
#[derive(Debug, Clone)]
pub struct FixedModel {
    response: String,
}

impl FixedModel {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

#[async_trait]
impl ChatModel for FixedModel {
    fn model_name(&self) -> &str {
        "fixed"
    }

    async fn chat(
        &self,
        _messages: &[ChatMessage],
        _tools: &[ToolDefinition],
    ) -> Result<ChatResponse, LlmError> {
        Ok(ChatResponse::text(self.response.clone()))
    }
}

/// One request as the model saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<ChatMessage>,
    /// Names of the tools offered.
    pub tools: Vec<String>,
}

impl RecordedRequest {
    /// Content of the leading system message, if any.
    pub fn system_prompt(&self) -> Option<&str> {
        self.messages
            .first()
            .filter(|message| message.role == kwik_rs_protocol::ChatRole::System)
            .map(|message| message.content.as_str())
    }
}

/// Replays queued responses in order and records every request.
///
/// Once the script is exhausted it answers with `fallback`.
#[derive(Debug, Clone)]
pub struct ScriptedModel {
    script: Arc<Mutex<VecDeque<ChatResponse>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    fallback: String,
}

impl ScriptedModel {
    pub fn new(script: Vec<ChatResponse>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            requests: Arc::new(Mutex::new(Vec::new())),
            fallback: "done".to_string(),
        }
    }

    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = fallback.into();
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Responses not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ChatResponse, LlmError> {
        self.requests.lock().push(RecordedRequest {
            messages: messages.to_vec(),
            tools: tools.iter().map(|tool| tool.name.clone()).collect(),
        });
        let next = self.script.lock().pop_front();
        Ok(next.unwrap_or_else(|| ChatResponse::text(self.fallback.clone())))
    }
}

/// Fails every request with a provider error.
#[derive(Debug, Clone)]
pub struct FailingModel {
    message: String,
}

impl FailingModel {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl ChatModel for FailingModel {
    fn model_name(&self) -> &str {
        "failing"
    }

    async fn chat(
        &self,
        _messages: &[ChatMessage],
        _tools: &[ToolDefinition],
    ) -> Result<ChatResponse, LlmError> {
        Err(LlmError::Backend(self.message.clone()))
    }
}

/// Build a provider-side tool call with raw JSON arguments.
pub fn provider_tool_call(id: &str, name: &str, arguments: &str) -> LlmToolCall {
    LlmToolCall {
        id: id.to_string(),
        call_type: "function".to_string(),
        function: FunctionCall {
            name: name.to_string(),
            arguments: arguments.to_string(),
        },
    }
}

#[derive(Debug, Clone)]
pub struct StubChatResponse {
    text: Option<String>,
    tool_calls: Option<Vec<LlmToolCall>>,
}

impl std::fmt::Display for StubChatResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text.as_deref().unwrap_or_default())
    }
}

impl LlmChatResponse for StubChatResponse {
    fn text(&self) -> Option<String> {
        self.text.clone()
    }

    fn tool_calls(&self) -> Option<Vec<LlmToolCall>> {
        self.tool_calls.clone()
    }
}

#[derive(Debug, Default)]
struct StubState {
    messages: Vec<LlmChatMessage>,
    tools: Option<Vec<String>>,
    embedded: Vec<String>,
}

/// `LLMProvider` that answers with one canned reply and records what it was sent.
#[derive(Debug, Clone)]
pub struct StubProvider {
    reply: StubChatResponse,
    failure: Option<String>,
    dimensions: usize,
    state: Arc<Mutex<StubState>>,
}

impl Default for StubProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl StubProvider {
    pub fn new() -> Self {
        Self {
            reply: StubChatResponse {
                text: Some("done".to_string()),
                tool_calls: None,
            },
            failure: None,
            dimensions: 4,
            state: Arc::new(Mutex::new(StubState::default())),
        }
    }

    pub fn reply_text(mut self, text: impl Into<String>) -> Self {
        self.reply = StubChatResponse {
            text: Some(text.into()),
            tool_calls: None,
        };
        self
    }

    pub fn reply_tool_calls(mut self, calls: Vec<LlmToolCall>) -> Self {
        self.reply = StubChatResponse {
            text: None,
            tool_calls: Some(calls),
        };
        self
    }

    pub fn fail_with(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    pub fn last_messages(&self) -> Vec<LlmChatMessage> {
        self.state.lock().messages.clone()
    }

    /// Names of the tools offered on the last chat call.
    pub fn last_tools(&self) -> Vec<String> {
        self.state.lock().tools.clone().unwrap_or_default()
    }

    /// Whether the last chat call passed a tool list at all.
    pub fn tools_offered(&self) -> Option<bool> {
        let state = self.state.lock();
        if state.messages.is_empty() {
            return None;
        }
        Some(state.tools.is_some())
    }

    /// Every input passed to `embed`, in order.
    pub fn embedded(&self) -> Vec<String> {
        self.state.lock().embedded.clone()
    }

    fn error(&self) -> Option<LLMError> {
        self.failure.clone().map(LLMError::ProviderError)
    }
}

#[async_trait]
impl ChatProvider for StubProvider {
    async fn chat_with_tools(
        &self,
        messages: &[LlmChatMessage],
        tools: Option<&[Tool]>,
        _json_schema: Option<StructuredOutputFormat>,
    ) -> Result<Box<dyn LlmChatResponse>, LLMError> {
        {
            let mut state = self.state.lock();
            state.messages = messages.to_vec();
            state.tools = tools.map(|tools| {
                tools
                    .iter()
                    .map(|tool| tool.function.name.clone())
                    .collect()
            });
        }
        if let Some(err) = self.error() {
            return Err(err);
        }
        Ok(Box::new(self.reply.clone()))
    }
}

#[async_trait]
impl CompletionProvider for StubProvider {
    async fn complete(
        &self,
        _req: &CompletionRequest,
        _json_schema: Option<StructuredOutputFormat>,
    ) -> Result<CompletionResponse, LLMError> {
        Err(LLMError::ProviderError("completion is not scripted".to_string()))
    }
}

/// Embeddings are `[len, 1.0, 0.0, ...]` so distinct inputs stay distinguishable.
#[async_trait]
impl EmbeddingProvider for StubProvider {
    async fn embed(&self, input: Vec<String>) -> Result<Vec<Vec<f32>>, LLMError> {
        self.state.lock().embedded.extend(input.iter().cloned());
        if let Some(err) = self.error() {
            return Err(err);
        }
        Ok(input
            .iter()
            .map(|text| {
                let mut vector = vec![0.0; self.dimensions];
                if let Some(first) = vector.first_mut() {
                    *first = text.chars().count() as f32;
                }
                if let Some(second) = vector.get_mut(1) {
                    *second = 1.0;
                }
                vector
            })
            .collect())
    }
}

#[async_trait]
impl ModelsProvider for StubProvider {}

impl LLMProvider for StubProvider {}

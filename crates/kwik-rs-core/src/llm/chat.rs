use super::build_provider;
use async_trait::async_trait;
use autoagents_llm::chat::{
    ChatMessage as LlmMessage, ChatProvider, ChatResponse as _, ChatRole as LlmRole, FunctionTool,
    MessageType, Tool,
};
use autoagents_llm::{FunctionCall, LLMProvider, ToolCall as LlmToolCall};
use kwik_rs_config::LlmConfig;
use kwik_rs_protocol::{
    ChatMessage, ChatModel, ChatResponse, ChatRole, LlmError, ToolCall, ToolDefinition,
};
use log::{debug, warn};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// `ChatModel` backed by an `LLMProvider`.
#[derive(Clone)]
pub struct ProviderChatModel {
    inner: Arc<dyn LLMProvider>,
    model: String,
}

impl std::fmt::Debug for ProviderChatModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderChatModel")
            .field("model", &self.model)
            .finish()
    }
}

impl ProviderChatModel {
    pub fn new(inner: Arc<dyn LLMProvider>, model: impl Into<String>) -> Self {
        Self {
            inner,
            model: model.into(),
        }
    }

    /// Build the configured provider, reading the API key from the process environment.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        Ok(Self::new(build_provider(config, &config.model)?, &config.model))
    }
}

#[async_trait]
impl ChatModel for ProviderChatModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ChatResponse, LlmError> {
        let messages = to_provider_messages(messages);
        let tools = tools.iter().map(to_provider_tool).collect::<Vec<_>>();
        debug!(
            "sending chat request (model={}, messages={}, tools={})",
            self.model,
            messages.len(),
            tools.len()
        );
        let offered = (!tools.is_empty()).then_some(tools.as_slice());
        let response = self
            .inner
            .chat_with_tools(&messages, offered, None)
            .await
            .map_err(|err| LlmError::Backend(err.to_string()))?;
        Ok(ChatResponse {
            text: response.text().filter(|text| !text.is_empty()),
            tool_calls: response
                .tool_calls()
                .unwrap_or_default()
                .into_iter()
                .map(from_provider_call)
                .collect(),
        })
    }
}

/// Tool results carry the answered call's name, looked up from the
/// assistant message that requested it.
fn to_provider_messages(messages: &[ChatMessage]) -> Vec<LlmMessage> {
    let names: HashMap<&str, &str> = messages
        .iter()
        .flat_map(|message| message.tool_calls.iter())
        .map(|call| (call.id.as_str(), call.name.as_str()))
        .collect();

    messages
        .iter()
        .map(|message| match message.role {
            ChatRole::Tool => {
                let id = message.tool_call_id.clone().unwrap_or_default();
                let name = names.get(id.as_str()).copied().unwrap_or_default();
                LlmMessage {
                    role: LlmRole::Tool,
                    message_type: MessageType::ToolResult(vec![provider_call(
                        id,
                        name,
                        message.content.clone(),
                    )]),
                    content: String::new(),
                }
            }
            ChatRole::Assistant if !message.tool_calls.is_empty() => LlmMessage {
                role: LlmRole::Assistant,
                message_type: MessageType::ToolUse(
                    message
                        .tool_calls
                        .iter()
                        .map(|call| {
                            provider_call(call.id.clone(), &call.name, call.arguments.to_string())
                        })
                        .collect(),
                ),
                content: message.content.clone(),
            },
            role => LlmMessage {
                role: match role {
                    ChatRole::System => LlmRole::System,
                    ChatRole::Assistant => LlmRole::Assistant,
                    _ => LlmRole::User,
                },
                message_type: MessageType::Text,
                content: message.content.clone(),
            },
        })
        .collect()
}

fn provider_call(id: String, name: &str, arguments: String) -> LlmToolCall {
    LlmToolCall {
        id,
        call_type: "function".to_string(),
        function: FunctionCall {
            name: name.to_string(),
            arguments,
        },
    }
}

fn to_provider_tool(tool: &ToolDefinition) -> Tool {
    Tool {
        tool_type: "function".to_string(),
        function: FunctionTool {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: tool.parameters.clone(),
        },
    }
}

fn from_provider_call(call: LlmToolCall) -> ToolCall {
    let raw = call.function.arguments;
    let arguments = if raw.trim().is_empty() {
        Value::Object(Default::default())
    } else {
        serde_json::from_str(&raw).unwrap_or_else(|err| {
            warn!(
                "tool call arguments are not valid json (tool_name={}): {}",
                call.function.name, err
            );
            Value::String(raw)
        })
    };
    ToolCall::new(call.id, call.function.name, arguments)
}

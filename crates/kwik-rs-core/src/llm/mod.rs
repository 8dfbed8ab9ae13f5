//! LLM provider construction and the adapters that put it behind the
//! runtime's `ChatModel` and `Embedder` seams.

mod chat;
mod embeddings;

pub use chat::ProviderChatModel;
pub use embeddings::ProviderEmbedder;

use autoagents_llm::LLMProvider;
use autoagents_llm::backends::openai::OpenAI;
use autoagents_llm::builder::LLMBuilder;
use kwik_rs_config::LlmConfig;
use kwik_rs_protocol::LlmError;
use log::info;
use std::sync::Arc;

/// Build the provider named by `config.provider` for `model`, reading the
/// API key from the process environment.
pub fn build_provider(config: &LlmConfig, model: &str) -> Result<Arc<dyn LLMProvider>, LlmError> {
    build_provider_with(config, model, None, |name| std::env::var(name).ok())
}

/// Build a provider with a custom environment lookup and optional embedding
/// dimensions.
pub fn build_provider_with<F>(
    config: &LlmConfig,
    model: &str,
    embedding_dimensions: Option<usize>,
    lookup: F,
) -> Result<Arc<dyn LLMProvider>, LlmError>
where
    F: Fn(&str) -> Option<String>,
{
    match config.provider.as_str() {
        "openai" => {
            let key = api_key(config, lookup)?;
            info!(
                "building llm provider (provider={}, model={}, base_url={})",
                config.provider, model, config.base_url
            );
            let mut builder = LLMBuilder::<OpenAI>::new()
                .api_key(key)
                .model(model)
                .base_url(base_url(&config.base_url))
                .timeout_seconds(config.timeout_secs);
            if let Some(temperature) = config.temperature {
                builder = builder.temperature(temperature);
            }
            if let Some(dimensions) = embedding_dimensions {
                builder = builder.embedding_dimensions(dimensions as u32);
            }
            let llm: Arc<dyn LLMProvider> = builder
                .build()
                .map_err(|err| LlmError::Backend(err.to_string()))?;
            Ok(llm)
        }
        other => Err(LlmError::UnsupportedProvider(other.to_string())),
    }
}

/// Read the API key named by `config.api_key_env` through `lookup`.
pub(crate) fn api_key<F>(config: &LlmConfig, lookup: F) -> Result<String, LlmError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(&config.api_key_env)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| LlmError::MissingCredentials(config.api_key_env.clone()))
}

/// The backend joins endpoint paths onto the base url, which needs a trailing slash.
fn base_url(raw: &str) -> String {
    format!("{}/", raw.trim_end_matches('/'))
}

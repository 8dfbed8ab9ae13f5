use super::build_provider_with;
use async_trait::async_trait;
use autoagents_llm::LLMProvider;
use autoagents_llm::embedding::EmbeddingProvider;
use kwik_rs_config::{LlmConfig, RetrievalConfig};
use kwik_rs_knowledge::{Embedder, KnowledgeError};
use kwik_rs_protocol::LlmError;
use log::debug;
use std::sync::Arc;

/// `Embedder` backed by an `LLMProvider` embeddings endpoint.
#[derive(Clone)]
pub struct ProviderEmbedder {
    inner: Arc<dyn LLMProvider>,
    model: String,
    dimensions: usize,
}

impl ProviderEmbedder {
    pub fn new(inner: Arc<dyn LLMProvider>, model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            inner,
            model: model.into(),
            dimensions,
        }
    }

    pub fn from_config(llm: &LlmConfig, retrieval: &RetrievalConfig) -> Result<Self, LlmError> {
        Self::from_config_with(llm, retrieval, |name| std::env::var(name).ok())
    }

    pub fn from_config_with<F>(
        llm: &LlmConfig,
        retrieval: &RetrievalConfig,
        lookup: F,
    ) -> Result<Self, LlmError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let inner = build_provider_with(
            llm,
            &retrieval.embedding_model,
            Some(retrieval.dimensions),
            lookup,
        )?;
        Ok(Self::new(
            inner,
            &retrieval.embedding_model,
            retrieval.dimensions,
        ))
    }
}

#[async_trait]
impl Embedder for ProviderEmbedder {
    fn name(&self) -> String {
        format!("openai-{}-{}", self.model, self.dimensions)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, KnowledgeError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(
            "requesting embeddings (model={}, inputs={})",
            self.model,
            texts.len()
        );
        let vectors = self
            .inner
            .embed(texts.to_vec())
            .await
            .map_err(|err| KnowledgeError::Embedding(err.to_string()))?;
        if vectors.len() != texts.len() {
            return Err(KnowledgeError::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            )));
        }
        if let Some(vector) = vectors.iter().find(|vector| vector.len() != self.dimensions) {
            return Err(KnowledgeError::Embedding(format!(
                "expected {} dimensions, got {}",
                self.dimensions,
                vector.len()
            )));
        }
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::ProviderEmbedder;
    use kwik_rs_knowledge::Embedder;
    use kwik_rs_test_utils::StubProvider;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[tokio::test]
    async fn embeds_every_input_in_order() {
        let provider = StubProvider::new().with_dimensions(3);
        let embedder = ProviderEmbedder::new(Arc::new(provider.clone()), "text-embedding-3-small", 3);
        let texts = vec!["ab".to_string(), "abcd".to_string()];
        let vectors = embedder.embed(&texts).await.expect("embed");
        assert_eq!(vectors, vec![vec![2.0, 1.0, 0.0], vec![4.0, 1.0, 0.0]]);
        assert_eq!(provider.embedded(), texts);
        assert_eq!(embedder.name(), "openai-text-embedding-3-small-3");
    }

    #[tokio::test]
    async fn empty_input_skips_the_provider() {
        let provider = StubProvider::new();
        let embedder = ProviderEmbedder::new(Arc::new(provider.clone()), "m", 4);
        assert!(embedder.embed(&[]).await.expect("embed").is_empty());
        assert!(provider.embedded().is_empty());
    }

    #[tokio::test]
    async fn dimension_mismatch_is_an_embedding_error() {
        let provider = StubProvider::new().with_dimensions(2);
        let embedder = ProviderEmbedder::new(Arc::new(provider), "m", 8);
        let err = embedder.embed(&["x".to_string()]).await.unwrap_err();
        assert!(err.to_string().contains("expected 8 dimensions, got 2"));
    }

    #[tokio::test]
    async fn provider_failure_is_an_embedding_error() {
        let provider = StubProvider::new().fail_with("quota exceeded");
        let embedder = ProviderEmbedder::new(Arc::new(provider), "m", 4);
        let err = embedder.embed(&["x".to_string()]).await.unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
    }
}

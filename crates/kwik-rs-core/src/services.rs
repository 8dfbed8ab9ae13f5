//! Wiring of storage, retrieval and memory into the services tools share.

use crate::error::KwikCoreError;
use crate::llm::ProviderEmbedder;
use kwik_rs_config::{EmbedderKind, FactCapturePolicyConfig, KwikConfig, StoragePaths};
use kwik_rs_knowledge::{
    Chunker, DocumentLoader, DocumentRegistry, Embedder, HashingEmbedder, PdfiumLoader,
    VectorKnowledgeBase,
};
use kwik_rs_memory::{
    FactCapturePolicy, FactSynthesizer, FileTopicMemory, TopicDigestSynthesizer,
};
use kwik_rs_tools::{
    KnowledgeSettings, ToolContext, ToolOutputPolicy, ToolServices, coded_tool_registry,
};
use log::{debug, info};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Translate the capture policy from config into the memory runtime policy.
pub(crate) fn capture_policy_from_config(config: &FactCapturePolicyConfig) -> FactCapturePolicy {
    FactCapturePolicy {
        redact_patterns: config.redact_patterns.clone(),
        detect_secrets: config.detect_secrets,
        secret_entropy_threshold: config.secret_entropy_threshold,
        max_fact_chars: config.max_fact_chars,
        redaction_replacement: config.redaction_replacement.clone(),
    }
}

/// Assembles [`ToolServices`] from config; unset parts fall back to config defaults.
pub struct ServicesBuilder<'a> {
    config: &'a KwikConfig,
    paths: StoragePaths,
    loader: Option<Arc<dyn DocumentLoader>>,
    embedder: Option<Arc<dyn Embedder>>,
    synthesizer: Option<Arc<dyn FactSynthesizer>>,
}

impl<'a> ServicesBuilder<'a> {
    /// Storage paths resolve against `cwd` unless the config names absolute ones.
    pub fn new(config: &'a KwikConfig, cwd: impl AsRef<Path>) -> Self {
        Self {
            config,
            paths: config.storage.resolve(cwd.as_ref()),
            loader: None,
            embedder: None,
            synthesizer: None,
        }
    }

    pub fn loader(mut self, loader: Arc<dyn DocumentLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn synthesizer(mut self, synthesizer: Arc<dyn FactSynthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    pub fn build(self) -> Result<(Arc<ToolServices>, StoragePaths), KwikCoreError> {
        let config = self.config;
        let paths = self.paths;
        std::fs::create_dir_all(&paths.root)?;
        info!("opening knowledge stores (root={})", paths.root.display());

        let memory = FileTopicMemory::new(&paths.topic_memory)?
            .with_policy(capture_policy_from_config(&config.memory.capture))?;

        let retrieval = &config.retrieval;
        let embedder = match self.embedder {
            Some(embedder) => embedder,
            None => default_embedder(config)?,
        };
        debug!(
            "retrieval configured (embedder={}, chunk_size={}, chunk_overlap={}, top_k={})",
            embedder.name(),
            retrieval.chunk_size,
            retrieval.chunk_overlap,
            retrieval.top_k
        );
        let knowledge = VectorKnowledgeBase::new(
            &paths.vector_store,
            embedder,
            Chunker::new(retrieval.chunk_size, retrieval.chunk_overlap),
        )
        .with_min_score(retrieval.min_score);

        let loader: Arc<dyn DocumentLoader> = match self.loader {
            Some(loader) => loader,
            None => Arc::new(PdfiumLoader::new(
                retrieval.pdfium_library.as_ref().map(PathBuf::from),
            )),
        };
        let synthesizer: Arc<dyn FactSynthesizer> = match self.synthesizer {
            Some(synthesizer) => synthesizer,
            None => Arc::new(TopicDigestSynthesizer {
                min_facts: config.memory.reorganize.min_facts,
                max_fact_chars: config.memory.reorganize.max_fact_chars,
            }),
        };

        let services = Arc::new(ToolServices {
            memory: Arc::new(memory),
            knowledge: Arc::new(knowledge),
            documents: Arc::new(DocumentRegistry::new(&paths.document_registry)),
            loader,
            synthesizer,
            output_policy: Some(ToolOutputPolicy::from(&config.tools.output_policy)),
            settings: KnowledgeSettings {
                top_k: retrieval.top_k,
                sample_chars: retrieval.sample_chars,
                keyword_count: retrieval.keyword_count,
            },
        });
        Ok((services, paths))
    }
}

fn default_embedder(config: &KwikConfig) -> Result<Arc<dyn Embedder>, KwikCoreError> {
    let embedder: Arc<dyn Embedder> = match config.retrieval.embedder {
        EmbedderKind::Hashing => Arc::new(HashingEmbedder::new(config.retrieval.dimensions)),
        EmbedderKind::Openai => Arc::new(ProviderEmbedder::from_config(
            &config.llm,
            &config.retrieval,
        )?),
    };
    Ok(embedder)
}

/// Invoke a coded tool directly, outside any agent turn.
pub async fn call_tool(
    services: &Arc<ToolServices>,
    name: &str,
    args: Value,
) -> Result<Value, KwikCoreError> {
    let registry = coded_tool_registry();
    let tool = registry
        .get(name)
        .ok_or_else(|| kwik_rs_protocol::ToolError::ToolNotFound(name.to_string()))?;
    let ctx = ToolContext::new(Uuid::nil(), "cli", services.clone());
    Ok(ctx.execute_tool(tool.as_ref(), args).await?)
}

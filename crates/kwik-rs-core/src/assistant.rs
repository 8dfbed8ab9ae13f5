//! PDF knowledge assistant: the facade the web app and the CLI talk to.

use crate::error::KwikCoreError;
use crate::llm::ProviderChatModel;
use crate::network::{AgentNetwork, load_network};
use crate::orchestrator::{Orchestrator, RunLimits, RunResult};
use crate::services::ServicesBuilder;
use crate::synth::LlmFactSynthesizer;
use kwik_rs_config::{KwikConfig, StoragePaths, SynthesizerKind};
use kwik_rs_knowledge::{DocumentLoader, DocumentRecord, Embedder};
use kwik_rs_protocol::{ChatModel, SessionId};
use kwik_rs_tools::{ToolServices, coded_tool_registry};
use log::info;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Counts shown on the stats endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KnowledgeStats {
    pub document_count: usize,
    pub topic_count: usize,
    pub fact_count: usize,
}

/// Instruction sent to the front-man after a PDF upload.
pub fn upload_instruction(file_path: &Path) -> String {
    format!(
        "A PDF file has been uploaded at: {}\n\
         Please add this document to the knowledge base and extract key topics and facts from it.",
        file_path.display()
    )
}

/// Builder for [`KnowledgeAssistant`]; unset parts come from config.
pub struct AssistantBuilder {
    config: KwikConfig,
    cwd: Option<PathBuf>,
    model: Option<Arc<dyn ChatModel>>,
    loader: Option<Arc<dyn DocumentLoader>>,
    embedder: Option<Arc<dyn Embedder>>,
}

impl AssistantBuilder {
    /// Directory relative storage paths resolve against; defaults to the process cwd.
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn model(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn loader(mut self, loader: Arc<dyn DocumentLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn build(self) -> Result<KnowledgeAssistant, KwikCoreError> {
        let config = self.config;
        let cwd = match self.cwd {
            Some(cwd) => cwd,
            None => std::env::current_dir()?,
        };
        let model: Arc<dyn ChatModel> = match self.model {
            Some(model) => model,
            None => Arc::new(ProviderChatModel::from_config(&config.llm)?),
        };

        let mut services = ServicesBuilder::new(&config, &cwd);
        if let Some(loader) = self.loader {
            services = services.loader(loader);
        }
        if let Some(embedder) = self.embedder {
            services = services.embedder(embedder);
        }
        if config.memory.reorganize.synthesizer == SynthesizerKind::Llm {
            services = services.synthesizer(Arc::new(LlmFactSynthesizer::new(
                model.clone(),
                config.memory.reorganize.max_fact_chars,
            )));
        }
        let (services, paths) = services.build()?;

        let network = AgentNetwork::build(
            load_network(config.agents.manifest.as_deref())?,
            &coded_tool_registry(),
        )?;
        let orchestrator = Orchestrator::new(
            network,
            model,
            services.clone(),
            RunLimits::from(&config.agents),
        );
        info!(
            "knowledge assistant ready (network={}, data_dir={})",
            orchestrator.network().name(),
            paths.root.display()
        );
        Ok(KnowledgeAssistant {
            config,
            paths,
            services,
            orchestrator,
        })
    }
}

/// Session-holding assistant over the agent network and the knowledge stores.
pub struct KnowledgeAssistant {
    config: KwikConfig,
    paths: StoragePaths,
    services: Arc<ToolServices>,
    orchestrator: Orchestrator,
}

impl KnowledgeAssistant {
    pub fn builder(config: KwikConfig) -> AssistantBuilder {
        AssistantBuilder {
            config,
            cwd: None,
            model: None,
            loader: None,
            embedder: None,
        }
    }

    /// Assistant with the OpenAI model and pdfium loader named by `config`.
    pub fn from_config(config: KwikConfig) -> Result<Self, KwikCoreError> {
        Self::builder(config).build()
    }

    pub fn config(&self) -> &KwikConfig {
        &self.config
    }

    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    pub fn services(&self) -> &Arc<ToolServices> {
        &self.services
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Run one chat turn.
    pub async fn process_user_query(&self, query: &str) -> Result<RunResult, KwikCoreError> {
        self.orchestrator.run(query).await
    }

    /// Ask the agents to ingest an uploaded PDF and commit its key facts.
    pub async fn process_pdf_upload(&self, file_path: &Path) -> Result<RunResult, KwikCoreError> {
        if !file_path.is_file() {
            return Err(KwikCoreError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("File not found: {}", file_path.display()),
            )));
        }
        info!("processing upload (path={})", file_path.display());
        self.orchestrator
            .run(&upload_instruction(file_path))
            .await
    }

    pub async fn list_topics(&self) -> Result<Vec<String>, KwikCoreError> {
        Ok(self.services.memory.list_topics().await?)
    }

    pub async fn topic_facts(&self, topic: &str) -> Result<Vec<String>, KwikCoreError> {
        Ok(self.services.memory.recall(topic).await?)
    }

    pub fn documents(&self) -> Result<Vec<DocumentRecord>, KwikCoreError> {
        Ok(self.services.documents.list()?)
    }

    pub async fn stats(&self) -> Result<KnowledgeStats, KwikCoreError> {
        knowledge_stats(&self.services).await
    }

    /// Start a fresh conversation.
    pub async fn reset(&self) -> SessionId {
        self.orchestrator.reset().await
    }
}

/// Document, topic and fact counts over `services`.
pub async fn knowledge_stats(services: &ToolServices) -> Result<KnowledgeStats, KwikCoreError> {
    let records = services.memory.records().await?;
    let topic_count = records
        .iter()
        .map(|record| record.topic.as_str())
        .collect::<HashSet<_>>()
        .len();
    Ok(KnowledgeStats {
        document_count: services.documents.count()?,
        topic_count,
        fact_count: records.len(),
    })
}

//! Configuration schema for Kwik agents.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root config for the knowledge assistant and its agent runtime.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct KwikConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub agents: AgentsConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

impl KwikConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> KwikConfigBuilder {
        KwikConfigBuilder::new()
    }
}

/// Builder for assembling a `KwikConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct KwikConfigBuilder {
    config: KwikConfig,
}

impl KwikConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self {
            config: KwikConfig::default(),
        }
    }

    /// Replace the agent runtime configuration.
    pub fn agents(mut self, agents: AgentsConfig) -> Self {
        self.config.agents = agents;
        self
    }

    /// Replace the chat model configuration.
    pub fn llm(mut self, llm: LlmConfig) -> Self {
        self.config.llm = llm;
        self
    }

    /// Replace the storage layout.
    pub fn storage(mut self, storage: StorageConfig) -> Self {
        self.config.storage = storage;
        self
    }

    /// Point all storage files at a single data directory.
    pub fn data_dir(mut self, root: impl AsRef<Path>) -> Self {
        self.config.storage.root = Some(root.as_ref().to_string_lossy().to_string());
        self
    }

    /// Replace the topic memory configuration.
    pub fn memory(mut self, memory: MemoryConfig) -> Self {
        self.config.memory = memory;
        self
    }

    /// Replace the retrieval configuration.
    pub fn retrieval(mut self, retrieval: RetrievalConfig) -> Self {
        self.config.retrieval = retrieval;
        self
    }

    /// Replace the web server configuration.
    pub fn server(mut self, server: ServerConfig) -> Self {
        self.config.server = server;
        self
    }

    /// Replace the global tool configuration.
    pub fn tools(mut self, tools: ToolsConfig) -> Self {
        self.config.tools = tools;
        self
    }

    /// Finalize and return the built `KwikConfig`.
    pub fn build(self) -> KwikConfig {
        self.config
    }
}

/// Agent runtime limits and the network manifest location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentsConfig {
    /// Path to a JSON5 network manifest; the built-in knowledge network is used when unset.
    #[serde(default)]
    pub manifest: Option<String>,
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,
    #[serde(default = "default_max_delegation_depth")]
    pub max_delegation_depth: usize,
    /// Messages of front-man history replayed into each turn.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            manifest: None,
            max_tool_rounds: default_max_tool_rounds(),
            max_delegation_depth: default_max_delegation_depth(),
            history_window: default_history_window(),
        }
    }
}

fn default_max_tool_rounds() -> usize {
    8
}

fn default_max_delegation_depth() -> usize {
    4
}

fn default_history_window() -> usize {
    20
}

/// Chat and embeddings provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Backend used to build the provider; `openai` is the only one built in.
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
            base_url: default_llm_base_url(),
            api_key_env: default_api_key_env(),
            temperature: None,
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

fn default_llm_provider() -> String {
    "openai".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_llm_timeout_secs() -> u64 {
    120
}

/// File locations for persisted knowledge state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base directory for relative file names (defaults to the working directory).
    #[serde(default)]
    pub root: Option<String>,
    #[serde(default = "default_topic_memory_file")]
    pub topic_memory: String,
    #[serde(default = "default_document_registry_file")]
    pub document_registry: String,
    #[serde(default = "default_vector_store_file")]
    pub vector_store: String,
    #[serde(default = "default_uploads_dir")]
    pub uploads: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: None,
            topic_memory: default_topic_memory_file(),
            document_registry: default_document_registry_file(),
            vector_store: default_vector_store_file(),
            uploads: default_uploads_dir(),
        }
    }
}

impl StorageConfig {
    /// Resolve every storage location against the configured root or `cwd`.
    pub fn resolve(&self, cwd: &Path) -> StoragePaths {
        let root = match self.root.as_deref() {
            Some(root) if Path::new(root).is_absolute() => PathBuf::from(root),
            Some(root) => cwd.join(root),
            None => cwd.to_path_buf(),
        };
        let join = |value: &str| {
            let path = Path::new(value);
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                root.join(path)
            }
        };
        StoragePaths {
            topic_memory: join(&self.topic_memory),
            document_registry: join(&self.document_registry),
            vector_store: join(&self.vector_store),
            uploads: join(&self.uploads),
            root,
        }
    }
}

/// Absolute storage locations derived from `StorageConfig`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePaths {
    pub root: PathBuf,
    pub topic_memory: PathBuf,
    pub document_registry: PathBuf,
    pub vector_store: PathBuf,
    pub uploads: PathBuf,
}

fn default_topic_memory_file() -> String {
    "TopicMemory.jsonl".to_string()
}

fn default_document_registry_file() -> String {
    "DocumentRegistry.json".to_string()
}

fn default_vector_store_file() -> String {
    "pdf_knowledge_vectorstore.json".to_string()
}

fn default_uploads_dir() -> String {
    "uploads".to_string()
}

/// Topic memory settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MemoryConfig {
    #[serde(default)]
    pub capture: FactCapturePolicyConfig,
    #[serde(default)]
    pub reorganize: ReorganizeConfig,
}

/// Sanitizing applied to facts before they are committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactCapturePolicyConfig {
    #[serde(default)]
    pub max_fact_chars: Option<usize>,
    #[serde(default)]
    pub redact_patterns: Vec<String>,
    #[serde(default = "default_detect_secrets")]
    pub detect_secrets: bool,
    #[serde(default = "default_secret_entropy_threshold")]
    pub secret_entropy_threshold: f32,
    #[serde(default = "default_redaction_replacement")]
    pub redaction_replacement: String,
}

impl Default for FactCapturePolicyConfig {
    fn default() -> Self {
        Self {
            max_fact_chars: None,
            redact_patterns: Vec::new(),
            detect_secrets: default_detect_secrets(),
            secret_entropy_threshold: default_secret_entropy_threshold(),
            redaction_replacement: default_redaction_replacement(),
        }
    }
}

/// Secret detection rewrites facts, so it is opt-in.
fn default_detect_secrets() -> bool {
    false
}

/// Default entropy threshold for identifying secrets.
fn default_secret_entropy_threshold() -> f32 {
    3.7
}

/// Which synthesizer `reorganize` uses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SynthesizerKind {
    /// Deterministic per-topic digests.
    #[default]
    Digest,
    /// Ask the chat model for higher-level facts.
    Llm,
}

/// Memory reorganization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReorganizeConfig {
    #[serde(default)]
    pub synthesizer: SynthesizerKind,
    /// Minimum committed facts before a topic gets a digest.
    #[serde(default = "default_reorganize_min_facts")]
    pub min_facts: usize,
    #[serde(default = "default_reorganize_max_fact_chars")]
    pub max_fact_chars: usize,
}

impl Default for ReorganizeConfig {
    fn default() -> Self {
        Self {
            synthesizer: SynthesizerKind::default(),
            min_facts: default_reorganize_min_facts(),
            max_fact_chars: default_reorganize_max_fact_chars(),
        }
    }
}

fn default_reorganize_min_facts() -> usize {
    2
}

fn default_reorganize_max_fact_chars() -> usize {
    1500
}

/// Embedding backend used for document chunks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderKind {
    /// Local feature-hashing embedder.
    #[default]
    Hashing,
    /// OpenAI-compatible embeddings endpoint.
    Openai,
}

/// Document chunking and similarity search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default)]
    pub embedder: EmbedderKind,
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub min_score: Option<f32>,
    /// Characters of document text handed to the extraction brief.
    #[serde(default = "default_sample_chars")]
    pub sample_chars: usize,
    /// Keywords recorded as a document's derived topics.
    #[serde(default = "default_keyword_count")]
    pub keyword_count: usize,
    /// Directory containing the pdfium shared library.
    #[serde(default)]
    pub pdfium_library: Option<String>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            embedder: EmbedderKind::default(),
            dimensions: default_dimensions(),
            embedding_model: default_embedding_model(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
            min_score: None,
            sample_chars: default_sample_chars(),
            keyword_count: default_keyword_count(),
            pdfium_library: None,
        }
    }
}

fn default_dimensions() -> usize {
    384
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_top_k() -> usize {
    4
}

fn default_sample_chars() -> usize {
    10_000
}

fn default_keyword_count() -> usize {
    8
}

/// HTTP front end settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5002
}

fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024
}

/// Global tool configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ToolsConfig {
    #[serde(default)]
    pub output_policy: ToolOutputPolicyConfig,
}

/// Output policy for tool results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutputPolicyConfig {
    #[serde(default = "default_max_string_bytes")]
    pub max_string_bytes: usize,
    #[serde(default = "default_max_array_len")]
    pub max_array_len: usize,
    #[serde(default = "default_max_object_entries")]
    pub max_object_entries: usize,
    #[serde(default)]
    pub redact_keys: Vec<String>,
    #[serde(default = "default_redaction_replacement")]
    pub replacement: String,
}

impl Default for ToolOutputPolicyConfig {
    fn default() -> Self {
        Self {
            max_string_bytes: default_max_string_bytes(),
            max_array_len: default_max_array_len(),
            max_object_entries: default_max_object_entries(),
            redact_keys: Vec::new(),
            replacement: default_redaction_replacement(),
        }
    }
}

/// Default maximum string size for tool output in bytes.
fn default_max_string_bytes() -> usize {
    32 * 1024
}

/// Default maximum array length for tool output.
fn default_max_array_len() -> usize {
    256
}

/// Default maximum object entry count for tool output.
fn default_max_object_entries() -> usize {
    256
}

/// Default replacement marker for redacted content.
fn default_redaction_replacement() -> String {
    "[REDACTED]".to_string()
}

use kwik_rs_knowledge::{
    Chunker, DocumentRegistry, HashingEmbedder, PlainTextLoader, VectorKnowledgeBase,
};
use kwik_rs_memory::{FactCapturePolicy, FileTopicMemory, TopicDigestSynthesizer, TopicMemory};
use kwik_rs_tools::{KnowledgeSettings, ToolContext, ToolServices};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

/// Tool services backed by files in a temporary directory.
///
/// Documents are read with [`PlainTextLoader`], so a text file named `*.pdf`
/// stands in for a real PDF; form feeds separate pages.
pub struct TempServices {
    dir: TempDir,
    services: Arc<ToolServices>,
}

impl TempServices {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let memory = FileTopicMemory::new(dir.path().join("TopicMemory.jsonl"))
            .and_then(|memory| memory.with_policy(FactCapturePolicy::passthrough()))
            .expect("topic memory");
        Self::build(dir, Arc::new(memory))
    }

    /// Same layout, with `memory` in place of the file-backed store.
    pub fn with_memory(memory: Arc<dyn TopicMemory>) -> Self {
        Self::build(tempfile::tempdir().expect("tempdir"), memory)
    }

    fn build(dir: TempDir, memory: Arc<dyn TopicMemory>) -> Self {
        let root = dir.path();
        let knowledge = VectorKnowledgeBase::new(
            root.join("pdf_knowledge_vectorstore.json"),
            Arc::new(HashingEmbedder::new(128)),
            Chunker::new(400, 80),
        );
        let services = Arc::new(ToolServices {
            memory,
            knowledge: Arc::new(knowledge),
            documents: Arc::new(DocumentRegistry::new(root.join("DocumentRegistry.json"))),
            loader: Arc::new(PlainTextLoader),
            synthesizer: Arc::new(TopicDigestSynthesizer::default()),
            output_policy: None,
            settings: KnowledgeSettings::default(),
        });
        Self { dir, services }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn services(&self) -> Arc<ToolServices> {
        self.services.clone()
    }

    pub fn context(&self, agent_id: &str) -> ToolContext {
        ToolContext::new(Uuid::nil(), agent_id, self.services())
    }

    /// Write a fake PDF whose pages are `pages`.
    pub fn write_pdf(&self, name: &str, pages: &[&str]) -> PathBuf {
        let path = self.root().join(name);
        std::fs::write(&path, pages.join("\x0c")).expect("write document");
        path
    }
}

impl Default for TempServices {
    fn default() -> Self {
        Self::new()
    }
}

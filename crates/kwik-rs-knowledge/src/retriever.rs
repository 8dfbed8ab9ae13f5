//! Similarity search over indexed document chunks.

use crate::chunker::Chunker;
use crate::embed::{Embedder, cosine};
use crate::error::KnowledgeError;
use crate::loader::LoadedDocument;
use crate::snapshot::{StoredChunk, VectorSnapshot};
use async_trait::async_trait;
use log::{debug, info};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use uuid::Uuid;

/// Acknowledgment returned once a document's chunks are indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexReceipt {
    pub document_id: Uuid,
    pub chunk_count: usize,
}

/// A ranked chunk returned by a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub text: String,
    pub score: f32,
    /// Source document display name.
    pub source: String,
    pub page: usize,
    pub document_id: Uuid,
}

/// Retrieval seam used by the document tools.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Chunk, embed and persist `document` under `document_id`.
    async fn index(
        &self,
        document_id: Uuid,
        source: &str,
        document: &LoadedDocument,
    ) -> Result<IndexReceipt, KnowledgeError>;

    /// Up to `top_k` passages ranked by similarity to `query`.
    async fn query(&self, query: &str, top_k: usize) -> Result<Vec<Passage>, KnowledgeError>;

    /// Number of indexed chunks.
    async fn chunk_count(&self) -> Result<usize, KnowledgeError>;

    /// Drop every chunk of `document_id`; returns how many were removed.
    async fn remove(&self, document_id: Uuid) -> Result<usize, KnowledgeError>;
}

/// Modification time and length of the snapshot file when it was last read or written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: SystemTime,
    len: u64,
}

impl FileStamp {
    fn of(path: &Path) -> Option<Self> {
        let metadata = fs::metadata(path).ok()?;
        Some(Self {
            modified: metadata.modified().ok()?,
            len: metadata.len(),
        })
    }
}

#[derive(Default)]
struct Cache {
    loaded: bool,
    stamp: Option<FileStamp>,
    snapshot: Option<VectorSnapshot>,
}

/// Vector index persisted as a JSON snapshot and rewritten after every index call.
///
/// The cached snapshot is re-read whenever the file changes on disk, so an
/// index written by another process is picked up before the next query or
/// write. Writes from two processes that overlap between that re-read and
/// the save still race; the last save wins.
pub struct VectorKnowledgeBase {
    path: PathBuf,
    embedder: Arc<dyn Embedder>,
    chunker: Chunker,
    min_score: Option<f32>,
    state: Mutex<Cache>,
}

impl VectorKnowledgeBase {
    pub fn new(path: impl AsRef<Path>, embedder: Arc<dyn Embedder>, chunker: Chunker) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            embedder,
            chunker,
            min_score: None,
            state: Mutex::new(Cache::default()),
        }
    }

    /// Drop passages scoring below `min_score`.
    pub fn with_min_score(mut self, min_score: Option<f32>) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot on first use and again whenever the file changed.
    fn ensure_loaded(&self, cache: &mut Cache) -> Result<(), KnowledgeError> {
        let stamp = FileStamp::of(&self.path);
        if cache.loaded && cache.stamp == stamp {
            return Ok(());
        }
        if cache.loaded {
            debug!(
                "vector store changed on disk, reloading (path={})",
                self.path.display()
            );
        }
        let snapshot = VectorSnapshot::load(&self.path)?;
        if let Some(snapshot) = &snapshot {
            self.check_embedder(snapshot)?;
            info!(
                "loaded vector store (path={}, chunks={})",
                self.path.display(),
                snapshot.chunks.len()
            );
        }
        *cache = Cache {
            loaded: true,
            stamp,
            snapshot,
        };
        Ok(())
    }

    fn snapshot(&self) -> Result<Option<VectorSnapshot>, KnowledgeError> {
        let mut cache = self.state.lock();
        self.ensure_loaded(&mut cache)?;
        Ok(cache.snapshot.clone())
    }

    fn check_embedder(&self, snapshot: &VectorSnapshot) -> Result<(), KnowledgeError> {
        let expected = self.embedder.name();
        if snapshot.embedder != expected || snapshot.dimensions != self.embedder.dimensions() {
            return Err(KnowledgeError::EmbedderMismatch {
                expected,
                found: snapshot.embedder.clone(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Retriever for VectorKnowledgeBase {
    async fn index(
        &self,
        document_id: Uuid,
        source: &str,
        document: &LoadedDocument,
    ) -> Result<IndexReceipt, KnowledgeError> {
        let mut pending = Vec::new();
        for (idx, page) in document.pages.iter().enumerate() {
            for text in self.chunker.split(page) {
                pending.push((idx + 1, text));
            }
        }
        if pending.is_empty() {
            return Err(KnowledgeError::InvalidInput(format!(
                "{source} contains no extractable text"
            )));
        }

        let texts: Vec<String> = pending.iter().map(|(_, text)| text.clone()).collect();
        let embeddings = self.embedder.embed(&texts).await?;
        if embeddings.len() != texts.len() {
            return Err(KnowledgeError::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                embeddings.len()
            )));
        }

        let chunk_count = pending.len();
        let mut cache = self.state.lock();
        self.ensure_loaded(&mut cache)?;
        let snapshot = cache.snapshot.get_or_insert_with(|| {
            VectorSnapshot::empty(self.embedder.name(), self.embedder.dimensions())
        });
        let previous_len = snapshot.chunks.len();
        snapshot.chunks.extend(pending.into_iter().zip(embeddings).map(
            |((page, text), embedding)| StoredChunk {
                document_id,
                source: source.to_string(),
                page,
                text,
                embedding,
            },
        ));
        if let Err(err) = snapshot.save(&self.path) {
            snapshot.chunks.truncate(previous_len);
            return Err(err);
        }
        info!(
            "indexed document (document_id={}, source={}, chunks={}, total={})",
            document_id,
            source,
            chunk_count,
            snapshot.chunks.len()
        );
        cache.stamp = FileStamp::of(&self.path);
        Ok(IndexReceipt {
            document_id,
            chunk_count,
        })
    }

    async fn query(&self, query: &str, top_k: usize) -> Result<Vec<Passage>, KnowledgeError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(KnowledgeError::InvalidInput("query cannot be empty".to_string()));
        }
        let snapshot = match self.snapshot()? {
            Some(snapshot) if !snapshot.chunks.is_empty() => snapshot,
            _ => return Err(KnowledgeError::EmptyKnowledgeBase),
        };
        let query_vector = self
            .embedder
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| KnowledgeError::Embedding("no embedding for query".to_string()))?;

        let mut passages: Vec<Passage> = snapshot
            .chunks
            .into_iter()
            .map(|chunk| Passage {
                score: cosine(&query_vector, &chunk.embedding),
                text: chunk.text,
                source: chunk.source,
                page: chunk.page,
                document_id: chunk.document_id,
            })
            .filter(|passage| self.min_score.is_none_or(|min| passage.score >= min))
            .collect();
        passages.sort_by(|a, b| b.score.total_cmp(&a.score));
        passages.truncate(top_k.max(1));
        debug!(
            "vector query (query_len={}, returned={})",
            query.len(),
            passages.len()
        );
        Ok(passages)
    }

    async fn chunk_count(&self) -> Result<usize, KnowledgeError> {
        Ok(self
            .snapshot()?
            .map(|snapshot| snapshot.chunks.len())
            .unwrap_or(0))
    }

    async fn remove(&self, document_id: Uuid) -> Result<usize, KnowledgeError> {
        let mut cache = self.state.lock();
        self.ensure_loaded(&mut cache)?;
        let Some(snapshot) = cache.snapshot.as_mut() else {
            return Ok(0);
        };
        let kept: Vec<_> = snapshot
            .chunks
            .iter()
            .filter(|chunk| chunk.document_id != document_id)
            .cloned()
            .collect();
        let removed = snapshot.chunks.len() - kept.len();
        if removed == 0 {
            return Ok(0);
        }
        let previous = std::mem::replace(&mut snapshot.chunks, kept);
        if let Err(err) = snapshot.save(&self.path) {
            snapshot.chunks = previous;
            return Err(err);
        }
        info!(
            "removed document chunks (document_id={}, removed={}, total={})",
            document_id,
            removed,
            snapshot.chunks.len()
        );
        cache.stamp = FileStamp::of(&self.path);
        Ok(removed)
    }
}

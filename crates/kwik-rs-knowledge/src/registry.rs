//! Registry of ingested documents, kept as `{"documents": [...]}`.

use crate::error::KnowledgeError;
use crate::snapshot::write_atomic;
use chrono::{DateTime, Utc};
use log::debug;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Metadata written once when a document is ingested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Fresh for every ingestion, so re-uploads get their own entry.
    pub id: Uuid,
    pub filename: String,
    pub file_path: String,
    pub upload_date: DateTime<Utc>,
    pub page_count: usize,
    pub file_size_bytes: u64,
    #[serde(default)]
    pub chunk_count: usize,
    pub status: String,
    /// Top keywords of the document text.
    #[serde(default)]
    pub topics: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    documents: Vec<DocumentRecord>,
}

/// JSON-file registry; every write rewrites the file atomically.
#[derive(Debug)]
pub struct DocumentRegistry {
    path: PathBuf,
    lock: Mutex<()>,
}

impl DocumentRegistry {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All documents in ingestion order.
    pub fn list(&self) -> Result<Vec<DocumentRecord>, KnowledgeError> {
        let _guard = self.lock.lock();
        Ok(self.read()?.documents)
    }

    pub fn count(&self) -> Result<usize, KnowledgeError> {
        self.list().map(|documents| documents.len())
    }

    pub fn get(&self, id: Uuid) -> Result<Option<DocumentRecord>, KnowledgeError> {
        Ok(self.list()?.into_iter().find(|record| record.id == id))
    }

    /// Append `record` and persist the registry.
    pub fn add(&self, record: DocumentRecord) -> Result<(), KnowledgeError> {
        let _guard = self.lock.lock();
        let mut file = self.read()?;
        debug!(
            "registering document (id={}, filename={}, pages={})",
            record.id, record.filename, record.page_count
        );
        file.documents.push(record);
        write_atomic(&self.path, &serde_json::to_vec_pretty(&file)?)
    }

    fn read(&self) -> Result<RegistryFile, KnowledgeError> {
        if !self.path.exists() {
            return Ok(RegistryFile::default());
        }
        let contents = fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(RegistryFile::default());
        }
        Ok(serde_json::from_str(&contents)?)
    }
}

//! On-disk form of the vector index.

use crate::error::KnowledgeError;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct VectorSnapshot {
    pub version: u32,
    /// Embedder name the vectors were produced with.
    pub embedder: String,
    pub dimensions: usize,
    pub chunks: Vec<StoredChunk>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoredChunk {
    pub document_id: Uuid,
    /// Display name of the source document.
    pub source: String,
    /// 1-based page number.
    pub page: usize,
    pub text: String,
    pub embedding: Vec<f32>,
}

impl VectorSnapshot {
    pub fn empty(embedder: String, dimensions: usize) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            embedder,
            dimensions,
            chunks: Vec::new(),
        }
    }

    pub fn load(path: &Path) -> Result<Option<Self>, KnowledgeError> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    /// Write to a sibling temp file, then rename over `path`.
    pub fn save(&self, path: &Path) -> Result<(), KnowledgeError> {
        write_atomic(path, &serde_json::to_vec(self)?)
    }
}

/// Replace `path` with `bytes` via a temp file in the same directory.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), KnowledgeError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let temp_path = temp_path(path);
    {
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&temp_path, path)?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

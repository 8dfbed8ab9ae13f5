//! Text extraction from documents on disk.

use crate::error::KnowledgeError;
use async_trait::async_trait;
use log::debug;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};

/// Extracted text, one entry per page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedDocument {
    pub pages: Vec<String>,
}

impl LoadedDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Pages joined with blank lines.
    pub fn text(&self) -> String {
        self.pages.join("\n\n")
    }

    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|page| page.trim().is_empty())
    }
}

/// Turns a file into page text.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    fn name(&self) -> &str;

    async fn load(&self, path: &Path) -> Result<LoadedDocument, KnowledgeError>;
}

/// PDF extraction through the native pdfium library.
#[derive(Debug, Clone, Default)]
pub struct PdfiumLoader {
    /// Directory holding the pdfium shared library; the system search path is used when unset.
    library_dir: Option<PathBuf>,
}

impl PdfiumLoader {
    pub fn new(library_dir: Option<PathBuf>) -> Self {
        Self { library_dir }
    }
}

#[async_trait]
impl DocumentLoader for PdfiumLoader {
    fn name(&self) -> &str {
        "pdfium"
    }

    async fn load(&self, path: &Path) -> Result<LoadedDocument, KnowledgeError> {
        if !path.exists() {
            return Err(KnowledgeError::FileNotFound(path.to_path_buf()));
        }
        let path = path.to_path_buf();
        let library_dir = self.library_dir.clone();
        tokio::task::spawn_blocking(move || extract_pdf(&path, library_dir.as_deref()))
            .await
            .map_err(|err| KnowledgeError::Task(err.to_string()))?
    }
}

fn extract_pdf(path: &Path, library_dir: Option<&Path>) -> Result<LoadedDocument, KnowledgeError> {
    let bindings = match library_dir {
        Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)),
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|err| KnowledgeError::Extraction(format!("pdfium unavailable: {err}")))?;
    let pdfium = Pdfium::new(bindings);
    let document = pdfium
        .load_pdf_from_file(path, None)
        .map_err(|err| KnowledgeError::Extraction(err.to_string()))?;

    let mut pages = Vec::new();
    for page in document.pages().iter() {
        let text = page
            .text()
            .map_err(|err| KnowledgeError::Extraction(err.to_string()))?;
        pages.push(text.all());
    }
    debug!(
        "extracted pdf text (path={}, pages={})",
        path.display(),
        pages.len()
    );
    Ok(LoadedDocument { pages })
}

/// Reads the file as UTF-8 text; form feeds separate pages.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextLoader;

#[async_trait]
impl DocumentLoader for PlainTextLoader {
    fn name(&self) -> &str {
        "plain-text"
    }

    async fn load(&self, path: &Path) -> Result<LoadedDocument, KnowledgeError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(KnowledgeError::FileNotFound(path.to_path_buf()));
            }
            Err(err) => return Err(err.into()),
        };
        let text = String::from_utf8_lossy(&bytes);
        Ok(LoadedDocument {
            pages: text.split('\x0c').map(str::to_string).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{DocumentLoader, PlainTextLoader};
    use crate::KnowledgeError;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[tokio::test]
    async fn plain_text_splits_pages_on_form_feed() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("report.pdf");
        std::fs::write(&path, "page one\x0cpage two").expect("write");
        let doc = PlainTextLoader.load(&path).await.expect("load");
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.text(), "page one\n\npage two");
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let temp = tempdir().expect("tempdir");
        let err = PlainTextLoader
            .load(&temp.path().join("absent.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, KnowledgeError::FileNotFound(_)));
    }
}

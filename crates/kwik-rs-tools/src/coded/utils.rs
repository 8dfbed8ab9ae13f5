//! Helpers shared by coded tools.

use kwik_rs_knowledge::KnowledgeError;
use kwik_rs_memory::MemoryError;
use kwik_rs_protocol::ToolError;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Parse JSON args into a typed struct.
pub(super) fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|err| ToolError::InvalidArguments(err.to_string()))
}

/// Trimmed required string argument.
pub(super) fn required<'a>(value: &'a str, name: &str) -> Result<&'a str, ToolError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ToolError::InvalidArguments(format!(
            "Missing required input '{name}'."
        )));
    }
    Ok(value)
}

/// Existing file with a `.pdf` extension.
pub(super) fn pdf_path(input: &str) -> Result<PathBuf, ToolError> {
    let input = required(input, "file_path")?;
    let path = PathBuf::from(input);
    if !path.is_file() {
        return Err(ToolError::NotFound(format!("File not found: {input}")));
    }
    let is_pdf = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if !is_pdf {
        return Err(ToolError::InvalidArguments(format!(
            "File must be a PDF: {input}"
        )));
    }
    Ok(path)
}

pub(super) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

pub(super) fn memory_error(err: MemoryError) -> ToolError {
    match err {
        MemoryError::InvalidInput(message) => ToolError::InvalidArguments(message),
        other => ToolError::ExecutionFailed(other.to_string()),
    }
}

pub(super) fn knowledge_error(err: KnowledgeError) -> ToolError {
    match err {
        KnowledgeError::FileNotFound(path) => {
            ToolError::NotFound(format!("File not found: {}", path.display()))
        }
        KnowledgeError::EmptyKnowledgeBase => ToolError::NotFound(super::NO_KNOWLEDGE_BASE.to_string()),
        KnowledgeError::InvalidInput(message) => ToolError::InvalidArguments(message),
        other => ToolError::ExecutionFailed(other.to_string()),
    }
}

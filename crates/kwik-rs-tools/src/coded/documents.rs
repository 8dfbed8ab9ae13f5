//! Document tools: ingest, extraction brief, similarity query, listing.

use super::NO_RELEVANT_INFORMATION;
use super::utils::{file_name, knowledge_error, parse_args, pdf_path, required};
use crate::{Tool, ToolContext};
use async_trait::async_trait;
use chrono::Utc;
use kwik_rs_knowledge::{DocumentRecord, LoadedDocument, top_keywords};
use kwik_rs_protocol::{SourceTag, ToolError};
use log::{info, warn};
use serde::Deserialize;
use serde_json::{Value, json};
use std::path::Path;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct FileArgs {
    #[serde(default)]
    file_path: String,
}

fn file_path_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "file_path": { "type": "string", "description": description }
        },
        "required": ["file_path"]
    })
}

async fn load_pdf(ctx: &ToolContext, path: &Path) -> Result<LoadedDocument, ToolError> {
    let document = ctx
        .services
        .loader
        .load(path)
        .await
        .map_err(knowledge_error)?;
    if document.is_blank() {
        return Err(ToolError::ExecutionFailed(format!(
            "Failed to load document or document is empty: {}",
            path.display()
        )));
    }
    Ok(document)
}

/// Index a PDF into the vector store and record it in the document registry.
#[derive(Debug, Default)]
pub struct AddPdfToKnowledgeTool;

#[async_trait]
impl Tool for AddPdfToKnowledgeTool {
    fn name(&self) -> &str {
        "add_pdf_to_knowledge"
    }

    fn description(&self) -> &str {
        "Add an uploaded PDF document to the persistent knowledge base so it can be searched later"
    }

    fn args_schema(&self) -> Value {
        file_path_schema("Path to the uploaded PDF file")
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, ToolError> {
        let input: FileArgs = parse_args(args)?;
        let path = pdf_path(&input.file_path)?;
        let filename = file_name(&path);
        let file_size_bytes = std::fs::metadata(&path)
            .map_err(|err| ToolError::ExecutionFailed(err.to_string()))?
            .len();
        let document = load_pdf(ctx, &path).await?;

        let services = &ctx.services;
        let id = Uuid::new_v4();
        let receipt = services
            .knowledge
            .index(id, &filename, &document)
            .await
            .map_err(knowledge_error)?;
        let record = DocumentRecord {
            id,
            filename: filename.clone(),
            file_path: path.display().to_string(),
            upload_date: Utc::now(),
            page_count: document.page_count(),
            file_size_bytes,
            chunk_count: receipt.chunk_count,
            status: "processed".to_string(),
            topics: top_keywords(&document.text(), services.settings.keyword_count),
        };
        if let Err(err) = services.documents.add(record.clone()) {
            // Every indexed chunk must have a registry entry.
            match services.knowledge.remove(id).await {
                Ok(removed) => warn!(
                    "registry write failed, rolled back indexed chunks (document_id={}, removed={}): {}",
                    id, removed, err
                ),
                Err(rollback) => warn!(
                    "registry write failed and chunks remain orphaned (document_id={}): {}; rollback: {}",
                    id, err, rollback
                ),
            }
            return Err(knowledge_error(err));
        }
        info!(
            "added pdf to knowledge base (document_id={}, filename={}, pages={}, chunks={})",
            id, filename, record.page_count, receipt.chunk_count
        );

        Ok(json!({
            "message": format!(
                "Successfully added {filename} to knowledge base - {} pages processed.",
                record.page_count
            ),
            "document": record,
        }))
    }
}

#[derive(Debug, Deserialize)]
struct ExtractArgs {
    #[serde(default)]
    file_path: String,
    #[serde(default)]
    focus_areas: Vec<String>,
}

/// Produce an extraction brief that asks the agent to commit topics and facts.
#[derive(Debug, Default)]
pub struct ExtractPdfKnowledgeTool;

#[async_trait]
impl Tool for ExtractPdfKnowledgeTool {
    fn name(&self) -> &str {
        "extract_pdf_knowledge"
    }

    fn description(&self) -> &str {
        "Read a PDF and return a content overview from which key topics and facts should be committed to memory"
    }

    fn args_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": { "type": "string", "description": "Path to the PDF file" },
                "focus_areas": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Optional topics to pay special attention to"
                }
            },
            "required": ["file_path"]
        })
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, ToolError> {
        let input: ExtractArgs = parse_args(args)?;
        let path = pdf_path(&input.file_path)?;
        let document = load_pdf(ctx, &path).await?;
        let focus_areas: Vec<&str> = input
            .focus_areas
            .iter()
            .map(|area| area.trim())
            .filter(|area| !area.is_empty())
            .collect();
        let brief = extraction_brief(
            &file_name(&path),
            &document,
            ctx.services.settings.sample_chars,
            &focus_areas,
        );
        info!(
            "built extraction brief (file={}, pages={}, brief_len={})",
            path.display(),
            document.page_count(),
            brief.len()
        );
        Ok(Value::String(brief))
    }
}

fn extraction_brief(
    filename: &str,
    document: &LoadedDocument,
    sample_chars: usize,
    focus_areas: &[&str],
) -> String {
    let text = document.text();
    let sample: String = text.chars().take(sample_chars).collect();
    let mut parts = vec![
        format!("Document: {filename}"),
        format!("Pages: {}", document.page_count()),
        String::new(),
        "CONTENT OVERVIEW:".to_string(),
        String::new(),
    ];
    if !focus_areas.is_empty() {
        parts.push(format!("Focus areas requested: {}", focus_areas.join(", ")));
        parts.push(String::new());
    }
    parts.push("The following is a sample of the document content:".to_string());
    parts.push(String::new());
    parts.push(sample);
    parts.push(String::new());
    parts.push("---".to_string());
    parts.push(String::new());
    parts.push(
        "Please analyze the above content and identify key topics and facts. \
         For each significant topic you identify, use the commit_to_memory tool \
         to store relevant facts under that topic."
            .to_string(),
    );
    if !focus_areas.is_empty() {
        parts.push(format!(
            "Pay special attention to information related to: {}.",
            focus_areas.join(", ")
        ));
    }
    parts.join("\n")
}

#[derive(Debug, Deserialize)]
struct QueryArgs {
    #[serde(default)]
    query: String,
    #[serde(default)]
    top_k: Option<usize>,
}

/// Similarity search over indexed document chunks.
#[derive(Debug, Default)]
pub struct QueryPdfKnowledgeTool;

#[async_trait]
impl Tool for QueryPdfKnowledgeTool {
    fn name(&self) -> &str {
        "query_pdf_knowledge"
    }

    fn description(&self) -> &str {
        "Search the uploaded PDF documents for passages relevant to a question"
    }

    fn args_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "What to look for" },
                "top_k": { "type": "integer", "minimum": 1, "description": "Maximum passages to return" }
            },
            "required": ["query"]
        })
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, ToolError> {
        let input: QueryArgs = parse_args(args)?;
        let query = required(&input.query, "query")?;
        let top_k = input
            .top_k
            .unwrap_or(ctx.services.settings.top_k)
            .max(1);
        let passages = ctx
            .services
            .knowledge
            .query(query, top_k)
            .await
            .map_err(knowledge_error)?;
        info!(
            "queried knowledge base (query_len={}, passages={})",
            query.len(),
            passages.len()
        );
        if passages.is_empty() {
            return Ok(json!({
                "query": query,
                "passages": [],
                "message": NO_RELEVANT_INFORMATION,
            }));
        }
        let passages: Vec<Value> = passages
            .into_iter()
            .map(|passage| {
                json!({
                    "source": passage.source,
                    "page": passage.page,
                    "score": passage.score,
                    "text": passage.text,
                })
            })
            .collect();
        Ok(json!({ "query": query, "passages": passages }))
    }

    fn attribution(&self, output: &Value) -> Option<SourceTag> {
        let found = output["passages"]
            .as_array()
            .is_some_and(|passages| !passages.is_empty());
        found.then_some(SourceTag::Document)
    }
}

/// List ingested documents from the registry.
#[derive(Debug, Default)]
pub struct ListDocumentsTool;

#[async_trait]
impl Tool for ListDocumentsTool {
    fn name(&self) -> &str {
        "list_documents"
    }

    fn description(&self) -> &str {
        "List the documents that have been added to the knowledge base"
    }

    fn args_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn call(&self, ctx: &ToolContext, _args: Value) -> Result<Value, ToolError> {
        let documents = ctx.services.documents.list().map_err(knowledge_error)?;
        let documents: Vec<Value> = documents
            .into_iter()
            .map(|doc| {
                json!({
                    "filename": doc.filename,
                    "page_count": doc.page_count,
                    "upload_date": doc.upload_date,
                    "topics": doc.topics,
                })
            })
            .collect();
        Ok(json!({ "documents": documents }))
    }
}

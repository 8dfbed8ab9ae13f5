//! HTTP handlers for the knowledge assistant.

use crate::ServerState;
use crate::error::{ApiError, ApiResult, api_error, internal};
use crate::upload::{is_pdf, stored_filename};
use axum::Json;
use axum::body::Bytes;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::Html;
use kwik_rs_core::KnowledgeStats;
use kwik_rs_knowledge::DocumentRecord;
use kwik_rs_protocol::{SourceTag, ToolCallRecord};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const INDEX_HTML: &str = include_str!("index.html");

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub network: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    /// The assistant's reply to the ingest instruction.
    pub message: String,
    /// Stored filename, including the timestamp prefix.
    pub filename: String,
    /// Absolute path of the stored file.
    pub filepath: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub response: String,
    pub sources: Vec<SourceTag>,
    pub tool_calls: Vec<ToolCallRecord>,
}

#[derive(Debug, Serialize)]
pub struct TopicsResponse {
    pub topics: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct TopicFactsResponse {
    pub topic: String,
    pub facts: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DocumentsResponse {
    pub documents: Vec<DocumentRecord>,
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn health(State(state): State<Arc<ServerState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        network: state.assistant.orchestrator().network().name().to_string(),
    })
}

pub async fn upload(
    State(state): State<Arc<ServerState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<UploadResponse> {
    let Ok(mut multipart) = multipart else {
        return Err(api_error(StatusCode::BAD_REQUEST, "No file part in request"));
    };
    let Some((filename, bytes)) = read_file_field(&mut multipart, state.max_upload_bytes).await?
    else {
        return Err(api_error(StatusCode::BAD_REQUEST, "No file part in request"));
    };
    if filename.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "No file selected"));
    }
    if !is_pdf(&filename) {
        return Err(api_error(StatusCode::BAD_REQUEST, "Only PDF files are allowed"));
    }

    let stored = stored_filename(&filename);
    let uploads = &state.assistant.paths().uploads;
    tokio::fs::create_dir_all(uploads)
        .await
        .map_err(|err| internal("Failed to process file", err))?;
    let path = std::path::absolute(uploads.join(&stored))
        .map_err(|err| internal("Failed to process file", err))?;
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|err| internal("Failed to process file", err))?;
    info!(
        "upload stored (filename={}, bytes={}, path={})",
        stored,
        bytes.len(),
        path.display()
    );

    let result = state
        .assistant
        .process_pdf_upload(&path)
        .await
        .map_err(|err| {
            warn!("upload processing failed (filename={}, err={})", stored, err);
            internal("Failed to process file", err)
        })?;
    Ok(Json(UploadResponse {
        success: true,
        message: result.response,
        filename: stored,
        filepath: path.display().to_string(),
    }))
}

/// First `file` field of the form, as (client filename, contents).
async fn read_file_field(
    multipart: &mut Multipart,
    limit: usize,
) -> Result<Option<(String, Bytes)>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| multipart_error(err, limit))?
    {
        if field.name() != Some("file") {
            debug!("skipping form field (name={:?})", field.name());
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|err| multipart_error(err, limit))?;
        return Ok(Some((filename, bytes)));
    }
    Ok(None)
}

fn multipart_error(err: MultipartError, limit: usize) -> ApiError {
    let status = err.status();
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        return api_error(status, format!("File exceeds the upload limit of {limit} bytes"));
    }
    api_error(status, err.body_text())
}

pub async fn chat(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<ChatReply> {
    let query = request.query.trim();
    if query.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Empty query received."));
    }
    let result = state
        .assistant
        .process_user_query(query)
        .await
        .map_err(|err| internal("Error processing query", err))?;
    Ok(Json(ChatReply {
        response: result.response,
        sources: result.sources,
        tool_calls: result.tool_calls,
    }))
}

pub async fn topics(State(state): State<Arc<ServerState>>) -> ApiResult<TopicsResponse> {
    let topics = state
        .assistant
        .list_topics()
        .await
        .map_err(|err| internal("Failed to load topics", err))?;
    Ok(Json(TopicsResponse { topics }))
}

pub async fn topic_facts(
    State(state): State<Arc<ServerState>>,
    Path(topic): Path<String>,
) -> ApiResult<TopicFactsResponse> {
    let facts = state
        .assistant
        .topic_facts(&topic)
        .await
        .map_err(|err| internal("Failed to load topic facts", err))?;
    Ok(Json(TopicFactsResponse { topic, facts }))
}

pub async fn documents(State(state): State<Arc<ServerState>>) -> ApiResult<DocumentsResponse> {
    let documents = state
        .assistant
        .documents()
        .map_err(|err| internal("Failed to load documents", err))?;
    Ok(Json(DocumentsResponse { documents }))
}

pub async fn stats(State(state): State<Arc<ServerState>>) -> ApiResult<KnowledgeStats> {
    let stats = state
        .assistant
        .stats()
        .await
        .map_err(|err| internal("Failed to load stats", err))?;
    Ok(Json(stats))
}

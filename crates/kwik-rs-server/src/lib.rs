//! HTTP front end for the PDF knowledge assistant.
//!
//! Serves a small web page plus JSON endpoints for uploads, chat turns and
//! knowledge-base inspection. Every response is marked `Cache-Control: no-store`.

mod error;
pub mod routes;
pub mod upload;

pub use error::{ApiError, ApiResult, api_error};

use anyhow::Context;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, header};
use axum::routing::{get, post};
use kwik_rs_core::KnowledgeAssistant;
use log::{info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::set_header::SetResponseHeaderLayer;

/// Shared handler state.
pub struct ServerState {
    pub assistant: Arc<KnowledgeAssistant>,
    /// Request body cap; larger uploads are rejected with 413.
    pub max_upload_bytes: usize,
}

/// Router over `assistant`.
pub fn build_router(assistant: Arc<KnowledgeAssistant>, max_upload_bytes: usize) -> Router {
    let state = Arc::new(ServerState {
        assistant,
        max_upload_bytes,
    });
    Router::new()
        .route("/", get(routes::index))
        .route("/health", get(routes::health))
        .route("/upload", post(routes::upload))
        .route("/chat", post(routes::chat))
        .route("/topics", get(routes::topics))
        .route("/topics/{topic}", get(routes::topic_facts))
        .route("/documents", get(routes::documents))
        .route("/stats", get(routes::stats))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .with_state(state)
}

/// Bind `host:port` and serve until Ctrl-C.
pub async fn serve(assistant: Arc<KnowledgeAssistant>, host: &str, port: u16) -> anyhow::Result<()> {
    let addr = format!("{host}:{port}")
        .parse::<SocketAddr>()
        .with_context(|| format!("invalid server bind address '{host}:{port}'"))?;
    let max_upload_bytes = assistant.config().server.max_upload_bytes;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind server listener")?;
    info!(
        "server listening (addr={}, max_upload_bytes={})",
        addr, max_upload_bytes
    );
    axum::serve(listener, build_router(assistant, max_upload_bytes))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server runtime failed")
}

/// Resolves on Ctrl-C.
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received Ctrl-C, shutting down"),
        Err(err) => {
            warn!("failed to install Ctrl-C handler (err={err})");
            std::future::pending::<()>().await;
        }
    }
}

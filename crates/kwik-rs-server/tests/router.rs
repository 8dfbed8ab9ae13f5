//! Router tests driven through `tower::ServiceExt::oneshot`.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use kwik_rs_config::KwikConfig;
use kwik_rs_core::{KnowledgeAssistant, call_tool};
use kwik_rs_knowledge::PlainTextLoader;
use kwik_rs_protocol::ChatResponse;
use kwik_rs_server::build_router;
use kwik_rs_test_utils::{ScriptedModel, tool_call};
use pretty_assertions::assert_eq;
use regex::Regex;
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "kwik-test-boundary";
const MAX_UPLOAD: usize = 4 * 1024;

struct Harness {
    _dir: TempDir,
    assistant: Arc<KnowledgeAssistant>,
    model: ScriptedModel,
}

impl Harness {
    fn new(script: Vec<ChatResponse>) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let model = ScriptedModel::new(script);
        let config = KwikConfig::builder().data_dir(dir.path()).build();
        let assistant = KnowledgeAssistant::builder(config)
            .cwd(dir.path())
            .model(Arc::new(model.clone()))
            .loader(Arc::new(PlainTextLoader))
            .build()
            .expect("assistant");
        Self {
            _dir: dir,
            assistant: Arc::new(assistant),
            model,
        }
    }

    fn router(&self) -> Router {
        build_router(self.assistant.clone(), MAX_UPLOAD)
    }
}

fn multipart_body(field: &str, filename: &str, contents: &str) -> String {
    format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
         Content-Type: application/pdf\r\n\r\n\
         {contents}\r\n\
         --{BOUNDARY}--\r\n"
    )
}

fn upload_request(body: String) -> Request<Body> {
    Request::post("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request")
}

fn chat_request(query: &str) -> Request<Body> {
    Request::post("/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "query": query }).to_string()))
        .expect("request")
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).expect("request")
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn upload_rejects_non_pdf_files() {
    let harness = Harness::new(Vec::new());
    let (status, body) = send(
        harness.router(),
        upload_request(multipart_body("file", "notes.txt", "plain text")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Only PDF files are allowed" }));
    assert!(harness.model.requests().is_empty());
}

#[tokio::test]
async fn upload_requires_a_file_field_and_a_filename() {
    let harness = Harness::new(Vec::new());
    let (status, body) = send(
        harness.router(),
        upload_request(multipart_body("attachment", "plan.pdf", "x")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "No file part in request" }));

    let (status, body) = send(
        harness.router(),
        upload_request(multipart_body("file", "", "x")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "No file selected" }));

    let request = Request::post("/upload")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .expect("request");
    let (status, body) = send(harness.router(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "No file part in request" }));
}

#[tokio::test]
async fn upload_over_the_limit_is_rejected() {
    let harness = Harness::new(Vec::new());
    let contents = "a".repeat(MAX_UPLOAD * 2);
    let response = harness
        .router()
        .oneshot(upload_request(multipart_body("file", "big.pdf", &contents)))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(harness.model.requests().is_empty());
}

#[tokio::test]
async fn upload_stores_the_file_and_instructs_the_agent() {
    let harness = Harness::new(vec![ChatResponse::text("The plan has been added.")]);
    let (status, body) = send(
        harness.router(),
        upload_request(multipart_body("file", "Project Plan.pdf", "Phase 1 costs $200K.")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["message"], json!("The plan has been added."));

    let filename = body["filename"].as_str().expect("filename");
    let pattern = Regex::new(r"^\d{8}_\d{6}_[0-9a-f]{8}_Project_Plan\.pdf$").expect("regex");
    assert!(pattern.is_match(filename), "unexpected stored name {filename}");

    let filepath = std::path::PathBuf::from(body["filepath"].as_str().expect("filepath"));
    assert!(filepath.is_absolute());
    assert!(filepath.starts_with(&harness.assistant.paths().uploads));
    assert_eq!(
        std::fs::read_to_string(&filepath).expect("stored file"),
        "Phase 1 costs $200K."
    );

    let requests = harness.model.requests();
    let instruction = requests[0]
        .messages
        .last()
        .map(|message| message.content.clone())
        .unwrap_or_default();
    assert!(instruction.contains(&filepath.display().to_string()));
}

#[tokio::test]
async fn chat_round_trip_reports_memory_sources() {
    let harness = Harness::new(vec![
        ChatResponse::tool_calls(vec![tool_call("recall_memory", json!({ "topic": "Budget" }))]),
        ChatResponse::text("The total budget is $500K."),
    ]);
    call_tool(
        harness.assistant.services(),
        "commit_to_memory",
        json!({ "topic": "Budget", "fact": "Total budget: $500K" }),
    )
    .await
    .expect("commit");

    let (status, body) = send(harness.router(), chat_request("What is the budget?")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], json!("The total budget is $500K."));
    assert_eq!(body["sources"], json!(["from memory"]));
    assert_eq!(body["tool_calls"][0]["tool_name"], json!("recall_memory"));
    assert_eq!(body["tool_calls"][0]["success"], json!(true));
}

#[tokio::test]
async fn chat_rejects_empty_queries() {
    let harness = Harness::new(Vec::new());
    let (status, body) = send(harness.router(), chat_request("   ")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Empty query received." }));
    assert!(harness.model.requests().is_empty());
}

#[tokio::test]
async fn knowledge_endpoints_list_topics_facts_and_stats() {
    let harness = Harness::new(Vec::new());
    let services = harness.assistant.services();
    for (topic, fact) in [
        ("budget", "Total budget: $500K"),
        ("budget", "Phase 1: $200K"),
        ("timeline", "Launch in Q3"),
    ] {
        call_tool(services, "commit_to_memory", json!({ "topic": topic, "fact": fact }))
            .await
            .expect("commit");
    }

    let (status, body) = send(harness.router(), get("/topics")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "topics": ["budget", "timeline"] }));

    let (_, body) = send(harness.router(), get("/topics/budget")).await;
    assert_eq!(
        body,
        json!({ "topic": "budget", "facts": ["Total budget: $500K", "Phase 1: $200K"] })
    );

    let (_, body) = send(harness.router(), get("/topics/unknown")).await;
    assert_eq!(body, json!({ "topic": "unknown", "facts": [] }));

    let (_, body) = send(harness.router(), get("/documents")).await;
    assert_eq!(body, json!({ "documents": [] }));

    let (_, body) = send(harness.router(), get("/stats")).await;
    assert_eq!(
        body,
        json!({ "document_count": 0, "topic_count": 2, "fact_count": 3 })
    );
}

#[tokio::test]
async fn every_response_disables_caching() {
    let harness = Harness::new(Vec::new());
    for request in [get("/"), get("/health"), get("/missing"), chat_request("")] {
        let response = harness.router().oneshot(request).await.expect("response");
        assert_eq!(
            response
                .headers()
                .get(header::CACHE_CONTROL)
                .and_then(|value| value.to_str().ok()),
            Some("no-store")
        );
    }
}

#[tokio::test]
async fn health_reports_the_network() {
    let harness = Harness::new(Vec::new());
    let (status, body) = send(harness.router(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok", "network": "pdf_knowledge_agent" }));
}

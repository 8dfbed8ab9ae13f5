//! Knowledge assistant facade tests.

use kwik_rs_config::{KwikConfig, SynthesizerKind};
use kwik_rs_core::{
    KnowledgeAssistant, KnowledgeStats, KwikCoreError, ServicesBuilder, call_tool,
    upload_instruction,
};
use kwik_rs_knowledge::PlainTextLoader;
use kwik_rs_memory::TopicMemory;
use kwik_rs_protocol::{ChatResponse, LlmError, SourceTag};
use kwik_rs_test_utils::{ScriptedModel, tool_call};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use tempfile::tempdir;

fn assistant(root: &std::path::Path, model: &ScriptedModel) -> KnowledgeAssistant {
    let config = KwikConfig::builder().data_dir(root).build();
    KnowledgeAssistant::builder(config)
        .cwd(root)
        .model(Arc::new(model.clone()))
        .loader(Arc::new(PlainTextLoader))
        .build()
        .expect("assistant")
}

#[test]
fn missing_credentials_abort_startup() {
    let temp = tempdir().expect("tempdir");
    let mut config = KwikConfig::builder().data_dir(temp.path()).build();
    config.llm.api_key_env = "KWIK_TEST_KEY_THAT_IS_NEVER_SET".to_string();
    let err = KnowledgeAssistant::builder(config)
        .cwd(temp.path())
        .build()
        .err()
        .expect("startup should fail");
    assert!(matches!(
        err,
        KwikCoreError::Llm(LlmError::MissingCredentials(name)) if name == "KWIK_TEST_KEY_THAT_IS_NEVER_SET"
    ));
}

#[tokio::test]
async fn default_config_commits_facts_verbatim() {
    let temp = tempdir().expect("tempdir");
    let config = KwikConfig::builder().data_dir(temp.path()).build();
    let (services, _) = ServicesBuilder::new(&config, temp.path())
        .build()
        .expect("services");
    let facts = [
        "Contract reference ABCDEFGHIJKLMNOPQRSTUVWXYZ signed",
        "Loan file 9fQ2xL7pZr4Tb8Kd1mVw3YhJ6nCe0aGu approved on 2024-03-09",
    ];
    for fact in facts {
        call_tool(
            &services,
            "commit_to_memory",
            json!({ "topic": "contracts", "fact": fact }),
        )
        .await
        .expect("commit");
    }
    assert_eq!(
        services.memory.recall("contracts").await.expect("recall"),
        facts.map(String::from).to_vec()
    );
}

#[tokio::test]
async fn upload_instruction_reaches_front_man() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("report.pdf");
    std::fs::write(&path, "Quarterly revenue grew 12 percent.").expect("write");
    let model = ScriptedModel::new(vec![
        ChatResponse::tool_calls(vec![tool_call(
            "document_processor",
            json!({ "inquiry": format!("Add {}", path.display()) }),
        )]),
        ChatResponse::tool_calls(vec![
            tool_call("add_pdf_to_knowledge", json!({ "file_path": path })),
            tool_call(
                "commit_to_memory",
                json!({ "topic": "Revenue", "fact": "Quarterly revenue grew 12 percent" }),
            ),
        ]),
        ChatResponse::text("Stored the report."),
        ChatResponse::text("Your report has been added."),
    ]);
    let assistant = assistant(temp.path(), &model);

    let result = assistant.process_pdf_upload(&path).await.expect("upload");
    assert_eq!(result.response, "Your report has been added.");
    let requests = model.requests();
    assert_eq!(
        requests[0].messages.last().map(|message| message.content.clone()),
        Some(upload_instruction(&path))
    );

    assert_eq!(
        assistant.stats().await.expect("stats"),
        KnowledgeStats {
            document_count: 1,
            topic_count: 1,
            fact_count: 1,
        }
    );
    assert_eq!(assistant.list_topics().await.expect("topics"), vec!["Revenue"]);
    let documents = assistant.documents().expect("documents");
    assert_eq!(documents[0].filename, "report.pdf");
    assert!(temp.path().join("TopicMemory.jsonl").is_file());
    assert!(temp.path().join("DocumentRegistry.json").is_file());
    assert!(temp.path().join("pdf_knowledge_vectorstore.json").is_file());
}

#[tokio::test]
async fn query_after_direct_ingest_is_document_sourced() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("alpha.pdf");
    std::fs::write(&path, "Project Alpha budget is $500K.\x0cTeam size is eight.").expect("write");
    let model = ScriptedModel::new(vec![
        ChatResponse::tool_calls(vec![tool_call(
            "query_pdf_knowledge",
            json!({ "query": "Project Alpha budget" }),
        )]),
        ChatResponse::text("The budget is $500K (from document)."),
    ]);
    let assistant = assistant(temp.path(), &model);

    call_tool(
        assistant.services(),
        "add_pdf_to_knowledge",
        json!({ "file_path": path }),
    )
    .await
    .expect("ingest");
    let result = assistant
        .process_user_query("What is the Project Alpha budget?")
        .await
        .expect("query");
    assert_eq!(result.sources, vec![SourceTag::Document]);
}

#[tokio::test]
async fn missing_upload_is_not_found() {
    let temp = tempdir().expect("tempdir");
    let model = ScriptedModel::new(Vec::new());
    let assistant = assistant(temp.path(), &model);
    let err = assistant
        .process_pdf_upload(&temp.path().join("ghost.pdf"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("File not found"));
    assert!(model.requests().is_empty());
}

#[tokio::test]
async fn llm_synthesizer_is_selected_by_config() {
    let temp = tempdir().expect("tempdir");
    let mut config = KwikConfig::builder().data_dir(temp.path()).build();
    config.memory.reorganize.synthesizer = SynthesizerKind::Llm;
    let model = ScriptedModel::new(vec![ChatResponse::text(
        r#"[{"topic": "Revenue", "fact": "Revenue is trending up"}]"#,
    )]);
    let assistant = KnowledgeAssistant::builder(config)
        .cwd(temp.path())
        .model(Arc::new(model.clone()))
        .loader(Arc::new(PlainTextLoader))
        .build()
        .expect("assistant");
    let services = assistant.services();
    services
        .memory
        .commit("Revenue", "Q1 grew 12 percent")
        .await
        .expect("commit");

    let output = call_tool(services, "reorganize_memory", json!({}))
        .await
        .expect("reorganize");
    assert_eq!(output["count"], json!(1));
    assert_eq!(services.synthesizer.name(), "llm");
    assert_eq!(
        assistant.topic_facts("Revenue").await.expect("facts"),
        vec!["Q1 grew 12 percent", "Revenue is trending up"]
    );
}

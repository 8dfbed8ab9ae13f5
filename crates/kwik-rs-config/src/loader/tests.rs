//! Tests for layered configuration loading.

use super::*;
use crate::{EmbedderKind, SynthesizerKind};
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_json5(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("dir");
    }
    fs::write(path, contents).expect("write");
}

#[test]
fn empty_config_uses_defaults() {
    let config = KwikConfig::load_from_str("{}").expect("config");
    assert_eq!(config.server.port, 5002);
    assert_eq!(config.storage.topic_memory, "TopicMemory.jsonl");
    assert_eq!(config.retrieval.embedder, EmbedderKind::Hashing);
    assert_eq!(config.memory.reorganize.synthesizer, SynthesizerKind::Digest);
    assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");
}

#[test]
fn rejects_unknown_top_level_key() {
    let err = KwikConfig::load_from_str("{ unexpected: true }").unwrap_err();
    assert!(err.to_string().contains("config:unexpected"));
}

#[test]
fn rejects_unknown_embedder() {
    let err = KwikConfig::load_from_str(r#"{ retrieval: { embedder: "magic" } }"#).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("retrieval.embedder"), "{msg}");
    assert!(msg.contains("hashing, openai"), "{msg}");
}

#[test]
fn rejects_overlap_not_smaller_than_chunk() {
    let json5 = "{ retrieval: { chunk_size: 100, chunk_overlap: 100 } }";
    let err = KwikConfig::load_from_str(json5).unwrap_err();
    assert!(err.to_string().contains("chunk_overlap"));
}

#[test]
fn rejects_out_of_range_port() {
    let err = KwikConfig::load_from_str("{ server: { port: 70000 } }").unwrap_err();
    assert!(err.to_string().contains("server.port"));
}

#[test]
fn layered_config_precedence() {
    let temp = TempDir::new().expect("tmp");
    let root = temp.path();
    let project_root = root.join("project");
    fs::create_dir_all(project_root.join(".git")).expect("git");
    let cwd = project_root.join("subdir");
    fs::create_dir_all(&cwd).expect("cwd");

    let system = root.join("system.json5");
    write_json5(&system, "{ llm: { model: \"system\" }, retrieval: { top_k: 2 } }");
    let user = root.join("user.json5");
    write_json5(&user, "{ llm: { model: \"user\" } }");
    write_json5(
        &project_root.join(DEFAULT_CONFIG_FILE),
        "{ llm: { model: \"project\" }, server: { port: 6000 } }",
    );
    write_json5(&cwd.join(DEFAULT_CONFIG_FILE), "{ llm: { model: \"cwd\" } }");
    write_json5(
        &project_root
            .join(DEFAULT_CONFIG_DIR)
            .join(DEFAULT_CONFIG_FILE),
        "{ llm: { model: \"repo\" } }",
    );

    let options = LayeredConfigOptions {
        system_config_path: Some(system),
        user_config_path: Some(user),
        ..LayeredConfigOptions::new(&cwd)
    };
    let layered = KwikConfig::load_layered_with_options(options).expect("layered");
    assert_eq!(layered.config.llm.model, "repo");
    assert_eq!(layered.config.retrieval.top_k, 2);
    assert_eq!(layered.config.server.port, 6000);
    let sources: Vec<_> = layered.layers.iter().map(|layer| layer.source).collect();
    assert_eq!(
        sources,
        vec![
            ConfigLayerSource::System,
            ConfigLayerSource::User,
            ConfigLayerSource::Project,
            ConfigLayerSource::Cwd,
            ConfigLayerSource::Repo,
        ]
    );
}

#[test]
fn runtime_layer_wins() {
    let temp = TempDir::new().expect("tmp");
    let cwd = temp.path();
    write_json5(&cwd.join(DEFAULT_CONFIG_FILE), "{ server: { host: \"0.0.0.0\" } }");
    let runtime = cwd.join("override.json5");
    write_json5(&runtime, "{ server: { host: \"10.0.0.1\" } }");

    let options = LayeredConfigOptions::isolated(cwd).with_runtime_path(&runtime);
    let layered = KwikConfig::load_layered_with_options(options).expect("layered");
    assert_eq!(layered.config.server.host, "10.0.0.1");
    assert_eq!(
        layered.layers.last().map(|layer| layer.source),
        Some(ConfigLayerSource::Runtime)
    );
}

#[test]
fn layer_errors_name_the_layer() {
    let temp = TempDir::new().expect("tmp");
    let cwd = temp.path();
    write_json5(&cwd.join(DEFAULT_CONFIG_FILE), "{ tools: { bogus: 1 } }");
    let err = KwikConfig::load_layered_with_options(LayeredConfigOptions::isolated(cwd))
        .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("cwd("), "{msg}");
    assert!(msg.contains("tools.bogus"), "{msg}");
}

#[test]
fn env_overrides_apply_after_layers() {
    let mut config = KwikConfig::default();
    let env: HashMap<&str, &str> = HashMap::from([
        ("KWIK_DATA_DIR", "/srv/kwik"),
        ("KWIK_PORT", "8080"),
        ("KWIK_HOST", ""),
        ("KWIK_NETWORK_MANIFEST", "net.json5"),
    ]);
    config
        .apply_env_overrides(|key| env.get(key).map(|value| value.to_string()))
        .expect("env");
    assert_eq!(config.storage.root.as_deref(), Some("/srv/kwik"));
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.agents.manifest.as_deref(), Some("net.json5"));
}

#[test]
fn env_rejects_bad_port() {
    let mut config = KwikConfig::default();
    let err = config
        .apply_env_overrides(|key| (key == "KWIK_PORT").then(|| "http".to_string()))
        .unwrap_err();
    assert!(err.to_string().contains("env:KWIK_PORT"));
}

#[test]
fn storage_paths_resolve_against_root() {
    let config = KwikConfig::builder().data_dir("data").build();
    let paths = config.storage.resolve(Path::new("/work"));
    assert_eq!(paths.root, Path::new("/work/data"));
    assert_eq!(paths.topic_memory, Path::new("/work/data/TopicMemory.jsonl"));
    assert_eq!(paths.uploads, Path::new("/work/data/uploads"));
}

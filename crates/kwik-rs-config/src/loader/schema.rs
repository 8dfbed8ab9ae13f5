//! Key-level schema checks for `kwik.json5` layers.
//!
//! Serde accepts unknown keys silently; these checks reject typos with an
//! error that names the layer and the dotted path.

use crate::ConfigError;
use serde_json::{Map, Value};

/// Validate one config layer (or the merged result).
pub(super) fn validate_layer_schema(value: &Value, layer: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, "")?;
    ensure_allowed_keys(
        map,
        &[
            "$schema",
            "agents",
            "llm",
            "storage",
            "memory",
            "retrieval",
            "server",
            "tools",
        ],
        layer,
        "",
    )?;

    if let Some(value) = map.get("$schema") {
        expect_string(value, layer, "$schema")?;
    }
    if let Some(value) = map.get("agents") {
        validate_agents(value, layer, "agents")?;
    }
    if let Some(value) = map.get("llm") {
        validate_llm(value, layer, "llm")?;
    }
    if let Some(value) = map.get("storage") {
        validate_storage(value, layer, "storage")?;
    }
    if let Some(value) = map.get("memory") {
        validate_memory(value, layer, "memory")?;
    }
    if let Some(value) = map.get("retrieval") {
        validate_retrieval(value, layer, "retrieval")?;
    }
    if let Some(value) = map.get("server") {
        validate_server(value, layer, "server")?;
    }
    if let Some(value) = map.get("tools") {
        validate_tools(value, layer, "tools")?;
    }
    Ok(())
}

fn validate_agents(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(
        map,
        &[
            "manifest",
            "max_tool_rounds",
            "max_delegation_depth",
            "history_window",
        ],
        layer,
        path,
    )?;
    if let Some(value) = map.get("manifest") {
        expect_optional_string(value, layer, &join_path(path, "manifest"))?;
    }
    for key in ["max_tool_rounds", "max_delegation_depth", "history_window"] {
        if let Some(value) = map.get(key) {
            expect_u64(value, layer, &join_path(path, key))?;
        }
    }
    Ok(())
}

fn validate_llm(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(
        map,
        &[
            "provider",
            "model",
            "base_url",
            "api_key_env",
            "temperature",
            "timeout_secs",
        ],
        layer,
        path,
    )?;
    if let Some(value) = map.get("provider") {
        let provider_path = join_path(path, "provider");
        expect_string(value, layer, &provider_path)?;
        if value.as_str() != Some("openai") {
            return Err(invalid_field(
                layer,
                &provider_path,
                "expected one of: openai",
            ));
        }
    }
    for key in ["model", "base_url", "api_key_env"] {
        if let Some(value) = map.get(key) {
            expect_string(value, layer, &join_path(path, key))?;
        }
    }
    if let Some(value) = map.get("temperature") {
        if !value.is_null() {
            expect_f64(value, layer, &join_path(path, "temperature"))?;
        }
    }
    if let Some(value) = map.get("timeout_secs") {
        expect_u64(value, layer, &join_path(path, "timeout_secs"))?;
    }
    Ok(())
}

fn validate_storage(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(
        map,
        &[
            "root",
            "topic_memory",
            "document_registry",
            "vector_store",
            "uploads",
        ],
        layer,
        path,
    )?;
    if let Some(value) = map.get("root") {
        expect_optional_string(value, layer, &join_path(path, "root"))?;
    }
    for key in ["topic_memory", "document_registry", "vector_store", "uploads"] {
        if let Some(value) = map.get(key) {
            expect_string(value, layer, &join_path(path, key))?;
        }
    }
    Ok(())
}

fn validate_memory(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["capture", "reorganize"], layer, path)?;

    if let Some(value) = map.get("capture") {
        let capture_path = join_path(path, "capture");
        let capture = expect_object(value, layer, &capture_path)?;
        ensure_allowed_keys(
            capture,
            &[
                "max_fact_chars",
                "redact_patterns",
                "detect_secrets",
                "secret_entropy_threshold",
                "redaction_replacement",
            ],
            layer,
            &capture_path,
        )?;
        if let Some(value) = capture.get("max_fact_chars") {
            if !value.is_null() {
                expect_u64(value, layer, &join_path(&capture_path, "max_fact_chars"))?;
            }
        }
        if let Some(value) = capture.get("redact_patterns") {
            validate_string_array(value, layer, &join_path(&capture_path, "redact_patterns"))?;
        }
        if let Some(value) = capture.get("detect_secrets") {
            expect_bool(value, layer, &join_path(&capture_path, "detect_secrets"))?;
        }
        if let Some(value) = capture.get("secret_entropy_threshold") {
            expect_f64(
                value,
                layer,
                &join_path(&capture_path, "secret_entropy_threshold"),
            )?;
        }
        if let Some(value) = capture.get("redaction_replacement") {
            expect_string(
                value,
                layer,
                &join_path(&capture_path, "redaction_replacement"),
            )?;
        }
    }

    if let Some(value) = map.get("reorganize") {
        let reorganize_path = join_path(path, "reorganize");
        let reorganize = expect_object(value, layer, &reorganize_path)?;
        ensure_allowed_keys(
            reorganize,
            &["synthesizer", "min_facts", "max_fact_chars"],
            layer,
            &reorganize_path,
        )?;
        if let Some(value) = reorganize.get("synthesizer") {
            expect_enum(
                value,
                layer,
                &join_path(&reorganize_path, "synthesizer"),
                &["digest", "llm"],
            )?;
        }
        for key in ["min_facts", "max_fact_chars"] {
            if let Some(value) = reorganize.get(key) {
                expect_u64(value, layer, &join_path(&reorganize_path, key))?;
            }
        }
    }
    Ok(())
}

fn validate_retrieval(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(
        map,
        &[
            "embedder",
            "dimensions",
            "embedding_model",
            "chunk_size",
            "chunk_overlap",
            "top_k",
            "min_score",
            "sample_chars",
            "keyword_count",
            "pdfium_library",
        ],
        layer,
        path,
    )?;
    if let Some(value) = map.get("embedder") {
        expect_enum(
            value,
            layer,
            &join_path(path, "embedder"),
            &["hashing", "openai"],
        )?;
    }
    for key in [
        "dimensions",
        "chunk_size",
        "chunk_overlap",
        "top_k",
        "sample_chars",
        "keyword_count",
    ] {
        if let Some(value) = map.get(key) {
            expect_u64(value, layer, &join_path(path, key))?;
        }
    }
    if let Some(value) = map.get("embedding_model") {
        expect_string(value, layer, &join_path(path, "embedding_model"))?;
    }
    if let Some(value) = map.get("min_score") {
        if !value.is_null() {
            expect_f64(value, layer, &join_path(path, "min_score"))?;
        }
    }
    if let Some(value) = map.get("pdfium_library") {
        expect_optional_string(value, layer, &join_path(path, "pdfium_library"))?;
    }
    Ok(())
}

fn validate_server(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["host", "port", "max_upload_bytes"], layer, path)?;
    if let Some(value) = map.get("host") {
        expect_string(value, layer, &join_path(path, "host"))?;
    }
    if let Some(value) = map.get("port") {
        let port_path = join_path(path, "port");
        match value.as_u64() {
            Some(port) if port <= u64::from(u16::MAX) => {}
            _ => return Err(invalid_field(layer, &port_path, "expected port number")),
        }
    }
    if let Some(value) = map.get("max_upload_bytes") {
        expect_u64(value, layer, &join_path(path, "max_upload_bytes"))?;
    }
    Ok(())
}

fn validate_tools(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["output_policy"], layer, path)?;
    if let Some(value) = map.get("output_policy") {
        let policy_path = join_path(path, "output_policy");
        let policy = expect_object(value, layer, &policy_path)?;
        ensure_allowed_keys(
            policy,
            &[
                "max_string_bytes",
                "max_array_len",
                "max_object_entries",
                "redact_keys",
                "replacement",
            ],
            layer,
            &policy_path,
        )?;
        for key in ["max_string_bytes", "max_array_len", "max_object_entries"] {
            if let Some(value) = policy.get(key) {
                expect_u64(value, layer, &join_path(&policy_path, key))?;
            }
        }
        if let Some(value) = policy.get("redact_keys") {
            validate_string_array(value, layer, &join_path(&policy_path, "redact_keys"))?;
        }
        if let Some(value) = policy.get("replacement") {
            expect_string(value, layer, &join_path(&policy_path, "replacement"))?;
        }
    }
    Ok(())
}

fn expect_object<'a>(
    value: &'a Value,
    layer: &str,
    path: &str,
) -> Result<&'a Map<String, Value>, ConfigError> {
    value
        .as_object()
        .ok_or_else(|| invalid_field(layer, path, "expected object"))
}

fn expect_string(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    match value {
        Value::String(_) => Ok(()),
        _ => Err(invalid_field(layer, path, "expected string")),
    }
}

fn expect_optional_string(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    match value {
        Value::String(_) | Value::Null => Ok(()),
        _ => Err(invalid_field(layer, path, "expected string or null")),
    }
}

fn expect_bool(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    match value {
        Value::Bool(_) => Ok(()),
        _ => Err(invalid_field(layer, path, "expected bool")),
    }
}

fn expect_u64(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_u64() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected non-negative integer"))
    }
}

fn expect_f64(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_number() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected number"))
    }
}

fn expect_enum(
    value: &Value,
    layer: &str,
    path: &str,
    allowed: &[&str],
) -> Result<(), ConfigError> {
    match value.as_str() {
        Some(text) if allowed.contains(&text) => Ok(()),
        _ => Err(invalid_field(
            layer,
            path,
            &format!("expected one of: {}", allowed.join(", ")),
        )),
    }
}

fn validate_string_array(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let Value::Array(entries) = value else {
        return Err(invalid_field(layer, path, "expected array"));
    };
    for (idx, entry) in entries.iter().enumerate() {
        if !entry.is_string() {
            return Err(invalid_field(
                layer,
                &format!("{path}[{idx}]"),
                "expected string",
            ));
        }
    }
    Ok(())
}

fn ensure_allowed_keys(
    map: &Map<String, Value>,
    allowed: &[&str],
    layer: &str,
    path: &str,
) -> Result<(), ConfigError> {
    match map.keys().find(|key| !allowed.contains(&key.as_str())) {
        Some(key) => Err(invalid_field(layer, &join_path(path, key), "unknown key")),
        None => Ok(()),
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

fn invalid_field(layer: &str, path: &str, message: &str) -> ConfigError {
    let path = if path.is_empty() { "root" } else { path };
    ConfigError::InvalidField {
        path: format!("{layer}:{path}"),
        message: message.to_string(),
    }
}

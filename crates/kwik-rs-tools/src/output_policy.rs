//! Size limits and key redaction applied to tool results.

use kwik_rs_config::ToolOutputPolicyConfig;
use serde_json::Value;

/// Bounds tool output before it is handed back to a model.
#[derive(Debug, Clone)]
pub struct ToolOutputPolicy {
    /// Strings are cut at this many bytes, on a char boundary.
    pub max_string_bytes: usize,
    pub max_array_len: usize,
    pub max_object_entries: usize,
    /// Object keys (case-insensitive) whose values are replaced.
    pub redact_keys: Vec<String>,
    pub replacement: String,
}

impl Default for ToolOutputPolicy {
    fn default() -> Self {
        Self::from(&ToolOutputPolicyConfig::default())
    }
}

impl From<&ToolOutputPolicyConfig> for ToolOutputPolicy {
    fn from(config: &ToolOutputPolicyConfig) -> Self {
        Self {
            max_string_bytes: config.max_string_bytes,
            max_array_len: config.max_array_len,
            max_object_entries: config.max_object_entries,
            redact_keys: config.redact_keys.clone(),
            replacement: config.replacement.clone(),
        }
    }
}

impl ToolOutputPolicy {
    pub fn apply(&self, value: Value) -> Value {
        match value {
            Value::String(text) => Value::String(self.truncate(text)),
            Value::Array(values) => Value::Array(
                values
                    .into_iter()
                    .take(self.max_array_len)
                    .map(|value| self.apply(value))
                    .collect(),
            ),
            Value::Object(entries) => Value::Object(
                entries
                    .into_iter()
                    .take(self.max_object_entries)
                    .map(|(key, value)| {
                        let value = if self.redacts(&key) {
                            Value::String(self.truncate(self.replacement.clone()))
                        } else {
                            self.apply(value)
                        };
                        (key, value)
                    })
                    .collect(),
            ),
            other => other,
        }
    }

    fn redacts(&self, key: &str) -> bool {
        self.redact_keys
            .iter()
            .any(|entry| entry.eq_ignore_ascii_case(key))
    }

    fn truncate(&self, mut text: String) -> String {
        if text.len() <= self.max_string_bytes {
            return text;
        }
        let mut end = self.max_string_bytes;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
        text
    }
}

#[cfg(test)]
mod tests {
    use super::ToolOutputPolicy;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn truncates_nested_strings_and_arrays() {
        let policy = ToolOutputPolicy {
            max_string_bytes: 5,
            max_array_len: 2,
            ..ToolOutputPolicy::default()
        };
        let output = policy.apply(json!({
            "passages": ["first passage", "second", "third"],
            "count": 3,
        }));
        assert_eq!(
            output,
            json!({ "passages": ["first", "secon"], "count": 3 })
        );
    }

    #[test]
    fn redacts_keys_case_insensitively() {
        let policy = ToolOutputPolicy {
            redact_keys: vec!["api_key".to_string()],
            replacement: "[X]".to_string(),
            ..ToolOutputPolicy::default()
        };
        let output = policy.apply(json!({ "API_KEY": "sk-123", "topic": "budget" }));
        assert_eq!(output, json!({ "API_KEY": "[X]", "topic": "budget" }));
    }

    #[test]
    fn cuts_on_char_boundary() {
        let policy = ToolOutputPolicy {
            max_string_bytes: 2,
            ..ToolOutputPolicy::default()
        };
        assert_eq!(policy.apply(json!("héllo")), json!("h"));
    }
}

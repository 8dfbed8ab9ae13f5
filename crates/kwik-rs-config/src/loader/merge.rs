//! Deep merge for layered JSON values.

use serde_json::Value;

/// Merge `overlay` into `base`; objects merge per key, everything else is replaced.
pub(super) fn merge_json_values(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                if let Some(existing) = base_map.get_mut(key) {
                    merge_json_values(existing, value);
                } else {
                    base_map.insert(key.clone(), value.clone());
                }
            }
        }
        (slot, value) => *slot = value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::merge_json_values;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn nested_objects_merge_and_arrays_replace() {
        let mut base = json!({
            "retrieval": { "top_k": 4, "chunk_size": 1000 },
            "memory": { "capture": { "redact_patterns": ["a"] } }
        });
        let overlay = json!({
            "retrieval": { "top_k": 8 },
            "memory": { "capture": { "redact_patterns": ["b", "c"] } }
        });
        merge_json_values(&mut base, &overlay);
        assert_eq!(
            base,
            json!({
                "retrieval": { "top_k": 8, "chunk_size": 1000 },
                "memory": { "capture": { "redact_patterns": ["b", "c"] } }
            })
        );
    }
}

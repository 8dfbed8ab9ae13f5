//! Persisted topic memory record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One fact filed under a topic. Immutable once committed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopicRecord {
    pub id: Uuid,
    /// Topic label; many records share one topic.
    pub topic: String,
    pub fact: String,
    /// Set once at commit.
    pub timestamp: DateTime<Utc>,
    /// Produced by `reorganize` rather than committed directly.
    #[serde(default)]
    pub derived: bool,
}

impl TopicRecord {
    /// Fresh record stamped with the current time.
    pub fn new(topic: impl Into<String>, fact: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            topic: topic.into(),
            fact: fact.into(),
            timestamp: Utc::now(),
            derived: false,
        }
    }

    /// Fresh record marked as derived.
    pub fn derived(topic: impl Into<String>, fact: impl Into<String>) -> Self {
        Self {
            derived: true,
            ..Self::new(topic, fact)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TopicRecord;
    use pretty_assertions::assert_eq;

    #[test]
    fn derived_flag_defaults_to_false_when_absent() {
        let line = r#"{"id":"6f1c6a0e-3f4c-4c55-9a55-0d6a3b1f2e11","topic":"budget","fact":"Phase 1: $200K","timestamp":"2024-05-01T10:00:00Z"}"#;
        let record: TopicRecord = serde_json::from_str(line).expect("record");
        assert_eq!(record.topic, "budget");
        assert!(!record.derived);
    }
}

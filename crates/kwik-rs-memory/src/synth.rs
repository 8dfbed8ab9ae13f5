//! Synthesizers that derive higher-level facts from the record set.

use crate::error::MemoryError;
use crate::model::TopicRecord;
use crate::policy::truncate_chars;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A synthesized fact waiting to be appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedFact {
    pub topic: String,
    pub fact: String,
}

impl DerivedFact {
    pub fn new(topic: impl Into<String>, fact: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            fact: fact.into(),
        }
    }
}

/// Produces derived facts from the full, ordered record set.
#[async_trait]
pub trait FactSynthesizer: Send + Sync {
    fn name(&self) -> &str;

    async fn synthesize(&self, records: &[TopicRecord]) -> Result<Vec<DerivedFact>, MemoryError>;
}

/// One digest fact per topic with enough committed facts.
#[derive(Debug, Clone)]
pub struct TopicDigestSynthesizer {
    /// Committed (non-derived) facts a topic needs before it gets a digest.
    pub min_facts: usize,
    pub max_fact_chars: usize,
}

impl Default for TopicDigestSynthesizer {
    fn default() -> Self {
        Self {
            min_facts: 2,
            max_fact_chars: 1500,
        }
    }
}

#[async_trait]
impl FactSynthesizer for TopicDigestSynthesizer {
    fn name(&self) -> &str {
        "digest"
    }

    async fn synthesize(&self, records: &[TopicRecord]) -> Result<Vec<DerivedFact>, MemoryError> {
        let mut grouped: Vec<(&str, Vec<&str>)> = Vec::new();
        for record in records.iter().filter(|record| !record.derived) {
            match grouped.iter_mut().find(|(topic, _)| *topic == record.topic) {
                Some((_, facts)) => facts.push(record.fact.as_str()),
                None => grouped.push((record.topic.as_str(), vec![record.fact.as_str()])),
            }
        }

        let min_facts = self.min_facts.max(1);
        Ok(grouped
            .into_iter()
            .filter(|(_, facts)| facts.len() >= min_facts)
            .map(|(topic, facts)| {
                let digest = format!(
                    "Digest of {topic} ({} facts): {}",
                    facts.len(),
                    facts.join("; ")
                );
                DerivedFact::new(topic, truncate_chars(&digest, self.max_fact_chars.max(1)))
            })
            .collect())
    }
}

use async_trait::async_trait;
use kwik_rs_memory::{FactSynthesizer, MemoryError, TopicMemory, TopicRecord};
use parking_lot::Mutex;
use std::sync::Arc;

/// In-process topic memory with no capture policy.
#[derive(Clone, Default)]
pub struct StubMemory {
    records: Arc<Mutex<Vec<TopicRecord>>>,
}

impl StubMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with `(topic, fact)` pairs.
    pub fn with_facts(facts: &[(&str, &str)]) -> Self {
        let records = facts
            .iter()
            .map(|(topic, fact)| TopicRecord::new(*topic, *fact))
            .collect();
        Self {
            records: Arc::new(Mutex::new(records)),
        }
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl TopicMemory for StubMemory {
    async fn commit(&self, topic: &str, fact: &str) -> Result<TopicRecord, MemoryError> {
        let (topic, fact) = (topic.trim(), fact.trim());
        if topic.is_empty() || fact.is_empty() {
            return Err(MemoryError::InvalidInput(
                "topic and fact are required".to_string(),
            ));
        }
        let record = TopicRecord::new(topic, fact);
        self.records.lock().push(record.clone());
        Ok(record)
    }

    async fn records(&self) -> Result<Vec<TopicRecord>, MemoryError> {
        Ok(self.records.lock().clone())
    }

    async fn reorganize(
        &self,
        synthesizer: &dyn FactSynthesizer,
    ) -> Result<Vec<TopicRecord>, MemoryError> {
        let snapshot = self.records.lock().clone();
        let derived: Vec<TopicRecord> = synthesizer
            .synthesize(&snapshot)
            .await?
            .into_iter()
            .filter(|fact| {
                !snapshot
                    .iter()
                    .any(|record| record.topic == fact.topic && record.fact == fact.fact)
            })
            .map(|fact| TopicRecord::derived(fact.topic, fact.fact))
            .collect();
        self.records.lock().extend(derived.iter().cloned());
        Ok(derived)
    }
}

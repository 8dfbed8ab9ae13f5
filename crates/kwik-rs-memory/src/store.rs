//! Topic memory stores.

use crate::error::MemoryError;
use crate::model::TopicRecord;
use crate::policy::FactCapturePolicy;
use crate::synth::FactSynthesizer;
use async_trait::async_trait;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Append-only store of facts grouped by topic.
#[async_trait]
pub trait TopicMemory: Send + Sync {
    /// Append a fact under `topic`.
    async fn commit(&self, topic: &str, fact: &str) -> Result<TopicRecord, MemoryError>;

    /// Every record in commit order.
    async fn records(&self) -> Result<Vec<TopicRecord>, MemoryError>;

    /// Synthesize derived facts and append them. Existing records are untouched.
    async fn reorganize(
        &self,
        synthesizer: &dyn FactSynthesizer,
    ) -> Result<Vec<TopicRecord>, MemoryError>;

    /// Facts filed under `topic`, in commit order. Unknown topics yield an empty list.
    async fn recall(&self, topic: &str) -> Result<Vec<String>, MemoryError> {
        let topic = topic.trim();
        Ok(self
            .records()
            .await?
            .into_iter()
            .filter(|record| record.topic == topic)
            .map(|record| record.fact)
            .collect())
    }

    /// Distinct topics ordered by first appearance.
    async fn list_topics(&self) -> Result<Vec<String>, MemoryError> {
        let mut seen = HashSet::new();
        Ok(self
            .records()
            .await?
            .into_iter()
            .filter_map(|record| seen.insert(record.topic.clone()).then_some(record.topic))
            .collect())
    }
}

/// JSON Lines file with one `TopicRecord` per line.
#[derive(Debug)]
pub struct FileTopicMemory {
    path: PathBuf,
    policy: FactCapturePolicy,
    write_lock: Mutex<()>,
}

impl FileTopicMemory {
    /// Open (or lazily create) the memory file at `path`.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, MemoryError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        info!("initialized topic memory (path={})", path.display());
        Ok(Self {
            path,
            policy: FactCapturePolicy::default(),
            write_lock: Mutex::new(()),
        })
    }

    /// Replace the capture policy applied on commit.
    pub fn with_policy(mut self, policy: FactCapturePolicy) -> Result<Self, MemoryError> {
        policy.validate()?;
        self.policy = policy;
        Ok(self)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_records(&self) -> Result<Vec<TopicRecord>, MemoryError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(OpenOptions::new().read(true).open(&self.path)?);
        let mut records = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<TopicRecord>(&line) {
                Ok(record) => records.push(record),
                Err(err) => warn!(
                    "skipping malformed memory line (path={}, line={}, error={})",
                    self.path.display(),
                    idx + 1,
                    err
                ),
            }
        }
        Ok(records)
    }

    fn append(&self, records: &[TopicRecord]) -> Result<(), MemoryError> {
        if records.is_empty() {
            return Ok(());
        }
        let mut buffer = String::new();
        for record in records {
            buffer.push_str(&serde_json::to_string(record)?);
            buffer.push('\n');
        }
        let _guard = self.write_lock.lock();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(buffer.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}

#[async_trait]
impl TopicMemory for FileTopicMemory {
    async fn commit(&self, topic: &str, fact: &str) -> Result<TopicRecord, MemoryError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(MemoryError::InvalidInput("topic cannot be empty".to_string()));
        }
        let fact = fact.trim();
        if fact.is_empty() {
            return Err(MemoryError::InvalidInput("fact cannot be empty".to_string()));
        }
        let record = TopicRecord::new(topic, self.policy.apply(fact)?);
        self.append(std::slice::from_ref(&record))?;
        debug!(
            "committed fact (topic={}, id={}, fact_len={})",
            record.topic,
            record.id,
            record.fact.len()
        );
        Ok(record)
    }

    async fn records(&self) -> Result<Vec<TopicRecord>, MemoryError> {
        self.load_records()
    }

    async fn reorganize(
        &self,
        synthesizer: &dyn FactSynthesizer,
    ) -> Result<Vec<TopicRecord>, MemoryError> {
        let existing = self.load_records()?;
        let derived = synthesizer.synthesize(&existing).await?;
        let mut seen: HashSet<(String, String)> = existing
            .iter()
            .map(|record| (record.topic.clone(), record.fact.clone()))
            .collect();

        let mut appended = Vec::new();
        for candidate in derived {
            let topic = candidate.topic.trim();
            let fact = candidate.fact.trim();
            if topic.is_empty() || fact.is_empty() {
                warn!(
                    "dropping empty derived fact (synthesizer={})",
                    synthesizer.name()
                );
                continue;
            }
            let fact = self.policy.apply(fact)?;
            if !seen.insert((topic.to_string(), fact.clone())) {
                continue;
            }
            appended.push(TopicRecord::derived(topic, fact));
        }
        self.append(&appended)?;
        info!(
            "memory reorganized (synthesizer={}, existing={}, derived={})",
            synthesizer.name(),
            existing.len(),
            appended.len()
        );
        Ok(appended)
    }
}

#[cfg(test)]
mod tests {
    use super::{FileTopicMemory, TopicMemory};
    use crate::{FactCapturePolicy, MemoryError, TopicDigestSynthesizer};
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn store(dir: &std::path::Path) -> FileTopicMemory {
        FileTopicMemory::new(dir.join("TopicMemory.jsonl"))
            .expect("store")
            .with_policy(FactCapturePolicy::passthrough())
            .expect("policy")
    }

    #[tokio::test]
    async fn recall_preserves_commit_order() {
        let temp = tempdir().expect("tempdir");
        let memory = store(temp.path());
        memory.commit("budget", "Total budget: $500K").await.expect("commit");
        memory.commit("timeline", "Kickoff in May").await.expect("commit");
        memory.commit("budget", "Phase 1: $200K").await.expect("commit");

        assert_eq!(
            memory.recall("budget").await.expect("recall"),
            vec!["Total budget: $500K".to_string(), "Phase 1: $200K".to_string()]
        );
        assert_eq!(
            memory.list_topics().await.expect("topics"),
            vec!["budget".to_string(), "timeline".to_string()]
        );
        assert!(memory.recall("unknown").await.expect("recall").is_empty());
    }

    #[tokio::test]
    async fn records_survive_reopen() {
        let temp = tempdir().expect("tempdir");
        let first = memory_with_fact(temp.path()).await;
        drop(first);
        let reopened = store(temp.path());
        let records = reopened.records().await.expect("records");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].topic, "budget");
    }

    async fn memory_with_fact(dir: &std::path::Path) -> FileTopicMemory {
        let memory = store(dir);
        memory.commit("  budget ", "Phase 2: $300K").await.expect("commit");
        memory
    }

    #[tokio::test]
    async fn rejects_empty_topic_or_fact() {
        let temp = tempdir().expect("tempdir");
        let memory = store(temp.path());
        let err = memory.commit("  ", "fact").await.unwrap_err();
        assert!(matches!(err, MemoryError::InvalidInput(_)));
        let err = memory.commit("topic", "").await.unwrap_err();
        assert!(matches!(err, MemoryError::InvalidInput(_)));
        assert!(memory.records().await.expect("records").is_empty());
    }

    #[tokio::test]
    async fn skips_blank_and_torn_lines() {
        let temp = tempdir().expect("tempdir");
        let memory = store(temp.path());
        memory.commit("budget", "Phase 1: $200K").await.expect("commit");
        let mut contents = fs::read_to_string(memory.path()).expect("read");
        contents.push_str("\n\n{\"id\":");
        fs::write(memory.path(), contents).expect("write");
        assert_eq!(memory.records().await.expect("records").len(), 1);
    }

    #[tokio::test]
    async fn reorganize_only_appends() {
        let temp = tempdir().expect("tempdir");
        let memory = store(temp.path());
        memory.commit("budget", "Total budget: $500K").await.expect("commit");
        memory.commit("budget", "Phase 1: $200K").await.expect("commit");
        memory.commit("risks", "Vendor lock-in").await.expect("commit");
        let before = memory.records().await.expect("records");

        let synthesizer = TopicDigestSynthesizer::default();
        let derived = memory.reorganize(&synthesizer).await.expect("reorganize");
        assert_eq!(derived.len(), 1);
        assert!(derived[0].derived);

        let after = memory.records().await.expect("records");
        assert_eq!(&after[..before.len()], before.as_slice());
        assert_eq!(after.len(), before.len() + 1);

        let again = memory.reorganize(&synthesizer).await.expect("reorganize");
        assert!(again.is_empty());
        assert_eq!(memory.records().await.expect("records").len(), after.len());
    }

    #[tokio::test]
    async fn default_policy_recalls_facts_byte_for_byte() {
        let temp = tempdir().expect("tempdir");
        let memory = FileTopicMemory::new(temp.path().join("TopicMemory.jsonl")).expect("store");
        let fact = "Contract reference ABCDEFGHIJKLMNOPQRSTUVWXYZ signed";
        memory.commit("contracts", fact).await.expect("commit");
        assert_eq!(
            memory.recall("contracts").await.expect("recall"),
            vec![fact.to_string()]
        );
    }
}

//! Chat-model backed fact synthesis for memory reorganization.

use async_trait::async_trait;
use kwik_rs_memory::{DerivedFact, FactSynthesizer, MemoryError, TopicRecord};
use kwik_rs_protocol::{ChatMessage, ChatModel};
use log::{debug, warn};
use std::fmt::Write;
use std::sync::Arc;

const SYSTEM_PROMPT: &str = "You organize a knowledge memory. You receive facts grouped by topic. \
Write new higher-level facts that summarize, connect or generalize them. \
Reply with only a JSON array of objects with string fields \"topic\" and \"fact\". \
Reuse existing topic names where they fit. Reply with [] when nothing new can be derived.";

/// Asks the chat model for derived `{topic, fact}` pairs.
pub struct LlmFactSynthesizer {
    model: Arc<dyn ChatModel>,
    max_fact_chars: usize,
}

impl LlmFactSynthesizer {
    pub fn new(model: Arc<dyn ChatModel>, max_fact_chars: usize) -> Self {
        Self {
            model,
            max_fact_chars: max_fact_chars.max(1),
        }
    }
}

#[async_trait]
impl FactSynthesizer for LlmFactSynthesizer {
    fn name(&self) -> &str {
        "llm"
    }

    async fn synthesize(&self, records: &[TopicRecord]) -> Result<Vec<DerivedFact>, MemoryError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let messages = [
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(render_records(records)),
        ];
        let response = self
            .model
            .chat(&messages, &[])
            .await
            .map_err(|err| MemoryError::Synthesis(err.to_string()))?;
        let text = response.text.unwrap_or_default();
        let derived = parse_derived(&text, self.max_fact_chars)?;
        debug!(
            "llm synthesis finished (model={}, records={}, derived={})",
            self.model.model_name(),
            records.len(),
            derived.len()
        );
        Ok(derived)
    }
}

fn render_records(records: &[TopicRecord]) -> String {
    let mut topics: Vec<(&str, Vec<&str>)> = Vec::new();
    for record in records {
        match topics.iter_mut().find(|(topic, _)| *topic == record.topic) {
            Some((_, facts)) => facts.push(record.fact.as_str()),
            None => topics.push((record.topic.as_str(), vec![record.fact.as_str()])),
        }
    }
    let mut out = String::new();
    for (topic, facts) in topics {
        let _ = writeln!(out, "Topic: {topic}");
        for fact in facts {
            let _ = writeln!(out, "- {fact}");
        }
        out.push('\n');
    }
    out
}

/// Parse the JSON array in `text`, tolerating prose or code fences around it.
fn parse_derived(text: &str, max_fact_chars: usize) -> Result<Vec<DerivedFact>, MemoryError> {
    let (Some(start), Some(end)) = (text.find('['), text.rfind(']')) else {
        return Err(MemoryError::Synthesis(
            "model reply contains no JSON array".to_string(),
        ));
    };
    if end < start {
        return Err(MemoryError::Synthesis(
            "model reply contains no JSON array".to_string(),
        ));
    }
    let facts: Vec<DerivedFact> = serde_json::from_str(&text[start..=end])
        .map_err(|err| MemoryError::Synthesis(format!("invalid synthesis reply: {err}")))?;
    let total = facts.len();
    let facts: Vec<DerivedFact> = facts
        .into_iter()
        .filter_map(|fact| {
            let topic = fact.topic.trim();
            let body = fact.fact.trim();
            if topic.is_empty() || body.is_empty() {
                return None;
            }
            Some(DerivedFact::new(
                topic,
                body.chars().take(max_fact_chars).collect::<String>(),
            ))
        })
        .collect();
    if facts.len() < total {
        warn!(
            "dropped blank synthesized facts (dropped={})",
            total - facts.len()
        );
    }
    Ok(facts)
}

#[cfg(test)]
mod tests {
    use super::{LlmFactSynthesizer, parse_derived};
    use kwik_rs_memory::{DerivedFact, FactSynthesizer, TopicRecord};
    use kwik_rs_protocol::ChatResponse;
    use kwik_rs_test_utils::{FailingModel, ScriptedModel};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[test]
    fn parses_fenced_array_and_skips_blanks() {
        let reply = "```json\n[{\"topic\": \"budget\", \"fact\": \"Total spend is $700K\"}, {\"topic\": \" \", \"fact\": \"x\"}]\n```";
        let facts = parse_derived(reply, 10).expect("parse");
        assert_eq!(facts, vec![DerivedFact::new("budget", "Total spen")]);
    }

    #[test]
    fn rejects_reply_without_array() {
        assert!(parse_derived("nothing to add", 100).is_err());
    }

    #[tokio::test]
    async fn prompts_with_grouped_records() {
        let model = ScriptedModel::new(vec![ChatResponse::text(
            r#"[{"topic": "budget", "fact": "Budget totals $700K across phases"}]"#,
        )]);
        let synthesizer = LlmFactSynthesizer::new(Arc::new(model.clone()), 500);
        let records = vec![
            TopicRecord::new("budget", "Phase 1: $200K"),
            TopicRecord::new("budget", "Phase 2: $500K"),
        ];
        let derived = synthesizer.synthesize(&records).await.expect("synthesize");
        assert_eq!(derived.len(), 1);

        let requests = model.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].tools.is_empty());
        let user = &requests[0].messages[1].content;
        assert_eq!(user, "Topic: budget\n- Phase 1: $200K\n- Phase 2: $500K\n\n");
    }

    #[tokio::test]
    async fn model_failure_is_synthesis_error() {
        let synthesizer = LlmFactSynthesizer::new(Arc::new(FailingModel::new("down")), 500);
        let err = synthesizer
            .synthesize(&[TopicRecord::new("t", "f")])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("down"));
    }
}

//! Sanitizing applied to facts before they are committed.

use crate::error::MemoryError;
use regex::Regex;

/// Redaction and length limits for committed facts. A fact is rewritten, never dropped.
///
/// The default stores facts verbatim; every rewrite is opt-in.
#[derive(Debug, Clone)]
pub struct FactCapturePolicy {
    /// Regex patterns replaced with `redaction_replacement`.
    pub redact_patterns: Vec<String>,
    /// Replace long high-entropy tokens that look like credentials.
    pub detect_secrets: bool,
    pub secret_entropy_threshold: f32,
    /// Character limit; `None` or zero keeps the fact whole.
    pub max_fact_chars: Option<usize>,
    pub redaction_replacement: String,
}

impl Default for FactCapturePolicy {
    fn default() -> Self {
        Self {
            redact_patterns: Vec::new(),
            detect_secrets: false,
            secret_entropy_threshold: 3.7,
            max_fact_chars: None,
            redaction_replacement: "[REDACTED]".to_string(),
        }
    }
}

impl FactCapturePolicy {
    /// Policy that stores facts verbatim.
    pub fn passthrough() -> Self {
        Self::default()
    }

    /// Check that every redaction pattern compiles.
    pub fn validate(&self) -> Result<(), MemoryError> {
        self.compiled_patterns().map(|_| ())
    }

    /// Sanitize `fact` according to the policy.
    pub fn apply(&self, fact: &str) -> Result<String, MemoryError> {
        let mut content = fact.to_string();
        for regex in self.compiled_patterns()? {
            content = regex
                .replace_all(&content, self.redaction_replacement.as_str())
                .into_owned();
        }
        if self.detect_secrets {
            content = redact_high_entropy(
                &content,
                self.secret_entropy_threshold,
                &self.redaction_replacement,
            );
        }
        if let Some(max_chars) = self.max_fact_chars.filter(|max| *max > 0) {
            content = truncate_chars(&content, max_chars);
        }
        Ok(content)
    }

    fn compiled_patterns(&self) -> Result<Vec<Regex>, MemoryError> {
        self.redact_patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern)
                    .map_err(|err| MemoryError::Regex(format!("{pattern}: {err}")))
            })
            .collect()
    }
}

/// Keep at most `max_chars` characters.
pub(crate) fn truncate_chars(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((idx, _)) => value[..idx].to_string(),
        None => value.to_string(),
    }
}

/// Replace tokens of 20+ base64-ish characters whose entropy reaches `threshold`.
fn redact_high_entropy(content: &str, threshold: f32, replacement: &str) -> String {
    let Ok(regex) = Regex::new(r"[A-Za-z0-9+/=]{20,}") else {
        return content.to_string();
    };
    regex
        .replace_all(content, |caps: &regex::Captures<'_>| {
            let token = caps.get(0).map_or("", |m| m.as_str());
            if shannon_entropy(token) >= threshold {
                replacement.to_string()
            } else {
                token.to_string()
            }
        })
        .into_owned()
}

/// Shannon entropy in bits per byte.
fn shannon_entropy(token: &str) -> f32 {
    let bytes = token.as_bytes();
    if bytes.is_empty() {
        return 0.0;
    }
    let mut counts = [0usize; 256];
    for byte in bytes {
        counts[usize::from(*byte)] += 1;
    }
    let len = bytes.len() as f32;
    counts
        .iter()
        .filter(|count| **count > 0)
        .map(|count| {
            let p = *count as f32 / len;
            -p * p.log2()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::{FactCapturePolicy, shannon_entropy, truncate_chars};
    use pretty_assertions::assert_eq;

    #[test]
    fn redacts_patterns_then_truncates() {
        let policy = FactCapturePolicy {
            redact_patterns: vec![r"\d{3}-\d{2}-\d{4}".to_string()],
            redaction_replacement: "***".to_string(),
            max_fact_chars: Some(12),
            detect_secrets: false,
            ..FactCapturePolicy::default()
        };
        let fact = policy.apply("SSN 123-45-6789 on file").expect("apply");
        assert_eq!(fact, "SSN *** on f");
    }

    #[test]
    fn replaces_secret_like_tokens_when_enabled() {
        let policy = FactCapturePolicy {
            detect_secrets: true,
            ..FactCapturePolicy::default()
        };
        let fact = policy
            .apply("api key 9fQ2xL7pZr4Tb8Kd1mVw3YhJ6nCe0aGu for billing")
            .expect("apply");
        assert_eq!(fact, "api key [REDACTED] for billing");
    }

    #[test]
    fn keeps_ordinary_prose() {
        let policy = FactCapturePolicy {
            detect_secrets: true,
            ..FactCapturePolicy::default()
        };
        let fact = "Total budget: $500K across internationalization work";
        assert_eq!(policy.apply(fact).expect("apply"), fact);
    }

    #[test]
    fn default_keeps_long_identifiers_verbatim() {
        let policy = FactCapturePolicy::default();
        for fact in [
            "Contract reference ABCDEFGHIJKLMNOPQRSTUVWXYZ signed",
            "Build hash 9fQ2xL7pZr4Tb8Kd1mVw3YhJ6nCe0aGu shipped",
        ] {
            assert_eq!(policy.apply(fact).expect("apply"), fact);
        }
    }

    #[test]
    fn zero_limit_keeps_the_fact() {
        let policy = FactCapturePolicy {
            max_fact_chars: Some(0),
            ..FactCapturePolicy::passthrough()
        };
        assert_eq!(policy.apply("kept").expect("apply"), "kept");
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let policy = FactCapturePolicy {
            redact_patterns: vec!["(".to_string()],
            ..FactCapturePolicy::default()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 5), "hi");
        assert!(shannon_entropy("aaaa") < 0.01);
    }
}

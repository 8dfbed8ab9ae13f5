//! Text embedders.

use crate::error::KnowledgeError;
use crate::keywords::tokenize;
use async_trait::async_trait;

/// Maps texts to dense vectors of a fixed dimension.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identifier persisted with the index, e.g. `hashing-384`.
    fn name(&self) -> String;

    fn dimensions(&self) -> usize;

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, KnowledgeError>;
}

/// Signed feature hashing of unigrams and bigrams, L2-normalized.
///
/// Deterministic and offline; quality is lexical rather than semantic.
#[derive(Debug, Clone, Copy)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    /// Embed one text synchronously.
    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let tokens = tokenize(text);
        for token in &tokens {
            self.add_feature(&mut vector, token.as_bytes(), 1.0);
        }
        for pair in tokens.windows(2) {
            let bigram = format!("{} {}", pair[0], pair[1]);
            self.add_feature(&mut vector, bigram.as_bytes(), 0.5);
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }

    fn add_feature(&self, vector: &mut [f32], feature: &[u8], weight: f32) {
        let hash = fnv1a(feature);
        let slot = (hash % self.dimensions as u64) as usize;
        let sign = if (hash >> 63) == 0 { 1.0 } else { -1.0 };
        vector[slot] += sign * weight;
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn name(&self) -> String {
        format!("hashing-{}", self.dimensions)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, KnowledgeError> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }
}

/// 64-bit FNV-1a; stable across builds so persisted vectors stay comparable.
fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes.iter().fold(OFFSET, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(PRIME)
    })
}

/// Cosine similarity; zero when either vector is all zeros.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a.sqrt() * norm_b.sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::{HashingEmbedder, cosine};

    #[test]
    fn related_text_scores_higher() {
        let embedder = HashingEmbedder::new(256);
        let query = embedder.embed_one("project budget for phase one");
        let related = embedder.embed_one("The project budget allocates $200K to phase one.");
        let unrelated = embedder.embed_one("Penguins live in the southern hemisphere.");
        assert!(cosine(&query, &related) > cosine(&query, &unrelated));
    }

    #[test]
    fn vectors_are_normalized_and_stable() {
        let embedder = HashingEmbedder::new(64);
        let a = embedder.embed_one("vendor risk assessment");
        let b = embedder.embed_one("vendor risk assessment");
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
        assert!(embedder.embed_one("").iter().all(|v| *v == 0.0));
    }
}

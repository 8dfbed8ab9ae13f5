//! Term extraction shared by the hashing embedder and document topics.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z][A-Za-z0-9]*(?:['-][A-Za-z0-9]+)*").expect("word regex is valid")
});

const STOPWORDS: &[&str] = &[
    "about", "above", "after", "again", "against", "all", "also", "and", "any", "are", "because",
    "been", "before", "being", "below", "between", "both", "but", "can", "could", "did", "does",
    "doing", "down", "during", "each", "few", "for", "from", "further", "had", "has", "have",
    "having", "her", "here", "hers", "him", "his", "how", "into", "its", "itself", "just", "may",
    "more", "most", "must", "not", "now", "off", "once", "only", "other", "our", "ours", "out",
    "over", "own", "same", "shall", "she", "should", "some", "such", "than", "that", "the",
    "their", "theirs", "them", "then", "there", "these", "they", "this", "those", "through",
    "too", "under", "until", "upon", "very", "was", "were", "what", "when", "where", "which",
    "while", "who", "whom", "why", "will", "with", "within", "without", "would", "you", "your",
    "yours",
];

/// Lowercased words of three or more characters.
pub fn tokenize(text: &str) -> Vec<String> {
    WORD.find_iter(text)
        .map(|word| word.as_str().to_lowercase())
        .filter(|word| word.chars().count() > 2)
        .collect()
}

/// Most frequent non-stopword terms; ties keep first-appearance order.
pub fn top_keywords(text: &str, limit: usize) -> Vec<String> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for (position, word) in tokenize(text).into_iter().enumerate() {
        if STOPWORDS.contains(&word.as_str()) || word.chars().all(|ch| ch.is_ascii_digit()) {
            continue;
        }
        counts.entry(word).or_insert((0, position)).0 += 1;
    }
    let mut ranked: Vec<(String, (usize, usize))> = counts.into_iter().collect();
    ranked.sort_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
        count_b.cmp(count_a).then(first_a.cmp(first_b))
    });
    ranked.into_iter().take(limit).map(|(word, _)| word).collect()
}

#[cfg(test)]
mod tests {
    use super::{tokenize, top_keywords};
    use pretty_assertions::assert_eq;

    #[test]
    fn tokenize_lowercases_and_drops_short_words() {
        assert_eq!(
            tokenize("The Q3 budget's phase-one of it"),
            vec!["the", "budget's", "phase-one"]
        );
    }

    #[test]
    fn keywords_rank_by_frequency_then_position() {
        let text = "Budget review. The budget covers hiring; hiring and tooling. Tooling budget.";
        assert_eq!(top_keywords(text, 3), vec!["budget", "hiring", "tooling"]);
        assert_eq!(top_keywords(text, 1), vec!["budget"]);
    }
}

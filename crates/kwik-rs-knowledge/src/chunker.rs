//! Overlapping character windows over document text.

/// Splits text into windows of at most `chunk_size` characters.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Chunker {
    /// `overlap` is clamped below `chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size - 1),
        }
    }

    /// Windows cut at whitespace where one exists in the back half of the window.
    pub fn split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let mut chunks = Vec::new();
        let mut start = 0;
        while start < chars.len() {
            let hard_end = (start + self.chunk_size).min(chars.len());
            let end = if hard_end == chars.len() {
                hard_end
            } else {
                let floor = start + self.chunk_size / 2;
                (floor..hard_end)
                    .rev()
                    .find(|idx| chars[*idx].is_whitespace())
                    .map(|idx| idx + 1)
                    .unwrap_or(hard_end)
            };
            let chunk: String = chars[start..end].iter().collect();
            let trimmed = chunk.trim();
            if !trimmed.is_empty() {
                chunks.push(trimmed.to_string());
            }
            if end == chars.len() {
                break;
            }
            start = end.saturating_sub(self.overlap).max(start + 1);
        }
        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::Chunker;
    use pretty_assertions::assert_eq;

    #[test]
    fn short_text_is_one_chunk() {
        let chunker = Chunker::new(100, 20);
        assert_eq!(chunker.split("  hello world  "), vec!["hello world".to_string()]);
        assert!(chunker.split("   ").is_empty());
    }

    #[test]
    fn windows_overlap_and_prefer_whitespace() {
        let chunker = Chunker::new(12, 4);
        let chunks = chunker.split("alpha beta gamma delta epsilon");
        assert_eq!(chunks[0], "alpha beta");
        assert!(chunks.iter().all(|chunk| chunk.chars().count() <= 12));
        assert!(chunks.last().expect("chunk").ends_with("epsilon"));
        assert!(chunks[1].starts_with("beta") || chunks[1].starts_with("eta"));
    }

    #[test]
    fn unbroken_text_is_cut_hard() {
        let chunker = Chunker::new(4, 0);
        assert_eq!(chunker.split("abcdefghij"), vec!["abcd", "efgh", "ij"]);
    }
}

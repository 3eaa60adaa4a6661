//! Overlapping text chunking with natural-boundary preference

use crate::config::ChunkingConfig;
use crate::error::{Error, Result};

/// Break points tried in order: paragraph, line, sentence, whitespace
const BOUNDARIES: &[&[&str]] = &[
    &["\n\n"],
    &["\n"],
    &[". ", "! ", "? "],
    &[" ", "\t"],
];

/// A chunk together with its character range in the source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSpan {
    /// First character (inclusive)
    pub char_start: usize,
    /// Last character (exclusive)
    pub char_end: usize,
    /// Chunk text, an exact substring of the source
    pub text: String,
}

/// Text chunker with configurable size and overlap
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Maximum chunk size in characters
    chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    overlap: usize,
}

impl TextChunker {
    /// Create a new chunker
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 || overlap >= chunk_size {
            return Err(Error::Config(format!(
                "invalid chunking: size {} overlap {}",
                chunk_size, overlap
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    /// Create a chunker from configuration
    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split text into overlapping chunks
    pub fn split(&self, text: &str) -> Result<Vec<String>> {
        Ok(self
            .split_spans(text)?
            .into_iter()
            .map(|span| span.text)
            .collect())
    }

    /// Split text into overlapping chunks, keeping character offsets
    ///
    /// Every chunk is a substring of `text`, consecutive chunks share at most
    /// `overlap` characters and together they cover the whole input.
    pub fn split_spans(&self, text: &str) -> Result<Vec<ChunkSpan>> {
        if text.trim().is_empty() {
            return Err(Error::EmptyInput);
        }

        // Byte offset of every char, plus the end of the string
        let offsets: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let total = offsets.len() - 1;

        let mut spans = Vec::new();
        let mut start = 0usize;

        loop {
            if total - start <= self.chunk_size {
                spans.push(self.span(text, &offsets, start, total));
                break;
            }

            let end = self.find_break(text, &offsets, start);
            spans.push(self.span(text, &offsets, start, end));
            start = self.next_start(text, &offsets, start, end);
        }

        Ok(spans)
    }

    /// Pick the end of the chunk starting at `start`
    ///
    /// The break must leave room for the overlap, otherwise the next chunk
    /// would not advance.
    fn find_break(&self, text: &str, offsets: &[usize], start: usize) -> usize {
        let window_end = start + self.chunk_size;
        let window = &text[offsets[start]..offsets[window_end]];
        let min_end = start + self.overlap;

        for level in BOUNDARIES {
            let best = level
                .iter()
                .filter_map(|sep| {
                    window
                        .rmatch_indices(sep)
                        .map(|(byte, m)| char_index(offsets, offsets[start] + byte + m.len()))
                        .find(|&end| end > min_end)
                })
                .max();

            if let Some(end) = best {
                return end;
            }
        }

        window_end
    }

    /// Start of the chunk after `[start, end)`, aligned to a word when possible
    fn next_start(&self, text: &str, offsets: &[usize], start: usize, end: usize) -> usize {
        let candidate = end - self.overlap;
        let region = &text[offsets[candidate]..offsets[end]];

        let aligned = region
            .char_indices()
            .find(|(_, c)| c.is_whitespace())
            .map(|(byte, c)| char_index(offsets, offsets[candidate] + byte + c.len_utf8()))
            .filter(|&pos| pos < end);

        aligned.unwrap_or(candidate).max(start + 1)
    }

    fn span(&self, text: &str, offsets: &[usize], start: usize, end: usize) -> ChunkSpan {
        ChunkSpan {
            char_start: start,
            char_end: end,
            text: text[offsets[start]..offsets[end]].to_string(),
        }
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        let config = ChunkingConfig::default();
        Self {
            chunk_size: config.chunk_size,
            overlap: config.chunk_overlap,
        }
    }
}

/// Char index of a byte offset that lies on a char boundary
fn char_index(offsets: &[usize], byte: usize) -> usize {
    offsets.binary_search(&byte).unwrap_or_else(|i| i)
}

/// Rebuild the source text from overlapping spans
pub fn reconstruct(spans: &[ChunkSpan]) -> String {
    let mut out = String::new();
    let mut covered = 0usize;

    for span in spans {
        let skip = covered.saturating_sub(span.char_start);
        out.extend(span.text.chars().skip(skip));
        covered = covered.max(span.char_end);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_input_rejected() {
        let chunker = TextChunker::default();
        assert!(matches!(chunker.split(""), Err(Error::EmptyInput)));
        assert!(matches!(chunker.split("  \n\t "), Err(Error::EmptyInput)));
    }

    #[test]
    fn test_invalid_sizes_rejected() {
        assert!(TextChunker::new(0, 0).is_err());
        assert!(TextChunker::new(100, 100).is_err());
        assert!(TextChunker::new(100, 20).is_ok());
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunker = TextChunker::default();
        let chunks = chunker.split("The sky is blue. Grass is green.").unwrap();
        assert_eq!(chunks, vec!["The sky is blue. Grass is green.".to_string()]);
    }

    #[test]
    fn test_prefers_paragraph_breaks() {
        let chunker = TextChunker::new(60, 10).unwrap();
        let text = "First paragraph talks about cats.\n\nSecond paragraph talks about dogs and more.";
        let chunks = chunker.split(text).unwrap();

        assert!(chunks.len() >= 2);
        assert!(chunks[0].ends_with("\n\n"));
        assert!(chunks[0].starts_with("First paragraph"));
    }

    #[test]
    fn test_prefers_sentence_over_word() {
        let chunker = TextChunker::new(40, 5).unwrap();
        let text = "One short sentence here. Another sentence follows after it.";
        let chunks = chunker.split(text).unwrap();

        assert_eq!(chunks[0], "One short sentence here. ");
    }

    #[test]
    fn test_hard_cut_without_boundaries() {
        let chunker = TextChunker::new(100, 20).unwrap();
        let text = "a".repeat(250);
        let spans = chunker.split_spans(&text).unwrap();

        assert!(spans.len() >= 3);
        for span in &spans {
            assert!(span.text.chars().count() <= 100);
        }
        assert_eq!(spans[1].char_start, 80);
        assert_eq!(reconstruct(&spans), text);
    }

    #[test]
    fn test_multibyte_text() {
        let chunker = TextChunker::new(10, 3).unwrap();
        let text = "héllo wörld ünïcödé tëxt çhünks ärë fïnë";
        let spans = chunker.split_spans(text).unwrap();

        for span in &spans {
            assert!(span.text.chars().count() <= 10);
        }
        assert_eq!(reconstruct(&spans), text);
    }

    #[test]
    fn test_consecutive_chunks_overlap() {
        let chunker = TextChunker::new(50, 15).unwrap();
        let text = "word ".repeat(40);
        let spans = chunker.split_spans(&text).unwrap();

        for pair in spans.windows(2) {
            assert!(pair[1].char_start < pair[0].char_end);
            assert!(pair[0].char_end - pair[1].char_start <= 15);
        }
    }

    proptest! {
        #[test]
        fn prop_split_round_trips(
            text in "[a-zA-Z .!?\n]{1,600}",
            size in 20usize..200,
            overlap_pct in 0usize..50,
        ) {
            prop_assume!(!text.trim().is_empty());
            let overlap = size * overlap_pct / 100;
            let chunker = TextChunker::new(size, overlap).unwrap();
            let spans = chunker.split_spans(&text).unwrap();

            prop_assert!(!spans.is_empty());
            for span in &spans {
                prop_assert!(span.text.chars().count() <= size);
            }
            prop_assert_eq!(reconstruct(&spans), text);
        }
    }
}

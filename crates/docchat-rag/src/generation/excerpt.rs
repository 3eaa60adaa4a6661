//! Short, question-relevant source excerpts
//!
//! A retrieved chunk is usually too long to show as a citation. The selector
//! reduces it to the sentence sharing the most keywords with the question,
//! and for simple entity questions narrows long sentences further to a word
//! window around the answer.

use regex::Regex;
use std::collections::HashSet;
use unicode_segmentation::UnicodeSegmentation;

use crate::config::RetrievalConfig;
use crate::error::{Error, Result};
use crate::types::RetrievalResult;

const ELLIPSIS: &str = "...";

/// Keyword-overlap excerpt selector
#[derive(Debug, Clone)]
pub struct ExcerptSelector {
    sentence_end: Regex,
    entity_question: Regex,
    max_chars: usize,
    window_sizes: Vec<usize>,
    scan_limit: usize,
    max_sources: usize,
}

impl ExcerptSelector {
    pub fn new(config: &RetrievalConfig) -> Result<Self> {
        let sentence_end = Regex::new(r"[.!?]\s+")
            .map_err(|e| Error::Config(format!("sentence pattern: {}", e)))?;
        let entity_question = Regex::new(r"\b(who|what|name|when|where|which|how\s+many)\b")
            .map_err(|e| Error::Config(format!("entity pattern: {}", e)))?;

        Ok(Self {
            sentence_end,
            entity_question,
            max_chars: config.excerpt_max_chars.max(ELLIPSIS.len() + 1),
            window_sizes: config.window_sizes.clone(),
            scan_limit: config.excerpt_scan_limit,
            max_sources: config.max_sources,
        })
    }

    /// Most question-relevant fragment of `chunk_text`
    pub fn select_excerpt(&self, chunk_text: &str, question: &str) -> String {
        let sentences = self.sentences(chunk_text);
        let keywords = keywords(question);

        let mut best: Option<(&str, usize)> = None;
        for &sentence in &sentences {
            let score = overlap(sentence, &keywords);
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((sentence, score));
            }
        }

        let sentence = match best {
            Some((sentence, score)) if score > 0 => sentence,
            _ => match sentences.first() {
                Some(first) => *first,
                None => return String::new(),
            },
        };

        if sentence.chars().count() <= self.max_chars {
            return sentence.to_string();
        }

        if self.is_entity_question(question) {
            if let Some(fragment) = self.best_window(sentence, &keywords) {
                return if fragment == sentence {
                    fragment
                } else {
                    format!("{ELLIPSIS}{fragment}{ELLIPSIS}")
                };
            }
        }

        let keep = self.max_chars - ELLIPSIS.len();
        let mut truncated: String = sentence.chars().take(keep).collect();
        truncated.push_str(ELLIPSIS);
        truncated
    }

    /// Distinct excerpts from the top retrieved chunks, best first
    pub fn select_sources(&self, results: &[RetrievalResult], question: &str) -> Vec<String> {
        let mut sources: Vec<String> = Vec::new();

        for result in results.iter().take(self.scan_limit) {
            if sources.len() >= self.max_sources {
                break;
            }
            let excerpt = self.select_excerpt(&result.content, question);
            if excerpt.is_empty() || sources.contains(&excerpt) {
                continue;
            }
            sources.push(excerpt);
        }

        sources
    }

    /// Who/what/when/where/which/how-many style questions
    pub fn is_entity_question(&self, question: &str) -> bool {
        self.entity_question.is_match(&question.to_lowercase())
    }

    /// Sentences with their terminal punctuation, surrounding whitespace trimmed
    fn sentences<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut sentences = Vec::new();
        let mut start = 0;

        for m in self.sentence_end.find_iter(text) {
            // Punctuation is a single ASCII byte
            sentences.push(text[start..m.start() + 1].trim());
            start = m.end();
        }
        sentences.push(text[start..].trim());

        sentences.retain(|s| !s.is_empty());
        sentences
    }

    /// Highest-scoring word window; earlier sizes and positions win ties
    fn best_window(&self, sentence: &str, keywords: &HashSet<String>) -> Option<String> {
        let words: Vec<&str> = sentence.split_whitespace().collect();
        let mut best: Option<(String, usize)> = None;

        for &size in &self.window_sizes {
            if size == 0 || size > words.len() {
                continue;
            }
            for window in words.windows(size) {
                let fragment = window.join(" ");
                let score = overlap(&fragment, keywords);
                if best.as_ref().map_or(true, |(_, top)| score > *top) {
                    best = Some((fragment, score));
                }
            }
        }

        best.map(|(fragment, _)| fragment)
    }
}

/// Lowercased question words longer than two characters
fn keywords(question: &str) -> HashSet<String> {
    question
        .unicode_words()
        .map(str::to_lowercase)
        .filter(|w| w.chars().count() > 2)
        .collect()
}

/// Number of keywords present in `text`
fn overlap(text: &str, keywords: &HashSet<String>) -> usize {
    let words: HashSet<String> = text.unicode_words().map(str::to_lowercase).collect();
    keywords.intersection(&words).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn selector() -> ExcerptSelector {
        ExcerptSelector::new(&RetrievalConfig::default()).unwrap()
    }

    fn result(content: &str) -> RetrievalResult {
        RetrievalResult {
            content: content.to_string(),
            metadata: BTreeMap::new(),
            distance: 0.0,
        }
    }

    const LONG_SENTENCE: &str = "In the early spring of that difficult year the small riverside company \
        was founded by Margaret Holloway together with two engineers from the northern \
        railway workshops who had lost their jobs";

    #[test]
    fn test_picks_sentence_with_most_keywords() {
        let excerpt = selector().select_excerpt(
            "Paris is the capital of France. It is located on the Seine.",
            "What is the capital of France?",
        );
        assert!(excerpt.contains("capital of France"));
        assert!(excerpt.split_whitespace().count() <= 20);
    }

    #[test]
    fn test_earliest_sentence_wins_ties() {
        let excerpt = selector().select_excerpt(
            "Cats are mammals. Cats are pets. Dogs bark.",
            "Tell me about cats",
        );
        assert_eq!(excerpt, "Cats are mammals.");
    }

    #[test]
    fn test_no_overlap_falls_back_to_first_sentence() {
        let excerpt = selector().select_excerpt(
            "The report covers revenue! Costs are flat.",
            "zebra migration patterns",
        );
        assert_eq!(excerpt, "The report covers revenue!");
    }

    #[test]
    fn test_short_keywords_ignored() {
        let keywords = keywords("Is it on the map?");
        assert!(keywords.contains("the"));
        assert!(keywords.contains("map"));
        assert!(!keywords.contains("is"));
        assert!(!keywords.contains("on"));
    }

    #[test]
    fn test_entity_question_detection() {
        let selector = selector();
        assert!(selector.is_entity_question("Who founded the company?"));
        assert!(selector.is_entity_question("How many employees are there?"));
        assert!(selector.is_entity_question("WHERE is it?"));
        assert!(!selector.is_entity_question("Summarize the findings"));
        assert!(!selector.is_entity_question("Somewhat unrelated"));
    }

    #[test]
    fn test_entity_question_gets_window_excerpt() {
        assert!(LONG_SENTENCE.chars().count() > 120);
        let excerpt = selector().select_excerpt(LONG_SENTENCE, "Who founded the riverside company?");

        assert!(excerpt.starts_with("..."));
        assert!(excerpt.ends_with("..."));
        assert!(excerpt.contains("founded"));
        let inner = excerpt.trim_matches('.');
        assert!(inner.split_whitespace().count() <= 20);
    }

    #[test]
    fn test_long_sentence_truncated_for_open_questions() {
        let excerpt = selector().select_excerpt(LONG_SENTENCE, "Describe the riverside company");

        assert_eq!(excerpt.chars().count(), 120);
        assert!(excerpt.ends_with("..."));
        assert!(LONG_SENTENCE.starts_with(excerpt.trim_end_matches("...")));
    }

    #[test]
    fn test_multibyte_truncation() {
        let sentence = "é".repeat(200);
        let excerpt = selector().select_excerpt(&sentence, "describe");
        assert_eq!(excerpt.chars().count(), 120);
    }

    #[test]
    fn test_empty_chunk_gives_empty_excerpt() {
        assert_eq!(selector().select_excerpt("   ", "what?"), "");
    }

    #[test]
    fn test_sources_deduplicated_and_capped() {
        let selector = selector();
        let results = vec![
            result("The sky is blue. Nothing else."),
            result("The sky is blue. Something different."),
            result("Grass is green."),
            result("Water is wet."),
        ];

        let sources = selector.select_sources(&results, "What color is the sky?");
        assert_eq!(sources, vec!["The sky is blue.".to_string(), "Grass is green.".to_string()]);
    }

    #[test]
    fn test_sources_scan_limited() {
        let selector = selector();
        let results = vec![
            result("Same excerpt."),
            result("Same excerpt."),
            result("Same excerpt."),
            result("Only in the fourth chunk."),
        ];

        let sources = selector.select_sources(&results, "excerpt");
        assert_eq!(sources, vec!["Same excerpt.".to_string()]);
    }

    #[test]
    fn test_sources_empty_for_no_results() {
        assert!(selector().select_sources(&[], "anything").is_empty());
    }
}

//! Grounded answer synthesis

use std::sync::Arc;
use std::time::Instant;

use crate::config::RetrievalConfig;
use crate::error::{Error, Result};
use crate::providers::CompletionProvider;
use crate::retrieval::Retriever;
use crate::types::{Answer, DocumentId};

use super::excerpt::ExcerptSelector;
use super::prompt::PromptBuilder;

/// Retrieves context for a question and asks the completion provider
pub struct AnswerSynthesizer {
    retriever: Retriever,
    llm: Arc<dyn CompletionProvider>,
    selector: ExcerptSelector,
    top_k: usize,
}

impl AnswerSynthesizer {
    pub fn new(
        retriever: Retriever,
        llm: Arc<dyn CompletionProvider>,
        config: &RetrievalConfig,
    ) -> Result<Self> {
        Ok(Self {
            retriever,
            llm,
            selector: ExcerptSelector::new(config)?,
            top_k: config.top_k,
        })
    }

    /// Answer `question` from `document_id`'s chunks only
    ///
    /// Without retrieved context the fixed not-found answer is returned and
    /// the completion provider is never called. Provider failures while
    /// answering are surfaced as [`Error::Synthesis`]; a dimension mismatch
    /// stays a configuration error.
    pub async fn answer(&self, document_id: DocumentId, question: &str) -> Result<Answer> {
        let start = Instant::now();

        let results = self
            .retriever
            .retrieve(document_id, question, self.top_k)
            .await
            .map_err(|e| match e {
                Error::DimensionMismatch { .. } => e,
                other => Error::synthesis(other.to_string()),
            })?;

        if results.is_empty() {
            tracing::warn!("No context for document {}, returning fallback answer", document_id);
            return Ok(Answer::not_found());
        }

        let context = PromptBuilder::build_context(&results);
        let prompt = PromptBuilder::build_prompt(question, &context);

        let text = self
            .llm
            .complete(&prompt)
            .await
            .map_err(|e| Error::synthesis(e.to_string()))?;

        let sources = self.selector.select_sources(&results, question);

        tracing::info!(
            "Answered question on document {} in {}ms ({} chunks, {} sources)",
            document_id,
            start.elapsed().as_millis(),
            results.len(),
            sources.len()
        );

        Ok(Answer::new(text.trim().to_string(), sources))
    }

    pub fn selector(&self) -> &ExcerptSelector {
        &self.selector
    }
}

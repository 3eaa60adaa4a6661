//! Document question-answering service
//!
//! Ties chunking, the per-document index and answer synthesis together
//! behind three entry points: rebuild a document's index from its text,
//! answer a question about it, and delete it.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::generation::AnswerSynthesizer;
use crate::index::VectorIndex;
use crate::ingestion::TextChunker;
use crate::providers::{CompletionProvider, EmbeddingProvider};
use crate::retrieval::Retriever;
use crate::types::{Answer, CollectionInfo, DocumentId};

/// RAG pipeline over per-document indexes
pub struct RagService {
    chunker: TextChunker,
    index: Arc<VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn CompletionProvider>,
    synthesizer: AnswerSynthesizer,
}

impl RagService {
    /// Create a service over an opened index
    pub fn new(
        config: &RagConfig,
        index: Arc<VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn CompletionProvider>,
    ) -> Result<Self> {
        config.validate()?;

        if embedder.dimensions() != index.dimensions() {
            return Err(Error::DimensionMismatch {
                expected: index.dimensions(),
                actual: embedder.dimensions(),
            });
        }

        let retriever = Retriever::new(Arc::clone(&index), Arc::clone(&embedder));
        let synthesizer = AnswerSynthesizer::new(retriever, Arc::clone(&llm), &config.retrieval)?;

        Ok(Self {
            chunker: TextChunker::from_config(&config.chunking)?,
            index,
            embedder,
            llm,
            synthesizer,
        })
    }

    /// Replace a document's index with chunks of `full_text`
    ///
    /// On any failure the previous index, if one exists, is left untouched.
    pub async fn rebuild(
        &self,
        document_id: DocumentId,
        full_text: &str,
        metadata: BTreeMap<String, String>,
    ) -> Result<CollectionInfo> {
        let chunks = self.chunker.split(full_text)?;
        tracing::info!(
            "Ingesting document {} ({} chars, {} chunks)",
            document_id,
            full_text.chars().count(),
            chunks.len()
        );

        self.index
            .rebuild(document_id, chunks, metadata, self.embedder.as_ref())
            .await
    }

    /// Answer a question from one document's content
    pub async fn answer_question(&self, document_id: DocumentId, question: &str) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::InvalidRequest("question must not be empty".to_string()));
        }

        tracing::info!("Question on document {}: \"{}\"", document_id, question);
        self.synthesizer.answer(document_id, question).await
    }

    /// Drop a document's index; returns whether one existed
    pub async fn delete_document(&self, document_id: DocumentId) -> Result<bool> {
        self.index.drop_collection(document_id).await
    }

    /// Index summary, `None` before the first successful ingestion
    pub async fn document_info(&self, document_id: DocumentId) -> Result<Option<CollectionInfo>> {
        self.index.info(document_id).await
    }

    /// Provider availability as (embedder, completion)
    pub async fn providers_healthy(&self) -> (bool, bool) {
        let (embed, llm) = tokio::join!(self.embedder.health_check(), self.llm.health_check());
        (embed.unwrap_or(false), llm.unwrap_or(false))
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn chunker(&self) -> &TextChunker {
        &self.chunker
    }
}

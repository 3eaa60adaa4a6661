//! Question-time retrieval over one document's index

use std::sync::Arc;

use crate::error::Result;
use crate::index::VectorIndex;
use crate::providers::EmbeddingProvider;
use crate::types::{DocumentId, RetrievalResult};

/// Embeds a question and searches a single document's collection
#[derive(Clone)]
pub struct Retriever {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl Retriever {
    pub fn new(index: Arc<VectorIndex>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { index, embedder }
    }

    /// Up to `k` chunks of `document_id` closest to `question`
    ///
    /// The question is embedded exactly once. A document that was never
    /// ingested yields an empty list.
    pub async fn retrieve(
        &self,
        document_id: DocumentId,
        question: &str,
        k: usize,
    ) -> Result<Vec<RetrievalResult>> {
        let query_vector = self.embedder.embed_query(question).await?;
        let results = self.index.search(document_id, &query_vector, k).await?;

        tracing::debug!(
            "Retrieved {} chunks for document {} (k={})",
            results.len(),
            document_id,
            k
        );

        Ok(results)
    }

    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }
}

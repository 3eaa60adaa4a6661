//! Per-document vector indexes
//!
//! Every document owns one named collection (`{prefix}_{document_id}`).
//! A rebuild embeds the full chunk set first and only then swaps the
//! collection in, so readers observe either the previous generation or the
//! new one, never a mix.

mod distance;
mod memory;
mod sqlite;

pub use distance::{cosine_similarity, euclidean_distance_squared, DistanceMetric};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::{IndexBackend, RagConfig};
use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::types::{Chunk, CollectionInfo, DocumentId, RetrievalResult};

/// One ingestion generation of a document's chunks
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    /// Owning document
    pub document_id: DocumentId,
    /// Collection name
    pub name: String,
    /// Vector length shared by all chunks
    pub dimensions: usize,
    /// Chunks in split order
    pub chunks: Vec<Chunk>,
    /// Ingestion metadata copied onto every search result
    pub metadata: BTreeMap<String, String>,
    /// When this generation was built
    pub ingested_at: DateTime<Utc>,
}

impl Collection {
    pub fn info(&self) -> CollectionInfo {
        CollectionInfo {
            document_id: self.document_id,
            name: self.name.clone(),
            chunk_count: self.chunks.len(),
            dimensions: self.dimensions,
            ingested_at: self.ingested_at,
        }
    }
}

/// Storage for per-document collections
///
/// `replace` must be atomic with respect to `load`: a concurrent reader gets
/// the old collection in full or the new one in full.
#[async_trait]
pub trait CollectionStore: Send + Sync {
    /// Replace (or create) the collection for `collection.document_id`
    async fn replace(&self, collection: Collection) -> Result<()>;

    /// Load a document's collection, `None` if it was never ingested
    async fn load(&self, document_id: DocumentId) -> Result<Option<Arc<Collection>>>;

    /// Remove a document's collection, returning whether one existed
    async fn remove(&self, document_id: DocumentId) -> Result<bool>;

    /// Summary of a document's collection without loading vectors
    async fn info(&self, document_id: DocumentId) -> Result<Option<CollectionInfo>>;

    /// Get store name for logging
    fn name(&self) -> &str;
}

/// Per-document index: embedding, atomic rebuild and k-NN search
pub struct VectorIndex {
    store: Arc<dyn CollectionStore>,
    dimensions: usize,
    metric: DistanceMetric,
    prefix: String,
    batch_size: usize,
    concurrency: usize,
}

impl VectorIndex {
    /// Create an index over an existing store
    pub fn new(store: Arc<dyn CollectionStore>, config: &RagConfig) -> Self {
        Self {
            store,
            dimensions: config.embeddings.dimensions,
            metric: config.index.metric,
            prefix: config.index.collection_prefix.clone(),
            batch_size: config.embeddings.batch_size.max(1),
            concurrency: config.embeddings.concurrency.max(1),
        }
    }

    /// Open the configured storage backend
    pub fn open(config: &RagConfig) -> Result<Self> {
        let store: Arc<dyn CollectionStore> = match config.index.backend {
            IndexBackend::Memory => Arc::new(MemoryStore::new()),
            IndexBackend::Sqlite => Arc::new(SqliteStore::open(&config.index.storage_path)?),
        };
        tracing::info!(
            "Index opened (store: {}, dimensions: {}, metric: {:?})",
            store.name(),
            config.embeddings.dimensions,
            config.index.metric
        );
        Ok(Self::new(store, config))
    }

    /// Collection name for a document
    pub fn collection_name(&self, document_id: DocumentId) -> String {
        format!("{}_{}", self.prefix, document_id)
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn store_name(&self) -> &str {
        self.store.name()
    }

    /// Embed `chunks` and atomically replace the document's collection
    ///
    /// Nothing is written unless every chunk was embedded successfully.
    pub async fn rebuild(
        &self,
        document_id: DocumentId,
        chunks: Vec<String>,
        metadata: BTreeMap<String, String>,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<CollectionInfo> {
        if chunks.is_empty() {
            return Err(Error::EmptyInput);
        }
        if embedder.dimensions() != self.dimensions {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions,
                actual: embedder.dimensions(),
            });
        }

        let name = self.collection_name(document_id);
        tracing::info!(
            "Rebuilding collection {} ({} chunks, embedder: {})",
            name,
            chunks.len(),
            embedder.name()
        );

        let vectors = self.embed_all(&chunks, embedder).await?;

        let chunks: Vec<Chunk> = chunks
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(i, (text, vector))| Chunk::new(document_id, i, text, vector))
            .collect();

        let collection = Collection {
            document_id,
            name,
            dimensions: self.dimensions,
            chunks,
            metadata,
            ingested_at: Utc::now(),
        };
        let info = collection.info();

        self.store.replace(collection).await?;
        tracing::info!("Collection {} ready ({} chunks)", info.name, info.chunk_count);

        Ok(info)
    }

    /// Embed chunks batch by batch, keeping input order
    async fn embed_all(
        &self,
        chunks: &[String],
        embedder: &dyn EmbeddingProvider,
    ) -> Result<Vec<Vec<f32>>> {
        // Owned batches keep the stream future Send for axum handlers
        let owned: Vec<Vec<String>> = chunks
            .chunks(self.batch_size)
            .map(<[String]>::to_vec)
            .collect();

        let batches: Vec<Vec<Vec<f32>>> = futures::stream::iter(owned)
            .map(|batch| async move {
                let vectors = embedder.embed_documents(&batch).await?;
                if vectors.len() != batch.len() {
                    return Err(Error::embedding(format!(
                        "provider returned {} vectors for {} chunks",
                        vectors.len(),
                        batch.len()
                    )));
                }
                for vector in &vectors {
                    self.check_dimensions(vector)?;
                }
                Ok(vectors)
            })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        Ok(batches.into_iter().flatten().collect())
    }

    /// Up to `k` chunks of a document, closest first
    ///
    /// A document without a collection yields no results.
    pub async fn search(
        &self,
        document_id: DocumentId,
        query_vector: &[f32],
        k: usize,
    ) -> Result<Vec<RetrievalResult>> {
        self.check_dimensions(query_vector)?;

        let Some(collection) = self.store.load(document_id).await? else {
            tracing::debug!("No collection for document {}", document_id);
            return Ok(Vec::new());
        };

        if collection.dimensions != self.dimensions {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions,
                actual: collection.dimensions,
            });
        }

        let mut scored: Vec<(f32, &Chunk)> = collection
            .chunks
            .iter()
            .map(|chunk| (self.metric.distance(query_vector, &chunk.vector), chunk))
            .collect();

        scored.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.index.cmp(&b.1.index)));
        scored.truncate(k);

        tracing::debug!(
            "Search on {} returned {} of {} chunks",
            collection.name,
            scored.len(),
            collection.chunks.len()
        );

        Ok(scored
            .into_iter()
            .map(|(distance, chunk)| {
                let mut metadata = collection.metadata.clone();
                metadata.insert("chunk_id".to_string(), chunk.id.clone());
                metadata.insert("chunk_index".to_string(), chunk.index.to_string());
                metadata.insert("document_id".to_string(), document_id.to_string());
                RetrievalResult {
                    content: chunk.text.clone(),
                    metadata,
                    distance,
                }
            })
            .collect())
    }

    /// Drop a document's collection; a no-op when absent
    pub async fn drop_collection(&self, document_id: DocumentId) -> Result<bool> {
        let removed = self.store.remove(document_id).await?;
        if removed {
            tracing::info!("Dropped collection {}", self.collection_name(document_id));
        }
        Ok(removed)
    }

    /// Collection summary, `None` before the first successful ingestion
    pub async fn info(&self, document_id: DocumentId) -> Result<Option<CollectionInfo>> {
        self.store.info(document_id).await
    }

    fn check_dimensions(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimensions {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_config, FailingEmbedder, KeywordEmbedder, TEST_DIMENSIONS};

    fn memory_index() -> VectorIndex {
        VectorIndex::new(Arc::new(MemoryStore::new()), &test_config())
    }

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn assert_send<T: Send>(_: &T) {}

    #[test]
    fn test_rebuild_future_is_send() {
        let index = memory_index();
        let embedder = KeywordEmbedder::new(TEST_DIMENSIONS);
        let rebuild = index.rebuild(1, texts(&["one", "two"]), BTreeMap::new(), &embedder);
        assert_send(&rebuild);
    }

    #[tokio::test]
    async fn test_batched_rebuild_keeps_chunk_order() {
        let mut config = test_config();
        config.embeddings.batch_size = 2;
        config.embeddings.concurrency = 3;
        let index = VectorIndex::new(Arc::new(MemoryStore::new()), &config);
        let embedder = KeywordEmbedder::new(TEST_DIMENSIONS);
        let chunks = texts(&["red apple", "green pear", "yellow banana", "purple plum", "orange peach"]);

        let info = index
            .rebuild(4, chunks.clone(), BTreeMap::new(), &embedder)
            .await
            .unwrap();
        assert_eq!(info.chunk_count, 5);

        for (i, chunk) in chunks.iter().enumerate() {
            let query = embedder.embed_query(chunk).await.unwrap();
            let results = index.search(4, &query, 1).await.unwrap();
            assert_eq!(results[0].content, chunks[i]);
        }
    }

    #[tokio::test]
    async fn test_search_unknown_document_is_empty() {
        let index = memory_index();
        let results = index.search(99, &vec![0.0; TEST_DIMENSIONS], 4).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_rebuild_then_search() {
        let index = memory_index();
        let embedder = KeywordEmbedder::new(TEST_DIMENSIONS);
        let chunks = texts(&[
            "cats purr and sleep",
            "dogs bark loudly",
            "the stock market fell",
        ]);

        let info = index.rebuild(1, chunks, BTreeMap::new(), &embedder).await.unwrap();
        assert_eq!(info.chunk_count, 3);
        assert_eq!(info.name, "documents_1");

        let query = embedder.embed_query("why do dogs bark").await.unwrap();

        let results = index.search(1, &query, 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].content, "dogs bark loudly");
        assert_eq!(results[0].chunk_id(), Some("1_chunk_1"));
        assert!(results[0].distance <= results[1].distance);

        let all = index.search(1, &query, 10).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[tokio::test]
    async fn test_metadata_attached_to_results() {
        let index = memory_index();
        let embedder = KeywordEmbedder::new(TEST_DIMENSIONS);
        let mut metadata = BTreeMap::new();
        metadata.insert("filename".to_string(), "notes.txt".to_string());

        index
            .rebuild(5, texts(&["alpha beta"]), metadata, &embedder)
            .await
            .unwrap();

        let query = embedder.embed_query("alpha").await.unwrap();
        let results = index.search(5, &query, 1).await.unwrap();
        assert_eq!(results[0].metadata["filename"], "notes.txt");
        assert_eq!(results[0].metadata["document_id"], "5");
        assert_eq!(results[0].metadata["chunk_index"], "0");
    }

    #[tokio::test]
    async fn test_failed_rebuild_keeps_previous_generation() {
        let index = memory_index();
        let embedder = KeywordEmbedder::new(TEST_DIMENSIONS);
        index
            .rebuild(7, texts(&["original first", "original second"]), BTreeMap::new(), &embedder)
            .await
            .unwrap();

        // Fails while embedding the third of five chunks
        let failing = FailingEmbedder::new(TEST_DIMENSIONS, 2);
        let err = index
            .rebuild(
                7,
                texts(&["new a", "new b", "new c", "new d", "new e"]),
                BTreeMap::new(),
                &failing,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));

        let query = embedder.embed_query("original").await.unwrap();
        let results = index.search(7, &query, 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.content.starts_with("original")));
    }

    #[tokio::test]
    async fn test_rebuild_replaces_whole_generation() {
        let index = memory_index();
        let embedder = KeywordEmbedder::new(TEST_DIMENSIONS);
        index
            .rebuild(3, texts(&["old one", "old two", "old three"]), BTreeMap::new(), &embedder)
            .await
            .unwrap();
        index
            .rebuild(3, texts(&["fresh"]), BTreeMap::new(), &embedder)
            .await
            .unwrap();

        let query = embedder.embed_query("old").await.unwrap();
        let results = index.search(3, &query, 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].content, "fresh");
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_fatal() {
        let index = memory_index();
        let wrong = KeywordEmbedder::new(TEST_DIMENSIONS + 1);

        let err = index
            .rebuild(1, texts(&["text"]), BTreeMap::new(), &wrong)
            .await
            .unwrap_err();
        assert!(err.is_fatal());
        assert!(index.info(1).await.unwrap().is_none());

        let err = index.search(1, &[0.0; 3], 4).await.unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { actual: 3, .. }));
    }

    #[tokio::test]
    async fn test_empty_chunk_list_rejected() {
        let index = memory_index();
        let embedder = KeywordEmbedder::new(TEST_DIMENSIONS);
        let err = index.rebuild(1, Vec::new(), BTreeMap::new(), &embedder).await.unwrap_err();
        assert!(matches!(err, Error::EmptyInput));
    }

    #[tokio::test]
    async fn test_drop_is_idempotent() {
        let index = memory_index();
        let embedder = KeywordEmbedder::new(TEST_DIMENSIONS);
        index
            .rebuild(2, texts(&["something"]), BTreeMap::new(), &embedder)
            .await
            .unwrap();

        assert!(index.drop_collection(2).await.unwrap());
        assert!(!index.drop_collection(2).await.unwrap());

        let query = embedder.embed_query("something").await.unwrap();
        assert!(index.search(2, &query, 4).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_documents_are_isolated() {
        let index = memory_index();
        let embedder = KeywordEmbedder::new(TEST_DIMENSIONS);
        index.rebuild(1, texts(&["apples"]), BTreeMap::new(), &embedder).await.unwrap();
        index.rebuild(2, texts(&["oranges"]), BTreeMap::new(), &embedder).await.unwrap();

        let query = embedder.embed_query("oranges").await.unwrap();
        let results = index.search(1, &query, 4).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].content, "apples");
    }
}

//! In-process collection store

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::types::{CollectionInfo, DocumentId};

use super::{Collection, CollectionStore};

/// Collections held in memory, one `Arc` per document
///
/// A replacement swaps the map entry to a fully built collection; readers
/// keep whatever `Arc` they cloned before the swap.
#[derive(Default)]
pub struct MemoryStore {
    collections: DashMap<DocumentId, Arc<Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents with a collection
    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}

#[async_trait]
impl CollectionStore for MemoryStore {
    async fn replace(&self, collection: Collection) -> Result<()> {
        self.collections
            .insert(collection.document_id, Arc::new(collection));
        Ok(())
    }

    async fn load(&self, document_id: DocumentId) -> Result<Option<Arc<Collection>>> {
        Ok(self
            .collections
            .get(&document_id)
            .map(|entry| Arc::clone(entry.value())))
    }

    async fn remove(&self, document_id: DocumentId) -> Result<bool> {
        Ok(self.collections.remove(&document_id).is_some())
    }

    async fn info(&self, document_id: DocumentId) -> Result<Option<CollectionInfo>> {
        Ok(self
            .collections
            .get(&document_id)
            .map(|entry| entry.value().info()))
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Chunk;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn collection(document_id: DocumentId, texts: &[&str]) -> Collection {
        Collection {
            document_id,
            name: format!("documents_{}", document_id),
            dimensions: 2,
            chunks: texts
                .iter()
                .enumerate()
                .map(|(i, t)| Chunk::new(document_id, i, t.to_string(), vec![i as f32, 1.0]))
                .collect(),
            metadata: BTreeMap::new(),
            ingested_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_reader_keeps_old_generation() {
        let store = MemoryStore::new();
        store.replace(collection(1, &["a", "b"])).await.unwrap();

        let before = store.load(1).await.unwrap().unwrap();
        store.replace(collection(1, &["c"])).await.unwrap();
        let after = store.load(1).await.unwrap().unwrap();

        assert_eq!(before.chunks.len(), 2);
        assert_eq!(after.chunks.len(), 1);
        assert_eq!(after.chunks[0].text, "c");
    }

    #[tokio::test]
    async fn test_remove_and_info() {
        let store = MemoryStore::new();
        assert!(store.info(1).await.unwrap().is_none());

        store.replace(collection(1, &["a"])).await.unwrap();
        let info = store.info(1).await.unwrap().unwrap();
        assert_eq!(info.chunk_count, 1);
        assert_eq!(store.len(), 1);

        assert!(store.remove(1).await.unwrap());
        assert!(!store.remove(1).await.unwrap());
        assert!(store.is_empty());
    }
}

//! Deterministic providers and configuration shared by unit tests

use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::{IndexBackend, RagConfig};
use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;

pub const TEST_DIMENSIONS: usize = 256;

/// In-memory configuration with one chunk per embedding batch
pub fn test_config() -> RagConfig {
    let mut config = RagConfig::default();
    config.index.backend = IndexBackend::Memory;
    config.index.collection_prefix = "documents".to_string();
    config.embeddings.dimensions = TEST_DIMENSIONS;
    config.embeddings.batch_size = 1;
    config.embeddings.concurrency = 1;
    config.usage.enabled = false;
    config
}

/// Hashed bag-of-words embedder: texts sharing words land close together
pub struct KeywordEmbedder {
    dimensions: usize,
}

impl KeywordEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            vector[(hasher.finish() % self.dimensions as u64) as usize] += 1.0;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vectorize(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

/// Embeds the first `fail_at` texts, then fails every call
pub struct FailingEmbedder {
    inner: KeywordEmbedder,
    fail_at: usize,
    calls: AtomicUsize,
}

impl FailingEmbedder {
    pub fn new(dimensions: usize, fail_at: usize) -> Self {
        Self {
            inner: KeywordEmbedder::new(dimensions),
            fail_at,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call >= self.fail_at {
            return Err(Error::embedding(format!("provider unavailable (call {})", call + 1)));
        }
        self.inner.embed_query(text).await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(false)
    }

    fn name(&self) -> &str {
        "failing"
    }
}

//! Vector search over embedded profile chunks
//!
//! `VectorStore` keeps the chunks and an HNSW index; `SemanticIndex`
//! pairs it with an `Embedder` so callers can search by text.

pub mod index;
pub mod store;

pub use index::{CosineDistance, VectorError, VectorIndex, VectorResult};
pub use store::{EmbeddedChunk, RetrievedChunk, VectorStore};

use crate::embed::{embed_one, Embedder};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Nearest-neighbour retrieval over profile chunks
#[async_trait]
pub trait VectorRetriever: Send + Sync {
    /// Embed `query` and return the `top_k` closest chunks
    async fn retrieve(&self, query: &str, top_k: usize) -> VectorResult<Vec<RetrievedChunk>>;

    /// Closest chunks to an already embedded vector
    async fn retrieve_by_vector(&self, vector: &[f32], top_k: usize) -> VectorResult<Vec<RetrievedChunk>>;

    /// Embedding of the first chunk stored for a person, if any
    async fn embedding_for(&self, name: &str) -> VectorResult<Option<Vec<f32>>>;
}

/// Embedder + vector store
#[derive(Clone)]
pub struct SemanticIndex {
    embedder: Arc<dyn Embedder>,
    store: Arc<RwLock<VectorStore>>,
}

impl std::fmt::Debug for SemanticIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticIndex").finish_non_exhaustive()
    }
}

impl SemanticIndex {
    pub fn new(embedder: Arc<dyn Embedder>, store: VectorStore) -> VectorResult<Self> {
        if embedder.dimensions() != store.dimensions() {
            return Err(VectorError::DimensionMismatch {
                expected: store.dimensions(),
                got: embedder.dimensions(),
            });
        }
        Ok(Self {
            embedder,
            store: Arc::new(RwLock::new(store)),
        })
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    pub fn store(&self) -> &Arc<RwLock<VectorStore>> {
        &self.store
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }
}

#[async_trait]
impl VectorRetriever for SemanticIndex {
    async fn retrieve(&self, query: &str, top_k: usize) -> VectorResult<Vec<RetrievedChunk>> {
        let vector = embed_one(self.embedder.as_ref(), query).await?;
        self.retrieve_by_vector(&vector, top_k).await
    }

    async fn retrieve_by_vector(&self, vector: &[f32], top_k: usize) -> VectorResult<Vec<RetrievedChunk>> {
        let hits = self.store.read().await.search(vector, top_k)?;
        debug!("vector search returned {} of top {}", hits.len(), top_k);
        Ok(hits)
    }

    async fn embedding_for(&self, name: &str) -> VectorResult<Option<Vec<f32>>> {
        Ok(self
            .store
            .read()
            .await
            .first_chunk_for(name)
            .map(|c| c.embedding.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::HashEmbedder;
    use std::collections::BTreeMap;

    async fn index_with(texts: &[(&str, &str)]) -> SemanticIndex {
        let embedder = HashEmbedder::new(128);
        let mut store = VectorStore::new(128);
        for (name, text) in texts {
            let mut metadata = BTreeMap::new();
            metadata.insert("name".to_string(), name.to_string());
            store
                .insert(EmbeddedChunk {
                    id: format!("{}#0", name),
                    text: text.to_string(),
                    metadata,
                    embedding: embedder.embed_text(text),
                })
                .unwrap();
        }
        SemanticIndex::new(Arc::new(embedder), store).unwrap()
    }

    #[tokio::test]
    async fn test_retrieve_by_text() {
        let index = index_with(&[
            ("Alice", "senior data scientist machine learning"),
            ("Bob", "pastry chef bakery croissant"),
        ])
        .await;

        let hits = index.retrieve("machine learning data scientist", 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name(), Some("Alice"));
        assert_eq!(index.len().await, 2);
    }

    #[tokio::test]
    async fn test_embedding_for_known_and_unknown() {
        let index = index_with(&[("Alice", "engineer")]).await;
        assert!(index.embedding_for("Alice").await.unwrap().is_some());
        assert!(index.embedding_for("Zed").await.unwrap().is_none());
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let result = SemanticIndex::new(Arc::new(HashEmbedder::new(8)), VectorStore::new(16));
        assert!(matches!(result, Err(VectorError::DimensionMismatch { expected: 16, got: 8 })));
    }
}

//! Chunk store with an HNSW index on top

use super::index::{VectorIndex, VectorResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A fragment of a profile text with its embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedChunk {
    /// `{person name}#{chunk number}`
    pub id: String,
    pub text: String,
    /// Copy of the owning person's fields (name, company, url, ...)
    pub metadata: BTreeMap<String, String>,
    pub embedding: Vec<f32>,
}

impl EmbeddedChunk {
    /// Name of the person this chunk belongs to
    pub fn name(&self) -> Option<&str> {
        self.metadata.get("name").map(String::as_str)
    }
}

/// A chunk returned by a similarity search
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub chunk: EmbeddedChunk,
    /// Similarity in [0, 1]; `None` when the engine reports no score
    pub score: Option<f64>,
}

impl RetrievedChunk {
    pub fn name(&self) -> Option<&str> {
        self.chunk.name()
    }
}

/// Owns every chunk plus the ANN index over their embeddings
#[derive(Debug)]
pub struct VectorStore {
    chunks: Vec<EmbeddedChunk>,
    index: VectorIndex,
}

impl VectorStore {
    pub fn new(dimensions: usize) -> Self {
        Self {
            chunks: Vec::new(),
            index: VectorIndex::new(dimensions),
        }
    }

    /// Rebuild a store (and its index) from persisted chunks
    pub fn from_chunks(dimensions: usize, chunks: Vec<EmbeddedChunk>) -> VectorResult<Self> {
        let mut store = Self {
            chunks: Vec::with_capacity(chunks.len()),
            index: VectorIndex::with_capacity(dimensions, chunks.len().max(100_000)),
        };
        for chunk in chunks {
            store.insert(chunk)?;
        }
        Ok(store)
    }

    /// Add a chunk; its embedding must have the store's dimensions
    pub fn insert(&mut self, chunk: EmbeddedChunk) -> VectorResult<()> {
        let slot = self.chunks.len();
        self.index.add(slot, &chunk.embedding)?;
        self.chunks.push(chunk);
        Ok(())
    }

    /// Top-k chunks by cosine similarity (`1 - distance`, clamped to [0,1])
    pub fn search(&self, query: &[f32], k: usize) -> VectorResult<Vec<RetrievedChunk>> {
        let neighbors = self.index.search(query, k)?;
        Ok(neighbors
            .into_iter()
            .filter_map(|(slot, distance)| {
                self.chunks.get(slot).map(|chunk| RetrievedChunk {
                    chunk: chunk.clone(),
                    score: Some((1.0 - f64::from(distance)).clamp(0.0, 1.0)),
                })
            })
            .collect())
    }

    /// First chunk indexed for a person
    pub fn first_chunk_for(&self, name: &str) -> Option<&EmbeddedChunk> {
        self.chunks.iter().find(|c| c.name() == Some(name))
    }

    pub fn chunks(&self) -> &[EmbeddedChunk] {
        &self.chunks
    }

    pub fn dimensions(&self) -> usize {
        self.index.dimensions()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

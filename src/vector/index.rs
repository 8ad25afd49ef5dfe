//! Vector index implementation using HNSW
//!
//! Thin wrapper around hnsw_rs. Points are keyed by their position in the
//! owning `VectorStore`.

use hnsw_rs::prelude::*;
use thiserror::Error;

/// Vector index errors
#[derive(Error, Debug)]
pub enum VectorError {
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Embedding error: {0}")]
    Embed(#[from] crate::embed::EmbedError),
}

pub type VectorResult<T> = Result<T, VectorError>;

/// Cosine distance implementation for hnsw_rs
#[derive(Clone, Copy, Debug, Default)]
pub struct CosineDistance;

impl Distance<f32> for CosineDistance {
    fn eval(&self, va: &[f32], vb: &[f32]) -> f32 {
        let mut dot = 0.0;
        let mut norm_a = 0.0;
        let mut norm_b = 0.0;

        for (a, b) in va.iter().zip(vb.iter()) {
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }

        if norm_a <= 0.0 || norm_b <= 0.0 {
            return 1.0;
        }

        // Cosine distance = 1.0 - cosine similarity, kept non-negative for hnsw
        (1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())).max(0.0)
    }
}

/// Minimum candidate list size during search
const MIN_EF_SEARCH: usize = 64;

/// Wrapper around HNSW index
pub struct VectorIndex {
    dimensions: usize,
    len: usize,
    hnsw: Hnsw<'static, f32, CosineDistance>,
}

// Hnsw doesn't implement Debug
impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("dimensions", &self.dimensions)
            .field("len", &self.len)
            .finish()
    }
}

impl VectorIndex {
    pub fn new(dimensions: usize) -> Self {
        Self::with_capacity(dimensions, 100_000)
    }

    pub fn with_capacity(dimensions: usize, max_elements: usize) -> Self {
        let m = 16;
        let ef_construction = 200;
        let hnsw = Hnsw::new(m, max_elements.max(1), 16, ef_construction, CosineDistance);

        Self {
            dimensions,
            len: 0,
            hnsw,
        }
    }

    /// Add a vector under `id`
    pub fn add(&mut self, id: usize, vector: &Vec<f32>) -> VectorResult<()> {
        self.check_dimensions(vector.len())?;
        self.hnsw.insert((vector, id));
        self.len += 1;
        Ok(())
    }

    /// Nearest neighbours as `(id, cosine distance)`, closest first
    pub fn search(&self, query: &[f32], k: usize) -> VectorResult<Vec<(usize, f32)>> {
        self.check_dimensions(query.len())?;
        if self.len == 0 || k == 0 {
            return Ok(Vec::new());
        }

        let k = k.min(self.len);
        let ef_search = (k * 2).max(MIN_EF_SEARCH);
        let mut neighbors: Vec<(usize, f32)> = self
            .hnsw
            .search(query, k, ef_search)
            .into_iter()
            .map(|n| (n.d_id, n.distance))
            .collect();
        neighbors.sort_by(|a, b| a.1.total_cmp(&b.1));
        Ok(neighbors)
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn check_dimensions(&self, got: usize) -> VectorResult<()> {
        if got != self.dimensions {
            return Err(VectorError::DimensionMismatch {
                expected: self.dimensions,
                got,
            });
        }
        Ok(())
    }
}

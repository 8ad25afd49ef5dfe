//! Snapshot persistence
//!
//! A snapshot directory holds:
//! - `graph.bin`     the `GraphStore` (bincode)
//! - `vectors.bin`   the embedded chunks (bincode)
//! - `manifest.json` counts, embedding model and dimensions
//!
//! The HNSW index is not written; it is rebuilt from the chunks on load.

use crate::client::EmbeddedGraph;
use crate::embed::Embedder;
use crate::graph::GraphStore;
use crate::vector::{EmbeddedChunk, SemanticIndex, VectorError, VectorStore};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

const GRAPH_FILE: &str = "graph.bin";
const VECTORS_FILE: &str = "vectors.bin";
const MANIFEST_FILE: &str = "manifest.json";
const FORMAT_VERSION: u32 = 1;

/// Persistence errors
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Snapshot not found: {0}")]
    NotFound(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Manifest error: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("Unsupported snapshot format version {0}")]
    UnsupportedVersion(u32),

    #[error("Snapshot was built with {snapshot}-dimensional embeddings, embedder produces {embedder}")]
    DimensionMismatch { snapshot: usize, embedder: usize },

    #[error("Vector index rebuild failed: {0}")]
    Vector(#[from] VectorError),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotManifest {
    pub format_version: u32,
    /// RFC 3339 timestamp
    pub created_at: String,
    pub node_count: usize,
    pub edge_count: usize,
    pub chunk_count: usize,
    pub embedding_model: String,
    pub dimensions: usize,
}

/// Both indexes, detached from any running client
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub manifest: SnapshotManifest,
    pub graph: GraphStore,
    pub chunks: Vec<EmbeddedChunk>,
}

impl Snapshot {
    /// Copy the current state of a graph and a semantic index
    pub async fn capture(graph: &EmbeddedGraph, index: &SemanticIndex) -> Self {
        let graph = graph.store_read().await.clone();
        let (chunks, dimensions) = {
            let store = index.store().read().await;
            (store.chunks().to_vec(), store.dimensions())
        };

        Self {
            manifest: SnapshotManifest {
                format_version: FORMAT_VERSION,
                created_at: chrono::Utc::now().to_rfc3339(),
                node_count: graph.node_count(),
                edge_count: graph.edge_count(),
                chunk_count: chunks.len(),
                embedding_model: index.embedder().model_name(),
                dimensions,
            },
            graph,
            chunks,
        }
    }

    /// Write the snapshot into `dir`, creating it if needed
    pub fn save(&self, dir: &Path) -> PersistenceResult<()> {
        std::fs::create_dir_all(dir).map_err(|source| io_error(dir, source))?;

        write_file(&dir.join(GRAPH_FILE), &bincode::serialize(&self.graph)?)?;
        write_file(&dir.join(VECTORS_FILE), &bincode::serialize(&self.chunks)?)?;
        write_file(&dir.join(MANIFEST_FILE), serde_json::to_string_pretty(&self.manifest)?.as_bytes())?;

        info!(
            "Saved snapshot to {}: {} nodes, {} edges, {} chunks",
            dir.display(),
            self.manifest.node_count,
            self.manifest.edge_count,
            self.manifest.chunk_count
        );
        Ok(())
    }

    /// Read a snapshot written by `save`
    pub fn load(dir: &Path) -> PersistenceResult<Self> {
        let manifest = Self::read_manifest(dir)?;
        if manifest.format_version != FORMAT_VERSION {
            return Err(PersistenceError::UnsupportedVersion(manifest.format_version));
        }

        let graph: GraphStore = bincode::deserialize(&read_file(&dir.join(GRAPH_FILE))?)?;
        let chunks: Vec<EmbeddedChunk> = bincode::deserialize(&read_file(&dir.join(VECTORS_FILE))?)?;

        info!(
            "Loaded snapshot from {}: {} nodes, {} chunks",
            dir.display(),
            graph.node_count(),
            chunks.len()
        );
        Ok(Self { manifest, graph, chunks })
    }

    /// Only the manifest, for cheap status reporting
    pub fn read_manifest(dir: &Path) -> PersistenceResult<SnapshotManifest> {
        let bytes = read_file(&dir.join(MANIFEST_FILE))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Rebuild live indexes; the embedder must match the snapshot's dimensions
    pub fn into_indexes(self, embedder: Arc<dyn Embedder>) -> PersistenceResult<(EmbeddedGraph, SemanticIndex)> {
        if embedder.dimensions() != self.manifest.dimensions {
            return Err(PersistenceError::DimensionMismatch {
                snapshot: self.manifest.dimensions,
                embedder: embedder.dimensions(),
            });
        }
        let store = VectorStore::from_chunks(self.manifest.dimensions, self.chunks)?;
        let index = SemanticIndex::new(embedder, store)?;
        Ok((EmbeddedGraph::from_store(self.graph), index))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> PersistenceError {
    if source.kind() == std::io::ErrorKind::NotFound {
        PersistenceError::NotFound(path.to_path_buf())
    } else {
        PersistenceError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

fn read_file(path: &Path) -> PersistenceResult<Vec<u8>> {
    std::fs::read(path).map_err(|source| io_error(path, source))
}

fn write_file(path: &Path, bytes: &[u8]) -> PersistenceResult<()> {
    std::fs::write(path, bytes).map_err(|source| io_error(path, source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::HashEmbedder;

    #[test]
    fn test_missing_dir_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nothing-here");
        assert!(matches!(Snapshot::load(&missing), Err(PersistenceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_dimension_mismatch_on_restore() {
        let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(8));
        let index = SemanticIndex::new(embedder, VectorStore::new(8)).unwrap();
        let snapshot = Snapshot::capture(&EmbeddedGraph::new(), &index).await;

        let dir = tempfile::tempdir().unwrap();
        snapshot.save(dir.path()).unwrap();
        let loaded = Snapshot::load(dir.path()).unwrap();
        assert_eq!(loaded.manifest.embedding_model, "hash-8");

        let err = loaded.into_indexes(Arc::new(HashEmbedder::new(16))).unwrap_err();
        assert!(matches!(err, PersistenceError::DimensionMismatch { snapshot: 8, embedder: 16 }));
    }
}

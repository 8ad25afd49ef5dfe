//! Ingestion: CSV export -> documents -> graph + vector index

pub mod indexer;
pub mod loader;
pub mod projector;

pub use indexer::VectorIndexer;
pub use loader::{load_connections, parse_connections, ConnectionDocument};
pub use projector::{GraphProjector, ProjectionSummary};

use crate::client::{EmbeddedGraph, GraphClientError};
use crate::config::AnalyzerConfig;
use crate::embed::{EmbedError, Embedder};
use crate::vector::{SemanticIndex, VectorError, VectorStore};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing required column '{0}'")]
    MissingColumn(String),

    #[error("Malformed row at line {line}: {reason}")]
    MalformedRow { line: u64, reason: String },

    #[error("Graph projection failed: {0}")]
    Projection(#[from] GraphClientError),

    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbedError),

    #[error("Vector indexing failed: {0}")]
    Vector(#[from] VectorError),
}

pub type IngestResult<T> = Result<T, IngestError>;

/// Counts from one ingestion run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub documents: usize,
    pub projection: ProjectionSummary,
    pub chunks: usize,
}

/// Freshly built indexes
pub struct IngestOutput {
    pub graph: EmbeddedGraph,
    pub index: SemanticIndex,
    pub report: IngestReport,
}

impl std::fmt::Debug for IngestOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestOutput")
            .field("report", &self.report)
            .finish_non_exhaustive()
    }
}

/// Runs the load, project and index stages as one batch
pub struct Ingestor {
    config: AnalyzerConfig,
    embedder: Arc<dyn Embedder>,
}

impl Ingestor {
    pub fn new(config: AnalyzerConfig, embedder: Arc<dyn Embedder>) -> Self {
        Self { config, embedder }
    }

    /// Ingest a CSV export from disk into new in-memory indexes
    pub async fn ingest_file(&self, path: &Path) -> IngestResult<IngestOutput> {
        let documents = load_connections(path)?;
        self.ingest_documents(&documents).await
    }

    /// Project and index already loaded documents into new in-memory indexes
    pub async fn ingest_documents(&self, documents: &[ConnectionDocument]) -> IngestResult<IngestOutput> {
        let graph = EmbeddedGraph::new();
        let projection = GraphProjector::new(&graph).project(documents).await?;

        let mut store = VectorStore::new(self.embedder.dimensions());
        let indexer = VectorIndexer::new(
            self.embedder.clone(),
            self.config.chunking,
            self.config.embedding.batch_size,
        );
        let chunks = indexer.index(documents, &mut store).await?;
        let index = SemanticIndex::new(self.embedder.clone(), store)?;

        Ok(IngestOutput {
            graph,
            index,
            report: IngestReport {
                documents: documents.len(),
                projection,
                chunks,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::GraphClient;
    use crate::embed::HashEmbedder;
    use std::io::Write;

    #[tokio::test]
    async fn test_ingest_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "First Name,Last Name,Company,URL,Connected On").unwrap();
        writeln!(file, "Alice,Smith,Acme,https://x/alice,2023-02-01").unwrap();
        writeln!(file, "Bob,Jones,Acme,https://x/bob,2022-05-01").unwrap();

        let ingestor = Ingestor::new(AnalyzerConfig::default(), Arc::new(HashEmbedder::new(384)));
        let output = ingestor.ingest_file(file.path()).await.unwrap();

        assert_eq!(output.report.documents, 2);
        assert_eq!(output.report.projection.nodes_created, 3);
        assert_eq!(output.report.chunks, 2);
        assert_eq!(output.index.len().await, 2);
        assert_eq!(output.graph.stats().await.unwrap().edge_count, 2);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let ingestor = Ingestor::new(AnalyzerConfig::default(), Arc::new(HashEmbedder::new(8)));
        let err = ingestor.ingest_file(Path::new("/nonexistent/connections.csv")).await;
        assert!(matches!(err, Err(IngestError::Io { .. })));
    }
}

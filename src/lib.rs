//! LinkGraph
//!
//! Hybrid graph + vector analysis of an exported professional connection
//! list. One CSV export is projected into two indexes:
//!
//! - a property graph of `Person` and `Company` nodes joined by `WORKS_AT`
//!   edges, queried with a small OpenCypher subset
//! - a semantic index of embedded profile text, searched with HNSW
//!
//! Retrieval runs a structured query and a semantic query for the same
//! criteria and fuses both into one ranked list of connections.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use linkgraph::{AnalyzerConfig, ConnectionAnalyzer, Criteria, HashEmbedder, Ingestor};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AnalyzerConfig::default();
//! let embedder = Arc::new(HashEmbedder::new(config.embedding.dimensions));
//!
//! let output = Ingestor::new(config.clone(), embedder)
//!     .ingest_file("Connections.csv".as_ref())
//!     .await?;
//!
//! let analyzer = ConnectionAnalyzer::new(
//!     Arc::new(output.graph),
//!     Arc::new(output.index),
//!     config.retrieval.clone(),
//! );
//! let ranked = analyzer
//!     .find_interesting_connections(&Criteria::new().with_company("Acme"))
//!     .await?;
//! for connection in ranked {
//!     println!("{} {:.2}", connection.name, connection.score);
//! }
//! # Ok(())
//! # }
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod analyzer;
pub mod client;
pub mod config;
pub mod embed;
pub mod graph;
pub mod index;
pub mod ingest;
pub mod persistence;
pub mod query;
pub mod vector;

// Re-export main types for convenience
pub use graph::{
    Edge, EdgeId, EdgeType, GraphError, GraphResult, GraphStatistics, GraphStore, Label, Node, NodeId,
    PropertyMap, PropertyValue,
};

pub use query::{parse_query, Params, Query, QueryEngine, QueryError, RecordBatch};

pub use client::{EmbeddedGraph, GraphClient, GraphClientError, GraphClientResult};

pub use config::{AnalyzerConfig, ConfigError, EmbeddingProvider};

pub use embed::{build_embedder, EmbedError, Embedder, EmbeddingClient, HashEmbedder};

pub use vector::{SemanticIndex, VectorError, VectorRetriever, VectorStore};

pub use ingest::{ConnectionDocument, IngestError, IngestReport, Ingestor};

pub use persistence::{PersistenceError, PersistenceResult, Snapshot, SnapshotManifest};

pub use analyzer::{
    AnalyzerError, AnalyzerResult, ConnectionAnalyzer, ConnectionDetails, Criteria, RankedConnection,
    SimilarProfile,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}

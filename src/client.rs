//! GraphClient trait and the in-process implementation
//!
//! Everything above the store (projector, analyzer, CLI) talks to the
//! graph through `GraphClient`, with values always passed as parameters.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use crate::graph::{GraphStatistics, GraphStore};
use crate::query::{Params, QueryEngine, QueryError, RecordBatch};

/// Errors surfaced by a graph client
#[derive(Error, Debug)]
pub enum GraphClientError {
    /// Query parsing or execution error
    #[error("Query error: {0}")]
    QueryError(#[from] QueryError),

    /// The backing store cannot be reached
    #[error("Graph store unavailable: {0}")]
    Unavailable(String),
}

pub type GraphClientResult<T> = Result<T, GraphClientError>;

/// Unified client interface for the connection graph.
#[async_trait]
pub trait GraphClient: Send + Sync {
    /// Execute a parameterized Cypher statement (read or write)
    async fn query(&self, cypher: &str, params: &Params) -> GraphClientResult<RecordBatch>;

    /// Node/edge counts
    async fn stats(&self) -> GraphClientResult<GraphStatistics>;
}

/// In-process client that wraps a GraphStore directly.
#[derive(Clone)]
pub struct EmbeddedGraph {
    store: Arc<RwLock<GraphStore>>,
}

impl std::fmt::Debug for EmbeddedGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddedGraph").finish_non_exhaustive()
    }
}

impl EmbeddedGraph {
    /// Create a client over a fresh empty graph store
    pub fn new() -> Self {
        Self::with_store(Arc::new(RwLock::new(GraphStore::new())))
    }

    /// Create a client wrapping an existing store
    pub fn with_store(store: Arc<RwLock<GraphStore>>) -> Self {
        Self { store }
    }

    /// Create a client that takes ownership of a loaded store
    pub fn from_store(store: GraphStore) -> Self {
        Self::with_store(Arc::new(RwLock::new(store)))
    }

    pub fn store(&self) -> &Arc<RwLock<GraphStore>> {
        &self.store
    }

    /// Acquire a read lock on the store.
    pub async fn store_read(&self) -> tokio::sync::RwLockReadGuard<'_, GraphStore> {
        self.store.read().await
    }

    /// Acquire a write lock on the store.
    pub async fn store_write(&self) -> tokio::sync::RwLockWriteGuard<'_, GraphStore> {
        self.store.write().await
    }
}

impl Default for EmbeddedGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GraphClient for EmbeddedGraph {
    async fn query(&self, cypher: &str, params: &Params) -> GraphClientResult<RecordBatch> {
        let engine = QueryEngine::new();
        let query = engine.parse(cypher)?;
        debug!("query ({} params): {}", params.len(), cypher.split_whitespace().collect::<Vec<_>>().join(" "));

        let batch = if query.is_read_only() {
            engine.run(&query, params, &*self.store.read().await)?
        } else {
            engine.run_mut(&query, params, &mut *self.store.write().await)?
        };

        debug!("query returned {} rows", batch.len());
        Ok(batch)
    }

    async fn stats(&self) -> GraphClientResult<GraphStatistics> {
        Ok(self.store.read().await.statistics())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::PropertyValue;

    #[tokio::test]
    async fn test_embedded_graph_routes_reads_and_writes() {
        let client = EmbeddedGraph::new();
        let mut params = Params::new();
        params.insert("name".to_string(), "Alice".into());
        params.insert("company".to_string(), "Acme".into());

        let write = client
            .query(
                "MERGE (c:Company {name: $company}) MERGE (p:Person {name: $name}) MERGE (p)-[:WORKS_AT]->(c)",
                &params,
            )
            .await
            .unwrap();
        assert_eq!(write.stats.edges_created, 1);

        let read = client
            .query("MATCH (p:Person)-[:WORKS_AT]->(c:Company) RETURN p.name AS name, c.name AS company", &params)
            .await
            .unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read.records[0].get_str("company"), Some("Acme"));

        let stats = client.stats().await.unwrap();
        assert_eq!(stats.node_count, 2);
        assert_eq!(stats.edge_count, 1);
    }

    #[tokio::test]
    async fn test_quoted_parameter_is_literal() {
        let client = EmbeddedGraph::new();
        let mut params = Params::new();
        params.insert("name".to_string(), PropertyValue::from("O'Brien\") RETURN 1 //"));
        client.query("MERGE (p:Person {name: $name})", &params).await.unwrap();

        let batch = client
            .query("MATCH (p:Person {name: $name}) RETURN p.name AS name", &params)
            .await
            .unwrap();
        assert_eq!(batch.records[0].get_str("name"), Some("O'Brien\") RETURN 1 //"));
    }

    #[tokio::test]
    async fn test_parse_error_surfaces() {
        let client = EmbeddedGraph::new();
        let err = client.query("MATCH (p", &Params::new()).await.unwrap_err();
        assert!(matches!(err, GraphClientError::QueryError(QueryError::Parse(_))));
    }
}

//! Hybrid retrieval over the connection graph and the semantic index
//!
//! A query runs two independent paths:
//! - structured: a parameterized MATCH built from the criteria
//! - semantic: a nearest-neighbour search for a sentence built from them
//!
//! and `rank::fuse` merges both into one ranked list.

pub mod criteria;
pub mod rank;

pub use criteria::Criteria;
pub use rank::{fuse, RankedConnection, SemanticMatch, StructuredMatch};

use crate::client::{GraphClient, GraphClientError};
use crate::config::{AnalyzerConfig, RetrievalConfig};
use crate::embed::{build_embedder, EmbedError};
use crate::graph::{Edge, Node, PropertyValue};
use crate::persistence::{PersistenceError, Snapshot};
use crate::query::{Params, QueryError, Record};
use crate::vector::{VectorError, VectorRetriever};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// An index cannot be reached or has not been built
    #[error("Index unavailable: {0}")]
    Unavailable(String),

    #[error("Graph query failed: {0}")]
    Query(#[from] QueryError),

    #[error("Semantic search failed: {0}")]
    Vector(VectorError),

    #[error("Snapshot error: {0}")]
    Persistence(PersistenceError),

    #[error("Embedding setup failed: {0}")]
    Embedding(EmbedError),
}

pub type AnalyzerResult<T> = Result<T, AnalyzerError>;

impl From<GraphClientError> for AnalyzerError {
    fn from(err: GraphClientError) -> Self {
        match err {
            GraphClientError::Unavailable(msg) => AnalyzerError::Unavailable(msg),
            GraphClientError::QueryError(e) => AnalyzerError::Query(e),
        }
    }
}

impl From<VectorError> for AnalyzerError {
    fn from(err: VectorError) -> Self {
        match err {
            VectorError::Embed(EmbedError::NetworkError(msg)) => {
                AnalyzerError::Unavailable(format!("embedding service: {}", msg))
            }
            other => AnalyzerError::Vector(other),
        }
    }
}

impl From<PersistenceError> for AnalyzerError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::NotFound(path) => {
                AnalyzerError::Unavailable(format!("no snapshot at {} (run ingest first)", path.display()))
            }
            other => AnalyzerError::Persistence(other),
        }
    }
}

impl From<EmbedError> for AnalyzerError {
    fn from(err: EmbedError) -> Self {
        match err {
            EmbedError::NetworkError(msg) => AnalyzerError::Unavailable(format!("embedding service: {}", msg)),
            other => AnalyzerError::Embedding(other),
        }
    }
}

/// An outgoing relationship of a person
#[derive(Debug, Clone)]
pub struct Relationship {
    pub edge: Edge,
    pub target: Node,
}

/// A semantically similar profile
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarProfile {
    pub name: String,
    pub company: String,
    pub similarity: Option<f64>,
}

/// Everything known about one person
#[derive(Debug, Clone)]
pub struct ConnectionDetails {
    pub person: Node,
    pub relationships: Vec<Relationship>,
    pub similar_profiles: Vec<SimilarProfile>,
}

impl ConnectionDetails {
    pub fn name(&self) -> &str {
        self.person.get_str("name").unwrap_or_default()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "person": self.person.to_json(),
            "relationships": self.relationships.iter().map(|r| serde_json::json!({
                "type": r.edge.edge_type.as_str(),
                "target": r.target.to_json(),
            })).collect::<Vec<_>>(),
            "similar_profiles": self.similar_profiles,
        })
    }
}

/// Answers retrieval queries against a graph and a semantic index
pub struct ConnectionAnalyzer {
    graph: Arc<dyn GraphClient>,
    vectors: Arc<dyn VectorRetriever>,
    config: RetrievalConfig,
}

impl ConnectionAnalyzer {
    pub fn new(graph: Arc<dyn GraphClient>, vectors: Arc<dyn VectorRetriever>, config: RetrievalConfig) -> Self {
        Self { graph, vectors, config }
    }

    /// Open the snapshot in `config.data_dir`
    pub fn open(config: &AnalyzerConfig) -> AnalyzerResult<Self> {
        let embedder = build_embedder(&config.embedding)?;
        let (graph, index) = Snapshot::load(&config.data_dir)?.into_indexes(embedder)?;
        Ok(Self::new(Arc::new(graph), Arc::new(index), config.retrieval.clone()))
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Ranked connections matching `criteria`
    pub async fn find_interesting_connections(&self, criteria: &Criteria) -> AnalyzerResult<Vec<RankedConnection>> {
        let structured = self.structured_matches(criteria).await?;
        let semantic = self.semantic_matches(criteria).await?;
        let ranked = fuse(&structured, &semantic, criteria, &self.config);
        debug!(
            "{} structured rows + {} semantic hits -> {} ranked",
            structured.len(),
            semantic.len(),
            ranked.len()
        );
        Ok(ranked)
    }

    /// Every (Person, Company) row passing the criteria filters
    pub async fn structured_matches(&self, criteria: &Criteria) -> AnalyzerResult<Vec<StructuredMatch>> {
        let (query, params) = criteria.graph_query();
        let batch = self.graph.query(&query, &params).await?;

        Ok(batch
            .records
            .iter()
            .filter_map(|record| {
                Some(StructuredMatch {
                    name: record.get_str("name")?.to_string(),
                    title: column(record, "title"),
                    company: column(record, "company"),
                    industry: column(record, "industry"),
                })
            })
            .collect())
    }

    /// Nearest chunks to the criteria sentence; cutoff is applied by `fuse`
    pub async fn semantic_matches(&self, criteria: &Criteria) -> AnalyzerResult<Vec<SemanticMatch>> {
        let sentence = criteria.semantic_query();
        let hits = self.vectors.retrieve(&sentence, self.config.similarity_top_k).await?;
        Ok(hits
            .into_iter()
            .filter_map(|hit| {
                Some(SemanticMatch {
                    name: hit.name()?.to_string(),
                    score: hit.score,
                })
            })
            .collect())
    }

    /// The person, their outgoing relationships and similar profiles.
    /// `Ok(None)` when no person has that name.
    pub async fn get_connection_details(&self, name: &str) -> AnalyzerResult<Option<ConnectionDetails>> {
        let mut params = Params::new();
        params.insert("name".to_string(), PropertyValue::from(name));

        let found = self
            .graph
            .query("MATCH (p:Person {name: $name}) RETURN p", &params)
            .await?;
        let Some(person) = found
            .records
            .first()
            .and_then(|r| r.get("p"))
            .and_then(|v| v.as_node())
            .map(|(_, node)| node.clone())
        else {
            return Ok(None);
        };

        let neighbourhood = self
            .graph
            .query("MATCH (p:Person {name: $name})-[r]->(c) RETURN r, c", &params)
            .await?;
        let relationships = neighbourhood
            .records
            .iter()
            .filter_map(|record| {
                let edge = record.get("r")?.as_edge()?.1.clone();
                let target = record.get("c")?.as_node()?.1.clone();
                Some(Relationship { edge, target })
            })
            .collect();

        let similar_profiles = self.similar_profiles(name).await?;

        Ok(Some(ConnectionDetails {
            person,
            relationships,
            similar_profiles,
        }))
    }

    async fn similar_profiles(&self, name: &str) -> AnalyzerResult<Vec<SimilarProfile>> {
        let hits = match self.vectors.embedding_for(name).await? {
            Some(vector) => self.vectors.retrieve_by_vector(&vector, self.config.similarity_top_k).await?,
            None => {
                self.vectors
                    .retrieve(&format!("Find professionals similar to {}", name), self.config.similarity_top_k)
                    .await?
            }
        };

        let mut seen = HashSet::new();
        let profiles: Vec<SimilarProfile> = hits
            .into_iter()
            .filter_map(|hit| {
                let other = hit.name()?.to_string();
                if other == name || !seen.insert(other.clone()) {
                    return None;
                }
                Some(SimilarProfile {
                    company: hit.chunk.metadata.get("company").cloned().unwrap_or_default(),
                    name: other,
                    similarity: hit.score,
                })
            })
            .take(self.config.detail_top_k)
            .collect();
        debug!("{} similar profiles for {}", profiles.len(), name);
        Ok(profiles)
    }
}

fn column(record: &Record, name: &str) -> Option<String> {
    record.get_str(name).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::EmbeddedGraph;
    use crate::vector::{EmbeddedChunk, RetrievedChunk, VectorResult};
    use async_trait::async_trait;
    use std::collections::BTreeMap;

    /// Returns the same canned hits for every query
    struct FixedRetriever {
        hits: Vec<(String, Option<f64>)>,
    }

    #[async_trait]
    impl VectorRetriever for FixedRetriever {
        async fn retrieve(&self, _query: &str, top_k: usize) -> VectorResult<Vec<RetrievedChunk>> {
            Ok(self
                .hits
                .iter()
                .take(top_k)
                .map(|(name, score)| {
                    let mut metadata = BTreeMap::new();
                    metadata.insert("name".to_string(), name.clone());
                    RetrievedChunk {
                        chunk: EmbeddedChunk {
                            id: format!("{}#0", name),
                            text: String::new(),
                            metadata,
                            embedding: Vec::new(),
                        },
                        score: *score,
                    }
                })
                .collect())
        }

        async fn retrieve_by_vector(&self, _vector: &[f32], top_k: usize) -> VectorResult<Vec<RetrievedChunk>> {
            self.retrieve("", top_k).await
        }

        async fn embedding_for(&self, _name: &str) -> VectorResult<Option<Vec<f32>>> {
            Ok(None)
        }
    }

    async fn graph_with(rows: &[(&str, &str, &str)]) -> Arc<EmbeddedGraph> {
        let graph = EmbeddedGraph::new();
        for (name, company, connected_on) in rows {
            let mut params = Params::new();
            params.insert("name".to_string(), (*name).into());
            params.insert("company".to_string(), (*company).into());
            params.insert("connected_on".to_string(), (*connected_on).into());
            graph
                .query(
                    "MERGE (c:Company {name: $company}) MERGE (p:Person {name: $name}) SET p.connected_on = $connected_on MERGE (p)-[:WORKS_AT]->(c)",
                    &params,
                )
                .await
                .unwrap();
        }
        Arc::new(graph)
    }

    fn analyzer(graph: Arc<EmbeddedGraph>, hits: &[(&str, Option<f64>)]) -> ConnectionAnalyzer {
        let retriever = FixedRetriever {
            hits: hits.iter().map(|(n, s)| (n.to_string(), *s)).collect(),
        };
        ConnectionAnalyzer::new(graph, Arc::new(retriever), RetrievalConfig::default())
    }

    #[tokio::test]
    async fn test_person_in_both_paths() {
        let graph = graph_with(&[("Alice", "Acme", "2023-02-01"), ("Bob", "Initech", "2022-05-01")]).await;
        let analyzer = analyzer(graph, &[("Alice", Some(0.9)), ("Carol", Some(0.8)), ("Dan", Some(0.69))]);

        let ranked = analyzer
            .find_interesting_connections(&Criteria::new().with_company("Acme"))
            .await
            .unwrap();
        let names: Vec<&str> = ranked.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Carol"]);
        assert!((ranked[0].score - 1.9).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_no_criteria_returns_everyone() {
        let graph = graph_with(&[("Alice", "Acme", "2023-02-01"), ("Bob", "Initech", "2022-05-01")]).await;
        let analyzer = analyzer(graph, &[]);
        let rows = analyzer.structured_matches(&Criteria::new()).await.unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_details_not_found_vs_no_similar() {
        let graph = graph_with(&[("Alice", "Acme", "2023-02-01")]).await;
        let analyzer = analyzer(graph, &[("Alice", Some(0.99))]);

        assert!(analyzer.get_connection_details("Nobody").await.unwrap().is_none());

        let details = analyzer.get_connection_details("Alice").await.unwrap().unwrap();
        assert_eq!(details.name(), "Alice");
        assert_eq!(details.relationships.len(), 1);
        assert_eq!(details.relationships[0].target.get_str("name"), Some("Acme"));
        assert!(details.similar_profiles.is_empty());
    }

    #[tokio::test]
    async fn test_similar_profiles_dedup_and_limit() {
        let graph = graph_with(&[("Alice", "Acme", "2023-02-01")]).await;
        let hits: Vec<(&str, Option<f64>)> = vec![
            ("Alice", Some(1.0)),
            ("Bob", Some(0.4)),
            ("Bob", Some(0.3)),
            ("Carol", None),
            ("Dan", Some(0.2)),
            ("Eve", Some(0.1)),
            ("Frank", Some(0.05)),
            ("Grace", Some(0.01)),
        ];
        let analyzer = analyzer(graph, &hits);

        let details = analyzer.get_connection_details("Alice").await.unwrap().unwrap();
        let names: Vec<&str> = details.similar_profiles.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Bob", "Carol", "Dan", "Eve", "Frank"]);
        assert_eq!(details.similar_profiles[0].similarity, Some(0.4));
    }

    #[test]
    fn test_missing_snapshot_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let config = AnalyzerConfig {
            data_dir: dir.path().join("absent"),
            ..AnalyzerConfig::default()
        };
        assert!(matches!(ConnectionAnalyzer::open(&config), Err(AnalyzerError::Unavailable(_))));
    }
}

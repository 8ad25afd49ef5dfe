//! Structured + semantic retrieval fused into one ranking

use async_trait::async_trait;
use linkgraph::config::RetrievalConfig;
use linkgraph::ingest::{parse_connections, Ingestor};
use linkgraph::vector::{EmbeddedChunk, RetrievedChunk, VectorResult, VectorRetriever};
use linkgraph::{
    AnalyzerConfig, AnalyzerError, ConnectionAnalyzer, Criteria, EmbedError, EmbeddedGraph, HashEmbedder, VectorError,
};
use std::collections::BTreeMap;
use std::sync::Arc;

const EXPORT: &str = "First Name,Last Name,Company,URL,Connected On,Position,Industry\n\
Alice,Smith,Acme,https://x/alice,2023-02-01,Senior Engineer,Software\n\
Bob,Jones,Acme Labs,https://x/bob,2022-05-01,Engineer,Software Services\n\
Carol,White,Initech,https://x/carol,2023-06-10,Senior Analyst,Finance\n";

/// Semantic side with fixed scores, so fusion is fully predictable
struct ScriptedRetriever {
    hits: Vec<(&'static str, Option<f64>)>,
}

fn chunk(name: &str, score: Option<f64>) -> RetrievedChunk {
    let mut metadata = BTreeMap::new();
    metadata.insert("name".to_string(), name.to_string());
    metadata.insert("company".to_string(), "Acme".to_string());
    RetrievedChunk {
        chunk: EmbeddedChunk {
            id: format!("{}#0", name),
            text: format!("Name: {}", name),
            metadata,
            embedding: vec![0.0; 4],
        },
        score,
    }
}

#[async_trait]
impl VectorRetriever for ScriptedRetriever {
    async fn retrieve(&self, _query: &str, top_k: usize) -> VectorResult<Vec<RetrievedChunk>> {
        Ok(self.hits.iter().take(top_k).map(|(n, s)| chunk(n, *s)).collect())
    }

    async fn retrieve_by_vector(&self, _vector: &[f32], top_k: usize) -> VectorResult<Vec<RetrievedChunk>> {
        self.retrieve("", top_k).await
    }

    async fn embedding_for(&self, _name: &str) -> VectorResult<Option<Vec<f32>>> {
        Ok(Some(vec![0.0; 4]))
    }
}

/// Embedding service that refuses every connection
struct RefusingRetriever;

fn refused<T>() -> VectorResult<T> {
    Err(VectorError::Embed(EmbedError::NetworkError("connection refused".to_string())))
}

#[async_trait]
impl VectorRetriever for RefusingRetriever {
    async fn retrieve(&self, _query: &str, _top_k: usize) -> VectorResult<Vec<RetrievedChunk>> {
        refused()
    }

    async fn retrieve_by_vector(&self, _vector: &[f32], _top_k: usize) -> VectorResult<Vec<RetrievedChunk>> {
        refused()
    }

    async fn embedding_for(&self, _name: &str) -> VectorResult<Option<Vec<f32>>> {
        refused()
    }
}

async fn graph() -> EmbeddedGraph {
    let documents = parse_connections(EXPORT).unwrap();
    let ingestor = Ingestor::new(AnalyzerConfig::default(), Arc::new(HashEmbedder::new(64)));
    ingestor.ingest_documents(&documents).await.unwrap().graph
}

async fn scripted(hits: Vec<(&'static str, Option<f64>)>) -> ConnectionAnalyzer {
    ConnectionAnalyzer::new(
        Arc::new(graph().await),
        Arc::new(ScriptedRetriever { hits }),
        RetrievalConfig::default(),
    )
}

fn score_of(ranked: &[linkgraph::RankedConnection], name: &str) -> Option<f64> {
    ranked.iter().find(|r| r.name == name).map(|r| r.score)
}

#[tokio::test]
async fn test_end_to_end_with_local_embeddings() {
    let config = AnalyzerConfig::default();
    let documents = parse_connections(EXPORT).unwrap();
    let output = Ingestor::new(config.clone(), Arc::new(HashEmbedder::new(config.embedding.dimensions)))
        .ingest_documents(&documents)
        .await
        .unwrap();
    let analyzer = ConnectionAnalyzer::new(Arc::new(output.graph), Arc::new(output.index), config.retrieval);

    let criteria = Criteria::new().with_company("Acme").with_connected_after("2023-01-01");
    let ranked = analyzer.find_interesting_connections(&criteria).await.unwrap();

    // the criteria sentence shares no words with any profile, so nothing
    // clears the similarity cutoff and only the structured row counts
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].name, "Alice Smith");
    assert_eq!(ranked[0].score, 1.0);
}

#[tokio::test]
async fn test_both_paths_add_up() {
    let analyzer = scripted(vec![("Alice Smith", Some(0.8)), ("Dana Grey", Some(0.75))]).await;
    let ranked = analyzer
        .find_interesting_connections(&Criteria::new().with_company("Acme"))
        .await
        .unwrap();

    assert!((score_of(&ranked, "Alice Smith").unwrap() - 1.8).abs() < 1e-9);
    assert_eq!(score_of(&ranked, "Bob Jones"), Some(1.0));
    // semantic-only candidates are still ranked
    assert_eq!(score_of(&ranked, "Dana Grey"), Some(0.75));
    assert_eq!(ranked[0].name, "Alice Smith");
}

#[tokio::test]
async fn test_bonuses() {
    let analyzer = scripted(vec![]).await;
    let criteria = Criteria::new().with_industry("Software").with_role_level("Senior");
    let ranked = analyzer.find_interesting_connections(&criteria).await.unwrap();

    // Alice: exact industry + senior title
    assert!((score_of(&ranked, "Alice Smith").unwrap() - 1.8).abs() < 1e-9);
    // Bob: "Software Services" is not an exact match, title is not senior
    assert_eq!(score_of(&ranked, "Bob Jones"), Some(1.0));
    // Carol: senior title only
    assert!((score_of(&ranked, "Carol White").unwrap() - 1.3).abs() < 1e-9);

    let names: Vec<&str> = ranked.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Alice Smith", "Carol White", "Bob Jones"]);
}

#[tokio::test]
async fn test_cutoff_and_unscored_hits() {
    let analyzer = scripted(vec![("Erin Black", Some(0.69)), ("Frank Green", None), ("Gina Blue", Some(0.7))]).await;
    let ranked = analyzer
        .find_interesting_connections(&Criteria::new().with_company("Initech"))
        .await
        .unwrap();

    assert_eq!(score_of(&ranked, "Erin Black"), None);
    assert_eq!(score_of(&ranked, "Frank Green"), Some(0.5));
    assert_eq!(score_of(&ranked, "Gina Blue"), Some(0.7));
    assert_eq!(score_of(&ranked, "Carol White"), Some(1.0));
}

#[tokio::test]
async fn test_equal_scores_order_by_name() {
    let analyzer = scripted(vec![]).await;
    let ranked = analyzer
        .find_interesting_connections(&Criteria::new())
        .await
        .unwrap();
    let names: Vec<&str> = ranked.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Alice Smith", "Bob Jones", "Carol White"]);
}

#[tokio::test]
async fn test_unknown_person_vs_no_similar_profiles() {
    let analyzer = scripted(vec![("Alice Smith", Some(1.0))]).await;

    assert!(analyzer.get_connection_details("Zed Nobody").await.unwrap().is_none());

    let details = analyzer.get_connection_details("Alice Smith").await.unwrap().unwrap();
    assert_eq!(details.name(), "Alice Smith");
    assert!(details.similar_profiles.is_empty());
    assert_eq!(details.relationships.len(), 1);
    assert_eq!(details.relationships[0].edge.edge_type.as_str(), "WORKS_AT");

    let json = details.to_json();
    assert_eq!(json["relationships"][0]["target"]["properties"]["name"], "Acme");
    assert_eq!(json["similar_profiles"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn test_details_include_similar_profiles_from_local_index() {
    let config = AnalyzerConfig::default();
    let documents = parse_connections(EXPORT).unwrap();
    let output = Ingestor::new(config.clone(), Arc::new(HashEmbedder::new(config.embedding.dimensions)))
        .ingest_documents(&documents)
        .await
        .unwrap();
    let analyzer = ConnectionAnalyzer::new(Arc::new(output.graph), Arc::new(output.index), config.retrieval);

    let details = analyzer.get_connection_details("Alice Smith").await.unwrap().unwrap();
    let names: Vec<&str> = details.similar_profiles.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names.len(), 2);
    assert!(!names.contains(&"Alice Smith"));
    assert!(details.similar_profiles.iter().all(|p| p.similarity.is_some()));
}

#[tokio::test]
async fn test_embedding_outage_is_unavailable() {
    let analyzer = ConnectionAnalyzer::new(
        Arc::new(graph().await),
        Arc::new(RefusingRetriever),
        RetrievalConfig::default(),
    );

    let err = analyzer
        .find_interesting_connections(&Criteria::new().with_company("Acme"))
        .await
        .unwrap_err();
    assert!(matches!(err, AnalyzerError::Unavailable(ref m) if m.contains("connection refused")), "got {}", err);

    // the person exists, so the failure comes from the similar-profiles step
    let err = analyzer.get_connection_details("Alice Smith").await.unwrap_err();
    assert!(matches!(err, AnalyzerError::Unavailable(_)), "got {}", err);
}

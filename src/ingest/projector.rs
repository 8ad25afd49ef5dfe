//! Projects connection documents into the graph
//!
//! Every statement is parameterized; values never reach the query text.

use super::loader::ConnectionDocument;
use super::IngestResult;
use crate::client::GraphClient;
use crate::graph::PropertyValue;
use crate::query::{Params, QueryStats};
use serde::Serialize;
use tracing::info;

const UPSERT_PERSON: &str = "MERGE (p:Person {name: $name}) \
     SET p.email = $email, p.linkedin_url = $linkedin_url, p.connected_on = $connected_on, p.title = $title";

const LINK_COMPANY: &str = "MERGE (c:Company {name: $company}) \
     MERGE (p:Person {name: $name}) \
     MERGE (p)-[:WORKS_AT]->(c)";

const LINK_COMPANY_WITH_INDUSTRY: &str = "MERGE (c:Company {name: $company}) SET c.industry = $industry \
     MERGE (p:Person {name: $name}) \
     MERGE (p)-[:WORKS_AT]->(c)";

/// What a projection run changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProjectionSummary {
    pub documents: usize,
    pub nodes_created: usize,
    pub edges_created: usize,
    pub properties_set: usize,
}

impl ProjectionSummary {
    fn record(&mut self, stats: &QueryStats) {
        self.nodes_created += stats.nodes_created;
        self.edges_created += stats.edges_created;
        self.properties_set += stats.properties_set;
    }
}

pub struct GraphProjector<'a> {
    client: &'a dyn GraphClient,
}

impl<'a> GraphProjector<'a> {
    pub fn new(client: &'a dyn GraphClient) -> Self {
        Self { client }
    }

    /// Upsert every document's Person, Company and WORKS_AT edge
    pub async fn project(&self, documents: &[ConnectionDocument]) -> IngestResult<ProjectionSummary> {
        let mut summary = ProjectionSummary::default();
        for doc in documents {
            self.project_one(doc, &mut summary).await?;
        }

        info!(
            "Projected {} documents: {} nodes, {} edges created",
            summary.documents, summary.nodes_created, summary.edges_created
        );
        Ok(summary)
    }

    async fn project_one(&self, doc: &ConnectionDocument, summary: &mut ProjectionSummary) -> IngestResult<()> {
        let mut params = Params::new();
        params.insert("name".to_string(), PropertyValue::from(doc.name.as_str()));
        params.insert("email".to_string(), PropertyValue::from(doc.email.clone()));
        params.insert("linkedin_url".to_string(), PropertyValue::from(doc.linkedin_url.as_str()));
        params.insert("connected_on".to_string(), PropertyValue::from(doc.connected_on.as_str()));
        params.insert("title".to_string(), PropertyValue::from(doc.title.clone()));

        let batch = self.client.query(UPSERT_PERSON, &params).await?;
        summary.record(&batch.stats);

        if !doc.company.is_empty() {
            params.insert("company".to_string(), PropertyValue::from(doc.company.as_str()));
            let statement = match &doc.industry {
                Some(industry) => {
                    params.insert("industry".to_string(), PropertyValue::from(industry.as_str()));
                    LINK_COMPANY_WITH_INDUSTRY
                }
                None => LINK_COMPANY,
            };
            let batch = self.client.query(statement, &params).await?;
            summary.record(&batch.stats);
        }

        summary.documents += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::EmbeddedGraph;
    use crate::graph::Label;
    use crate::ingest::loader::parse_connections;

    const EXPORT: &str = "First Name,Last Name,Company,URL,Connected On,Position,Industry\n\
        Alice,Smith,Acme,https://x/alice,2023-02-01,Senior Engineer,Software\n\
        Bob,Jones,Acme,https://x/bob,2022-05-01,,\n\
        Carol,White,,https://x/carol,2021-01-01,,\n";

    #[tokio::test]
    async fn test_projection_shape() {
        let graph = EmbeddedGraph::new();
        let docs = parse_connections(EXPORT).unwrap();
        let summary = GraphProjector::new(&graph).project(&docs).await.unwrap();

        assert_eq!(summary.documents, 3);
        assert_eq!(summary.nodes_created, 4);
        assert_eq!(summary.edges_created, 2);

        let store = graph.store_read().await;
        assert_eq!(store.get_nodes_by_label(&Label::new("Person")).len(), 3);
        let acme = store.find_nodes_by_property(&Label::new("Company"), "name", &"Acme".into());
        assert_eq!(acme.len(), 1);
        assert_eq!(acme[0].get_str("industry"), Some("Software"));

        let alice = store.find_nodes_by_property(&Label::new("Person"), "name", &"Alice Smith".into());
        assert_eq!(alice[0].get_str("title"), Some("Senior Engineer"));
        assert!(!alice[0].has_property("email"));
    }

    #[tokio::test]
    async fn test_reprojection_is_idempotent() {
        let graph = EmbeddedGraph::new();
        let docs = parse_connections(EXPORT).unwrap();
        let projector = GraphProjector::new(&graph);
        projector.project(&docs).await.unwrap();

        let again = projector.project(&docs).await.unwrap();
        assert_eq!(again.nodes_created, 0);
        assert_eq!(again.edges_created, 0);

        let stats = graph.stats().await.unwrap();
        assert_eq!(stats.node_count, 4);
        assert_eq!(stats.edge_count, 2);
    }
}

//! Query execution
//!
//! `QueryExecutor` runs MATCH statements against a shared store;
//! `MutQueryExecutor` additionally runs MERGE/SET.

mod matcher;
mod merge;
pub mod record;

pub use record::{QueryStats, Record, RecordBatch, Value};

use crate::graph::{GraphError, GraphStore, PropertyValue};
use crate::query::ast::{MatchQuery, MergeClause, NodePattern, Operand, PathPattern, Projection, Query};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// Named values bound to `$parameters`
pub type Params = HashMap<String, PropertyValue>;

/// Execution errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// Graph store error
    #[error("Graph error: {0}")]
    GraphError(#[from] GraphError),

    /// A `$parameter` was referenced but not supplied
    #[error("Missing parameter: ${0}")]
    MissingParameter(String),

    /// Runtime error
    #[error("Runtime error: {0}")]
    RuntimeError(String),

    /// Type error
    #[error("Type error: {0}")]
    TypeError(String),

    /// Variable not found
    #[error("Variable not found: {0}")]
    VariableNotFound(String),
}

pub type ExecutionResult<T> = Result<T, ExecutionError>;

/// Query executor for read-only queries
pub struct QueryExecutor<'a> {
    store: &'a GraphStore,
    params: &'a Params,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(store: &'a GraphStore, params: &'a Params) -> Self {
        Self { store, params }
    }

    /// Execute a read-only query and return results
    pub fn execute(&self, query: &Query) -> ExecutionResult<RecordBatch> {
        match query {
            Query::Match(m) => {
                check_parameters(query, self.params)?;
                execute_match(self.store, m, self.params)
            }
            Query::Merge(_) => Err(ExecutionError::RuntimeError(
                "Cannot execute write query with read-only executor. Use MutQueryExecutor instead.".to_string(),
            )),
        }
    }
}

/// Query executor for write queries (MERGE, SET)
pub struct MutQueryExecutor<'a> {
    store: &'a mut GraphStore,
    params: &'a Params,
}

impl<'a> MutQueryExecutor<'a> {
    pub fn new(store: &'a mut GraphStore, params: &'a Params) -> Self {
        Self { store, params }
    }

    /// Execute a query (read or write) and return results
    pub fn execute(&mut self, query: &Query) -> ExecutionResult<RecordBatch> {
        // nothing is written unless every parameter is present
        check_parameters(query, self.params)?;

        match query {
            Query::Match(m) => execute_match(self.store, m, self.params),
            Query::Merge(clauses) => {
                let stats = merge::execute_merge(self.store, clauses, self.params)?;
                debug!(
                    "MERGE: {} nodes, {} edges created, {} properties set",
                    stats.nodes_created, stats.edges_created, stats.properties_set
                );
                let mut batch = RecordBatch::new(Vec::new());
                batch.stats = stats;
                Ok(batch)
            }
        }
    }
}

fn execute_match(store: &GraphStore, query: &MatchQuery, params: &Params) -> ExecutionResult<RecordBatch> {
    let columns: Vec<String> = query.returns.iter().map(|r| r.column_name()).collect();
    let mut batch = RecordBatch::new(columns.clone());

    for record in matcher::match_path(store, &query.pattern, params)? {
        if let Some(limit) = query.limit {
            if batch.len() >= limit {
                break;
            }
        }
        if !matcher::satisfies(&query.predicates, params, &record)? {
            continue;
        }

        let mut row = Record::new();
        for (item, column) in query.returns.iter().zip(&columns) {
            let value = match &item.projection {
                Projection::Variable(var) => record
                    .get(var)
                    .cloned()
                    .ok_or_else(|| ExecutionError::VariableNotFound(var.clone()))?,
                Projection::Property(prop) => match matcher::resolve_property(prop, &record)? {
                    PropertyValue::Null => Value::Null,
                    other => Value::Property(other),
                },
            };
            row.bind(column.clone(), value);
        }
        batch.push(row);
    }

    Ok(batch)
}

/// Fail fast when a referenced `$parameter` has no value
fn check_parameters(query: &Query, params: &Params) -> ExecutionResult<()> {
    let mut operands: Vec<&Operand> = Vec::new();

    fn collect_path<'q>(path: &'q PathPattern, out: &mut Vec<&'q Operand>) {
        let nodes: Vec<&NodePattern> = std::iter::once(&path.start)
            .chain(path.hop.as_ref().map(|(_, n)| n))
            .collect();
        for node in nodes {
            out.extend(node.properties.iter().map(|(_, op)| op));
        }
    }

    match query {
        Query::Match(m) => {
            collect_path(&m.pattern, &mut operands);
            operands.extend(m.predicates.iter().map(|p| &p.right));
        }
        Query::Merge(clauses) => {
            for MergeClause { pattern, set_items } in clauses {
                collect_path(pattern, &mut operands);
                operands.extend(set_items.iter().map(|s| &s.value));
            }
        }
    }

    for operand in operands {
        if let Operand::Parameter(name) = operand {
            if !params.contains_key(name) {
                return Err(ExecutionError::MissingParameter(name.clone()));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parse_query;

    fn params(pairs: &[(&str, PropertyValue)]) -> Params {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn run_write(store: &mut GraphStore, cypher: &str, params: &Params) -> ExecutionResult<RecordBatch> {
        let query = parse_query(cypher).unwrap();
        MutQueryExecutor::new(store, params).execute(&query)
    }

    fn run_read(store: &GraphStore, cypher: &str, params: &Params) -> ExecutionResult<RecordBatch> {
        let query = parse_query(cypher).unwrap();
        QueryExecutor::new(store, params).execute(&query)
    }

    fn seed(store: &mut GraphStore) {
        let rows = [
            ("Alice", "Google", "2023-05-10"),
            ("Bob", "Microsoft", "2022-02-01"),
            ("Carol", "Google", "2021-07-15"),
        ];
        for (name, company, connected_on) in rows {
            let p = params(&[
                ("name", name.into()),
                ("company", company.into()),
                ("connected_on", connected_on.into()),
            ]);
            run_write(
                store,
                "MERGE (c:Company {name: $company})
                 MERGE (p:Person {name: $name}) SET p.connected_on = $connected_on
                 MERGE (p)-[:WORKS_AT]->(c)",
                &p,
            )
            .unwrap();
        }
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut store = GraphStore::new();
        let p = params(&[("name", "Alice".into()), ("company", "Google".into())]);
        let cypher = "MERGE (c:Company {name: $company}) MERGE (p:Person {name: $name}) MERGE (p)-[:WORKS_AT]->(c)";

        let first = run_write(&mut store, cypher, &p).unwrap();
        assert_eq!(first.stats.nodes_created, 2);
        assert_eq!(first.stats.edges_created, 1);

        let second = run_write(&mut store, cypher, &p).unwrap();
        assert_eq!(second.stats, QueryStats::default());
        assert_eq!(store.node_count(), 2);
        assert_eq!(store.edge_count(), 1);
    }

    #[test]
    fn test_match_with_filters() {
        let mut store = GraphStore::new();
        seed(&mut store);

        let p = params(&[("company", "Goo".into()), ("after", "2022-01-01".into())]);
        let batch = run_read(
            &store,
            "MATCH (p:Person)-[:WORKS_AT]->(c:Company)
             WHERE c.name CONTAINS $company AND p.connected_on >= $after
             RETURN p.name AS name, c.name AS company",
            &p,
        )
        .unwrap();

        assert_eq!(batch.columns, vec!["name", "company"]);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.records[0].get_str("name"), Some("Alice"));
        assert_eq!(batch.records[0].get_str("company"), Some("Google"));
    }

    #[test]
    fn test_missing_property_projects_null() {
        let mut store = GraphStore::new();
        seed(&mut store);
        let batch = run_read(&store, "MATCH (p:Person {name: 'Bob'}) RETURN p.title AS title", &Params::new()).unwrap();
        assert_eq!(batch.len(), 1);
        assert!(batch.records[0].get("title").map(Value::is_null).unwrap_or(false));
    }

    #[test]
    fn test_limit_and_entity_projection() {
        let mut store = GraphStore::new();
        seed(&mut store);
        let batch = run_read(&store, "MATCH (p:Person)-[r]->(c) RETURN p, r, c LIMIT 2", &Params::new()).unwrap();
        assert_eq!(batch.len(), 2);
        assert!(batch.records[0].get("p").and_then(Value::as_node).is_some());
        assert!(batch.records[0].get("r").and_then(Value::as_edge).is_some());
    }

    #[test]
    fn test_missing_parameter_writes_nothing() {
        let mut store = GraphStore::new();
        let p = params(&[("name", "Alice".into())]);
        let err = run_write(
            &mut store,
            "MERGE (p:Person {name: $name}) SET p.email = $email",
            &p,
        )
        .unwrap_err();
        assert!(matches!(err, ExecutionError::MissingParameter(ref n) if n == "email"));
        assert_eq!(store.node_count(), 0);
    }

    #[test]
    fn test_set_null_removes_property() {
        let mut store = GraphStore::new();
        let cypher = "MERGE (p:Person {name: $name}) SET p.title = $title";
        run_write(&mut store, cypher, &params(&[("name", "Alice".into()), ("title", "CTO".into())])).unwrap();
        run_write(&mut store, cypher, &params(&[("name", "Alice".into()), ("title", PropertyValue::Null)])).unwrap();

        let node = store.get_nodes_by_label(&"Person".into())[0];
        assert!(!node.has_property("title"));
    }

    #[test]
    fn test_merge_null_key_rejected() {
        let mut store = GraphStore::new();
        let err = run_write(&mut store, "MERGE (p:Person {name: $name})", &params(&[("name", PropertyValue::Null)]))
            .unwrap_err();
        assert!(matches!(err, ExecutionError::TypeError(_)));
    }

    #[test]
    fn test_read_executor_rejects_writes() {
        let store = GraphStore::new();
        let err = run_read(&store, "MERGE (n:Person {name: 'x'})", &Params::new()).unwrap_err();
        assert!(matches!(err, ExecutionError::RuntimeError(_)));
    }
}

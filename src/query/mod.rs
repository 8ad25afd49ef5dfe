//! Query processing module
//!
//! A small OpenCypher subset: single-hop MATCH with WHERE/RETURN/LIMIT,
//! and chained MERGE with SET. Values come in as `$parameters`.

pub mod ast;
pub mod executor;
pub mod parser;

pub use ast::Query;
pub use executor::{
    ExecutionError, ExecutionResult, MutQueryExecutor, Params, QueryExecutor, QueryStats, Record, RecordBatch,
    Value,
};
pub use parser::{parse_query, ParseError, ParseResult};

use crate::graph::GraphStore;
use thiserror::Error;

/// Parse or execution failure
#[derive(Error, Debug)]
pub enum QueryError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

/// Query engine - high-level interface for executing queries
#[derive(Debug, Default, Clone, Copy)]
pub struct QueryEngine;

impl QueryEngine {
    pub fn new() -> Self {
        Self
    }

    /// Parse a query and check if it requires mutation
    pub fn needs_mutation(&self, query_str: &str) -> Result<bool, QueryError> {
        Ok(!self.parse(query_str)?.is_read_only())
    }

    pub fn parse(&self, query_str: &str) -> Result<Query, QueryError> {
        Ok(parse_query(query_str)?)
    }

    /// Run an already parsed query; writes are rejected
    pub fn run(&self, query: &Query, params: &Params, store: &GraphStore) -> Result<RecordBatch, QueryError> {
        Ok(QueryExecutor::new(store, params).execute(query)?)
    }

    /// Run an already parsed query, allowing writes
    pub fn run_mut(&self, query: &Query, params: &Params, store: &mut GraphStore) -> Result<RecordBatch, QueryError> {
        Ok(MutQueryExecutor::new(store, params).execute(query)?)
    }

    /// Parse and execute a read-only query
    pub fn execute(&self, query_str: &str, params: &Params, store: &GraphStore) -> Result<RecordBatch, QueryError> {
        self.run(&self.parse(query_str)?, params, store)
    }

    /// Parse and execute any query, allowing writes
    pub fn execute_mut(
        &self,
        query_str: &str,
        params: &Params,
        store: &mut GraphStore,
    ) -> Result<RecordBatch, QueryError> {
        self.run_mut(&self.parse(query_str)?, params, store)
    }
}

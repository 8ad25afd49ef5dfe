//! Abstract syntax tree for the Cypher subset

use crate::graph::{EdgeType, Label, PropertyValue};

/// A parsed statement
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// `MATCH ... [WHERE ...] RETURN ... [LIMIT n]`
    Match(MatchQuery),
    /// One or more `MERGE ... [SET ...]` clauses, applied in order
    Merge(Vec<MergeClause>),
}

impl Query {
    /// Whether executing this statement can change the graph
    pub fn is_read_only(&self) -> bool {
        matches!(self, Query::Match(_))
    }
}

/// Read query
#[derive(Debug, Clone, PartialEq)]
pub struct MatchQuery {
    pub pattern: PathPattern,
    /// Conjunction of predicates (empty = no filter)
    pub predicates: Vec<Predicate>,
    pub returns: Vec<ReturnItem>,
    pub limit: Option<usize>,
}

/// `MERGE <path> [SET a.x = ..., ...]`
#[derive(Debug, Clone, PartialEq)]
pub struct MergeClause {
    pub pattern: PathPattern,
    pub set_items: Vec<SetItem>,
}

/// Path pattern: a node, optionally followed by one hop
#[derive(Debug, Clone, PartialEq)]
pub struct PathPattern {
    pub start: NodePattern,
    pub hop: Option<(EdgePattern, NodePattern)>,
}

/// Node pattern: (n:Person {name: $name})
#[derive(Debug, Clone, PartialEq)]
pub struct NodePattern {
    pub variable: Option<String>,
    pub label: Option<Label>,
    pub properties: Vec<(String, Operand)>,
}

/// Edge pattern: -[r:WORKS_AT]->
#[derive(Debug, Clone, PartialEq)]
pub struct EdgePattern {
    pub variable: Option<String>,
    pub edge_type: Option<EdgeType>,
    pub direction: Direction,
}

/// Edge direction relative to the pattern's start node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// ->
    Outgoing,
    /// <-
    Incoming,
    /// -
    Both,
}

/// `variable.property`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyRef {
    pub variable: String,
    pub property: String,
}

impl std::fmt::Display for PropertyRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.variable, self.property)
    }
}

/// Right-hand side of a comparison, map entry or SET item
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// `$name`, resolved against the bound parameters at execution time
    Parameter(String),
    Literal(PropertyValue),
    Property(PropertyRef),
}

/// `lhs <op> rhs`
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub left: PropertyRef,
    pub op: ComparisonOp,
    pub right: Operand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Contains,
    StartsWith,
    EndsWith,
}

/// What a RETURN item projects
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// A whole node or edge
    Variable(String),
    Property(PropertyRef),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnItem {
    pub projection: Projection,
    pub alias: Option<String>,
}

impl ReturnItem {
    /// Column name: the alias, or the source text (`p` / `p.name`)
    pub fn column_name(&self) -> String {
        if let Some(alias) = &self.alias {
            return alias.clone();
        }
        match &self.projection {
            Projection::Variable(v) => v.clone(),
            Projection::Property(p) => p.to_string(),
        }
    }
}

/// `SET variable.property = operand`
#[derive(Debug, Clone, PartialEq)]
pub struct SetItem {
    pub target: PropertyRef,
    pub value: Operand,
}

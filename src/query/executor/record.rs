//! Records produced by query execution

use crate::graph::{Edge, EdgeId, Node, NodeId, PropertyValue};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A single result row: column (or variable) name -> value, in RETURN order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    bindings: IndexMap<String, Value>,
}

/// Value types that can be bound to variables
#[derive(Debug, Clone)]
pub enum Value {
    Node(NodeId, Node),
    Edge(EdgeId, Edge),
    Property(PropertyValue),
    Null,
}

// Nodes and edges compare by id only
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Node(a, _), Value::Node(b, _)) => a == b,
            (Value::Edge(a, _), Value::Edge(b, _)) => a == b,
            (Value::Property(a), Value::Property(b)) => a == b,
            (Value::Null, Value::Null) => true,
            _ => false,
        }
    }
}

impl Value {
    pub fn as_node(&self) -> Option<(NodeId, &Node)> {
        match self {
            Value::Node(id, node) => Some((*id, node)),
            _ => None,
        }
    }

    pub fn as_edge(&self) -> Option<(EdgeId, &Edge)> {
        match self {
            Value::Edge(id, edge) => Some((*id, edge)),
            _ => None,
        }
    }

    pub fn as_property(&self) -> Option<&PropertyValue> {
        match self {
            Value::Property(prop) => Some(prop),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null) || matches!(self, Value::Property(PropertyValue::Null))
    }

    /// Property of a bound node or edge; `Null` when absent or not an entity
    pub fn property(&self, key: &str) -> PropertyValue {
        let found = match self {
            Value::Node(_, node) => node.get_property(key),
            Value::Edge(_, edge) => edge.get_property(key),
            _ => None,
        };
        found.cloned().unwrap_or(PropertyValue::Null)
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Node(_, node) => node.to_json(),
            Value::Edge(_, edge) => edge.to_json(),
            Value::Property(p) => p.to_json(),
            Value::Null => serde_json::Value::Null,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Node(id, node) => {
                let label = node.primary_label().map(|l| l.as_str()).unwrap_or("");
                match node.get_str("name") {
                    Some(name) => write!(f, "({}:{} {{name: {}}})", id.as_u64(), label, name),
                    None => write!(f, "({}:{})", id.as_u64(), label),
                }
            }
            Value::Edge(id, edge) => write!(
                f,
                "[{}:{} {}->{}]",
                id.as_u64(),
                edge.edge_type,
                edge.source.as_u64(),
                edge.target.as_u64()
            ),
            Value::Property(PropertyValue::String(s)) => write!(f, "{}", s),
            Value::Property(p) => write!(f, "{}", p),
            Value::Null => write!(f, "null"),
        }
    }
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a variable to a value, replacing any previous binding
    pub fn bind(&mut self, variable: impl Into<String>, value: Value) {
        self.bindings.insert(variable.into(), value);
    }

    pub fn get(&self, variable: &str) -> Option<&Value> {
        self.bindings.get(variable)
    }

    pub fn has(&self, variable: &str) -> bool {
        self.bindings.contains_key(variable)
    }

    pub fn bindings(&self) -> &IndexMap<String, Value> {
        &self.bindings
    }

    /// Property value stored in a column
    pub fn get_property(&self, column: &str) -> Option<&PropertyValue> {
        self.get(column).and_then(Value::as_property)
    }

    /// String stored in a column
    pub fn get_str(&self, column: &str) -> Option<&str> {
        self.get_property(column).and_then(PropertyValue::as_string)
    }

    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .bindings
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        serde_json::Value::Object(map)
    }
}

/// Counters reported by write statements
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryStats {
    pub nodes_created: usize,
    pub edges_created: usize,
    pub properties_set: usize,
}

impl QueryStats {
    pub fn contains_updates(&self) -> bool {
        self.nodes_created > 0 || self.edges_created > 0 || self.properties_set > 0
    }

    /// Accumulate another set of counters
    pub fn add(&mut self, other: &QueryStats) {
        self.nodes_created += other.nodes_created;
        self.edges_created += other.edges_created;
        self.properties_set += other.properties_set;
    }
}

/// A batch of records (result set)
#[derive(Debug, Clone, Default)]
pub struct RecordBatch {
    pub columns: Vec<String>,
    pub records: Vec<Record>,
    pub stats: QueryStats,
}

impl RecordBatch {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            records: Vec::new(),
            stats: QueryStats::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    /// `{"columns": [...], "records": [{...}], "stats": {...}}`
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "columns": self.columns,
            "records": self.records.iter().map(Record::to_json).collect::<Vec<_>>(),
            "stats": self.stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Label;

    #[test]
    fn test_record_keeps_binding_order() {
        let mut record = Record::new();
        record.bind("name", Value::Property("Alice".into()));
        record.bind("company", Value::Property("Acme".into()));
        record.bind("title", Value::Null);

        let keys: Vec<&String> = record.bindings().keys().collect();
        assert_eq!(keys, vec!["name", "company", "title"]);
        assert_eq!(record.get_str("company"), Some("Acme"));
        assert!(record.get("title").map(Value::is_null).unwrap_or(false));
    }

    #[test]
    fn test_node_value_property_lookup() {
        let mut node = Node::new(NodeId::new(3), Label::new("Person"));
        node.set_property("name", "Alice");
        let value = Value::Node(NodeId::new(3), node);

        assert_eq!(value.property("name"), PropertyValue::String("Alice".to_string()));
        assert_eq!(value.property("missing"), PropertyValue::Null);
        assert_eq!(value.to_string(), "(3:Person {name: Alice})");
    }

    #[test]
    fn test_nodes_compare_by_id() {
        let a = Value::Node(NodeId::new(1), Node::new(NodeId::new(1), Label::new("Person")));
        let b = Value::Node(NodeId::new(1), Node::new(NodeId::new(1), Label::new("Company")));
        assert_eq!(a, b);
    }

    #[test]
    fn test_batch_json_shape() {
        let mut batch = RecordBatch::new(vec!["name".to_string()]);
        let mut record = Record::new();
        record.bind("name", Value::Property("Alice".into()));
        batch.push(record);
        batch.stats.nodes_created = 2;

        let json = batch.to_json();
        assert_eq!(json["columns"][0], "name");
        assert_eq!(json["records"][0]["name"], "Alice");
        assert_eq!(json["stats"]["nodes_created"], 2);
        assert!(batch.stats.contains_updates());
    }
}

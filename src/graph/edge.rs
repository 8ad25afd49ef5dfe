//! Directed, typed relationships between nodes

use super::property::{PropertyMap, PropertyValue};
use super::types::{EdgeId, EdgeType, NodeId};
use serde::{Deserialize, Serialize};

/// A directed edge in the property graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// Unique identifier for this edge
    pub id: EdgeId,

    /// Source node (edge goes FROM this node)
    pub source: NodeId,

    /// Target node (edge goes TO this node)
    pub target: NodeId,

    /// Type of relationship (e.g., "WORKS_AT")
    pub edge_type: EdgeType,

    /// Properties associated with this edge
    pub properties: PropertyMap,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,
}

impl Edge {
    /// Create a new directed edge
    pub fn new(id: EdgeId, source: NodeId, target: NodeId, edge_type: impl Into<EdgeType>) -> Self {
        Edge {
            id,
            source,
            target,
            edge_type: edge_type.into(),
            properties: PropertyMap::new(),
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Set a property value
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Get a property value
    pub fn get_property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// The endpoint on the other side of `node`, if this edge touches it
    pub fn other_end(&self, node: NodeId) -> Option<NodeId> {
        if self.source == node {
            Some(self.target)
        } else if self.target == node {
            Some(self.source)
        } else {
            None
        }
    }

    /// Convert to a JSON object (`id`, `type`, `source`, `target`, `properties`)
    pub fn to_json(&self) -> serde_json::Value {
        let properties: serde_json::Map<String, serde_json::Value> = self
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        serde_json::json!({
            "id": self.id.as_u64(),
            "type": self.edge_type.as_str(),
            "source": self.source.as_u64(),
            "target": self.target.as_u64(),
            "properties": properties,
        })
    }
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Edge {}

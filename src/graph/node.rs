//! Node implementation for the connection graph

use super::property::{PropertyMap, PropertyValue};
use super::types::{Label, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A node in the property graph
///
/// Labels are kept in a sorted set so that snapshots and rendered output
/// are stable between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier for this node
    pub id: NodeId,

    /// Labels for this node
    pub labels: BTreeSet<Label>,

    /// Properties associated with this node
    pub properties: PropertyMap,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,
}

impl Node {
    /// Create a new node with a single label
    pub fn new(id: NodeId, label: impl Into<Label>) -> Self {
        Self::new_with_properties(id, vec![label.into()], PropertyMap::new())
    }

    /// Create a new node with labels and properties
    pub fn new_with_properties(id: NodeId, labels: Vec<Label>, properties: PropertyMap) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Node {
            id,
            labels: labels.into_iter().collect(),
            properties,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if node has a specific label
    pub fn has_label(&self, label: &Label) -> bool {
        self.labels.contains(label)
    }

    /// First label in sort order, used for display
    pub fn primary_label(&self) -> Option<&Label> {
        self.labels.iter().next()
    }

    /// Set a property value, returning the previous one
    pub fn set_property(
        &mut self,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Option<PropertyValue> {
        let old = self.properties.insert(key.into(), value.into());
        self.updated_at = chrono::Utc::now().timestamp_millis();
        old
    }

    /// Get a property value
    pub fn get_property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Get a string property, treating missing and non-string values alike
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(|v| v.as_string())
    }

    /// Check if property exists
    pub fn has_property(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// Convert to a JSON object (`id`, `labels`, `properties`)
    pub fn to_json(&self) -> serde_json::Value {
        let properties: serde_json::Map<String, serde_json::Value> = self
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        serde_json::json!({
            "id": self.id.as_u64(),
            "labels": self.labels.iter().map(|l| l.as_str()).collect::<Vec<_>>(),
            "properties": properties,
        })
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Node {}

//! Manager for key-property indices
//!
//! Owned by the `GraphStore`; every property write on an indexed
//! (label, property) pair is mirrored here.

use super::key_index::KeyIndex;
use crate::graph::{Label, NodeId, PropertyValue};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Key for identifying a property index
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyIndexKey {
    pub label: Label,
    pub property: String,
}

impl PropertyIndexKey {
    fn new(label: &Label, property: &str) -> Self {
        Self {
            label: label.clone(),
            property: property.to_string(),
        }
    }
}

/// Manager for all key-property indices
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexManager {
    indices: HashMap<PropertyIndexKey, KeyIndex>,
}

impl IndexManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an (empty) index for a label and property
    pub fn create_index(&mut self, label: impl Into<Label>, property: impl Into<String>) {
        let key = PropertyIndexKey {
            label: label.into(),
            property: property.into(),
        };
        self.indices.entry(key).or_default();
    }

    /// Check if an index exists
    pub fn has_index(&self, label: &Label, property: &str) -> bool {
        self.indices.contains_key(&PropertyIndexKey::new(label, property))
    }

    /// Record a property value for a node. Non-string values are not indexed.
    pub fn index_insert(&mut self, label: &Label, property: &str, value: &PropertyValue, node_id: NodeId) {
        if let (Some(index), Some(s)) = (
            self.indices.get_mut(&PropertyIndexKey::new(label, property)),
            value.as_string(),
        ) {
            index.insert(s, node_id);
        }
    }

    /// Drop a previously recorded property value for a node
    pub fn index_remove(&mut self, label: &Label, property: &str, value: &PropertyValue, node_id: NodeId) {
        if let (Some(index), Some(s)) = (
            self.indices.get_mut(&PropertyIndexKey::new(label, property)),
            value.as_string(),
        ) {
            index.remove(s, node_id);
        }
    }

    /// Get index for querying
    pub fn get_index(&self, label: &Label, property: &str) -> Option<&KeyIndex> {
        self.indices.get(&PropertyIndexKey::new(label, property))
    }
}

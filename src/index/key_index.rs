//! Ordered index from string property values to nodes

use crate::graph::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Index for one string property of one label
///
/// Names are not unique in the source data, so each value maps to a set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeyIndex {
    index: BTreeMap<String, BTreeSet<NodeId>>,
}

impl KeyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, value: &str, node_id: NodeId) {
        self.index.entry(value.to_string()).or_default().insert(node_id);
    }

    pub fn remove(&mut self, value: &str, node_id: NodeId) {
        if let Some(nodes) = self.index.get_mut(value) {
            nodes.remove(&node_id);
            if nodes.is_empty() {
                self.index.remove(value);
            }
        }
    }

    /// Nodes whose value equals `value`, in id order
    pub fn get(&self, value: &str) -> Vec<NodeId> {
        self.index
            .get(value)
            .map(|nodes| nodes.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Nodes whose value starts with `prefix`
    pub fn prefix(&self, prefix: &str) -> Vec<NodeId> {
        self.index
            .range(prefix.to_string()..)
            .take_while(|(value, _)| value.starts_with(prefix))
            .flat_map(|(_, nodes)| nodes.iter().copied())
            .collect()
    }

    /// Number of distinct values
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_index_ops() {
        let mut index = KeyIndex::new();
        let n1 = NodeId::new(1);
        let n2 = NodeId::new(2);

        index.insert("Alice Smith", n1);
        index.insert("Alice Smith", n2);
        assert_eq!(index.get("Alice Smith"), vec![n1, n2]);
        assert_eq!(index.len(), 1);

        index.remove("Alice Smith", n1);
        assert_eq!(index.get("Alice Smith"), vec![n2]);

        index.remove("Alice Smith", n2);
        assert!(index.is_empty());
        assert!(index.get("Alice Smith").is_empty());
    }

    #[test]
    fn test_key_index_prefix() {
        let mut index = KeyIndex::new();
        index.insert("Acme", NodeId::new(1));
        index.insert("Acme Labs", NodeId::new(2));
        index.insert("Globex", NodeId::new(3));

        let hits = index.prefix("Acme");
        assert_eq!(hits, vec![NodeId::new(1), NodeId::new(2)]);
        assert!(index.prefix("Zeta").is_empty());
    }
}

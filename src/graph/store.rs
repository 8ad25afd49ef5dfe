//! In-memory graph storage implementation
//!
//! Arena-style storage: node and edge ids are dense offsets into vectors,
//! with per-node adjacency lists and label / edge-type indices on top.

use super::edge::Edge;
use super::node::Node;
use super::property::{PropertyMap, PropertyValue};
use super::types::{EdgeId, EdgeType, Label, NodeId};
use super::{COMPANY_LABEL, PERSON_LABEL};
use crate::index::IndexManager;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

/// Errors that can occur during graph operations
#[derive(Error, Debug, PartialEq)]
pub enum GraphError {
    #[error("Node {0} not found")]
    NodeNotFound(NodeId),

    #[error("Edge {0} not found")]
    EdgeNotFound(EdgeId),

    #[error("Invalid edge: source node {0} does not exist")]
    InvalidEdgeSource(NodeId),

    #[error("Invalid edge: target node {0} does not exist")]
    InvalidEdgeTarget(NodeId),
}

pub type GraphResult<T> = Result<T, GraphError>;

/// Summary counts for a store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphStatistics {
    pub node_count: usize,
    pub edge_count: usize,
    pub label_counts: HashMap<String, usize>,
    pub edge_type_counts: HashMap<String, usize>,
}

/// In-memory graph storage
///
/// - nodes: slot -> Node (slot 0 is never used)
/// - edges: slot -> Edge
/// - outgoing / incoming: slot -> Vec<EdgeId>
/// - label_index: Label -> NodeIds (ordered, so scans are deterministic)
/// - key_index: (Label, property) -> value -> NodeIds for MERGE keys
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphStore {
    nodes: Vec<Option<Node>>,
    edges: Vec<Option<Edge>>,
    outgoing: Vec<Vec<EdgeId>>,
    incoming: Vec<Vec<EdgeId>>,
    label_index: HashMap<Label, BTreeSet<NodeId>>,
    edge_type_index: HashMap<EdgeType, BTreeSet<EdgeId>>,
    key_index: IndexManager,
    node_count: usize,
    edge_count: usize,
}

impl GraphStore {
    /// Create a new empty graph store with name indices on Person and Company
    pub fn new() -> Self {
        let mut key_index = IndexManager::new();
        key_index.create_index(PERSON_LABEL, "name");
        key_index.create_index(COMPANY_LABEL, "name");

        GraphStore {
            nodes: vec![None],
            edges: vec![None],
            outgoing: vec![Vec::new()],
            incoming: vec![Vec::new()],
            label_index: HashMap::new(),
            edge_type_index: HashMap::new(),
            key_index,
            node_count: 0,
            edge_count: 0,
        }
    }

    /// Create a node with a single label and no properties
    pub fn create_node(&mut self, label: impl Into<Label>) -> NodeId {
        self.create_node_with_properties(vec![label.into()], PropertyMap::new())
    }

    /// Create a node with labels and properties
    pub fn create_node_with_properties(&mut self, labels: Vec<Label>, properties: PropertyMap) -> NodeId {
        let node_id = NodeId::new(self.nodes.len() as u64);
        let node = Node::new_with_properties(node_id, labels, properties);

        for label in &node.labels {
            self.label_index.entry(label.clone()).or_default().insert(node_id);
            for (key, value) in &node.properties {
                self.key_index.index_insert(label, key, value, node_id);
            }
        }

        self.nodes.push(Some(node));
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        self.node_count += 1;
        node_id
    }

    /// Get a node by id
    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.slot()).and_then(|n| n.as_ref())
    }

    /// Check whether a node exists
    pub fn has_node(&self, id: NodeId) -> bool {
        self.get_node(id).is_some()
    }

    /// Set a property on a node, keeping key indices in sync
    pub fn set_node_property(
        &mut self,
        id: NodeId,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> GraphResult<Option<PropertyValue>> {
        let key = key.into();
        let value = value.into();
        let node = self
            .nodes
            .get_mut(id.slot())
            .and_then(|n| n.as_mut())
            .ok_or(GraphError::NodeNotFound(id))?;

        let old = node.set_property(key.clone(), value.clone());
        for label in &node.labels {
            if let Some(ref old_value) = old {
                self.key_index.index_remove(label, &key, old_value, id);
            }
            self.key_index.index_insert(label, &key, &value, id);
        }
        Ok(old)
    }

    /// Remove a property from a node, returning the old value
    pub fn remove_node_property(&mut self, id: NodeId, key: &str) -> GraphResult<Option<PropertyValue>> {
        let node = self
            .nodes
            .get_mut(id.slot())
            .and_then(|n| n.as_mut())
            .ok_or(GraphError::NodeNotFound(id))?;

        let old = node.properties.remove(key);
        if let Some(ref old_value) = old {
            for label in &node.labels {
                self.key_index.index_remove(label, key, old_value, id);
            }
            node.updated_at = chrono::Utc::now().timestamp_millis();
        }
        Ok(old)
    }

    /// Create a directed edge
    pub fn create_edge(
        &mut self,
        source: NodeId,
        target: NodeId,
        edge_type: impl Into<EdgeType>,
    ) -> GraphResult<EdgeId> {
        if !self.has_node(source) {
            return Err(GraphError::InvalidEdgeSource(source));
        }
        if !self.has_node(target) {
            return Err(GraphError::InvalidEdgeTarget(target));
        }

        let edge_id = EdgeId::new(self.edges.len() as u64);
        let edge = Edge::new(edge_id, source, target, edge_type);

        self.edge_type_index
            .entry(edge.edge_type.clone())
            .or_default()
            .insert(edge_id);
        self.outgoing[source.slot()].push(edge_id);
        self.incoming[target.slot()].push(edge_id);
        self.edges.push(Some(edge));
        self.edge_count += 1;
        Ok(edge_id)
    }

    /// Get an edge by id
    pub fn get_edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.slot()).and_then(|e| e.as_ref())
    }

    /// Get a mutable edge by id
    pub fn get_edge_mut(&mut self, id: EdgeId) -> Option<&mut Edge> {
        self.edges.get_mut(id.slot()).and_then(|e| e.as_mut())
    }

    /// Delete an edge, detaching it from both adjacency lists
    pub fn delete_edge(&mut self, id: EdgeId) -> GraphResult<Edge> {
        let edge = self
            .edges
            .get_mut(id.slot())
            .and_then(|e| e.take())
            .ok_or(GraphError::EdgeNotFound(id))?;

        self.outgoing[edge.source.slot()].retain(|&e| e != id);
        self.incoming[edge.target.slot()].retain(|&e| e != id);
        if let Some(ids) = self.edge_type_index.get_mut(&edge.edge_type) {
            ids.remove(&id);
        }
        self.edge_count -= 1;
        Ok(edge)
    }

    /// Outgoing edges of a node, in creation order
    pub fn get_outgoing_edges(&self, node_id: NodeId) -> Vec<&Edge> {
        self.outgoing
            .get(node_id.slot())
            .map(|ids| ids.iter().filter_map(|&id| self.get_edge(id)).collect())
            .unwrap_or_default()
    }

    /// Incoming edges of a node, in creation order
    pub fn get_incoming_edges(&self, node_id: NodeId) -> Vec<&Edge> {
        self.incoming
            .get(node_id.slot())
            .map(|ids| ids.iter().filter_map(|&id| self.get_edge(id)).collect())
            .unwrap_or_default()
    }

    /// Find an existing edge of a given type from `source` to `target`
    pub fn find_edge(&self, source: NodeId, target: NodeId, edge_type: &EdgeType) -> Option<&Edge> {
        self.get_outgoing_edges(source)
            .into_iter()
            .find(|e| e.target == target && &e.edge_type == edge_type)
    }

    /// All nodes carrying a label, in id order
    pub fn get_nodes_by_label(&self, label: &Label) -> Vec<&Node> {
        self.label_index
            .get(label)
            .map(|ids| ids.iter().filter_map(|&id| self.get_node(id)).collect())
            .unwrap_or_default()
    }

    /// All edges of a type, in id order
    pub fn get_edges_by_type(&self, edge_type: &EdgeType) -> Vec<&Edge> {
        self.edge_type_index
            .get(edge_type)
            .map(|ids| ids.iter().filter_map(|&id| self.get_edge(id)).collect())
            .unwrap_or_default()
    }

    /// Nodes with `label` whose string `property` equals `value`.
    ///
    /// Uses the key index when one exists, otherwise scans the label.
    pub fn find_nodes_by_property(&self, label: &Label, property: &str, value: &PropertyValue) -> Vec<&Node> {
        if let (Some(index), Some(s)) = (self.key_index.get_index(label, property), value.as_string()) {
            return index.get(s).into_iter().filter_map(|id| self.get_node(id)).collect();
        }
        self.get_nodes_by_label(label)
            .into_iter()
            .filter(|n| n.get_property(property) == Some(value))
            .collect()
    }

    /// Whether lookups on (label, property) are index-backed
    pub fn has_key_index(&self, label: &Label, property: &str) -> bool {
        self.key_index.has_index(label, property)
    }

    /// All live nodes, in id order
    pub fn all_nodes(&self) -> Vec<&Node> {
        self.nodes.iter().filter_map(|n| n.as_ref()).collect()
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Counts by label and by edge type
    pub fn statistics(&self) -> GraphStatistics {
        GraphStatistics {
            node_count: self.node_count,
            edge_count: self.edge_count,
            label_counts: self
                .label_index
                .iter()
                .map(|(label, ids)| (label.as_str().to_string(), ids.len()))
                .collect(),
            edge_type_counts: self
                .edge_type_index
                .iter()
                .map(|(t, ids)| (t.as_str().to_string(), ids.len()))
                .collect(),
        }
    }

    /// Remove everything, keeping the declared key indices
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}

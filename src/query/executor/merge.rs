//! MERGE / SET execution
//!
//! Each clause finds-or-creates its nodes, then its relationship, then
//! applies SET items. Variables bound by an earlier clause are reused by
//! later ones in the same statement.

use super::matcher::{node_matches, resolve_node_properties, resolve_operand, scan_nodes};
use super::record::{QueryStats, Record, Value};
use super::{ExecutionError, ExecutionResult, Params};
use crate::graph::{EdgeId, GraphStore, NodeId, PropertyMap};
use crate::query::ast::{Direction, EdgePattern, MergeClause, NodePattern, SetItem};
use std::collections::HashMap;
use tracing::trace;

#[derive(Default)]
struct Bindings {
    nodes: HashMap<String, NodeId>,
    edges: HashMap<String, EdgeId>,
}

impl Bindings {
    /// Current state of every bound variable
    fn snapshot(&self, store: &GraphStore) -> Record {
        let mut record = Record::new();
        for (var, id) in &self.nodes {
            if let Some(node) = store.get_node(*id) {
                record.bind(var.clone(), Value::Node(*id, node.clone()));
            }
        }
        for (var, id) in &self.edges {
            if let Some(edge) = store.get_edge(*id) {
                record.bind(var.clone(), Value::Edge(*id, edge.clone()));
            }
        }
        record
    }
}

pub(crate) fn execute_merge(
    store: &mut GraphStore,
    clauses: &[MergeClause],
    params: &Params,
) -> ExecutionResult<QueryStats> {
    let mut bindings = Bindings::default();
    let mut stats = QueryStats::default();

    for clause in clauses {
        let start = merge_node(store, &clause.pattern.start, params, &mut bindings, &mut stats)?;
        if let Some((edge_pattern, end_pattern)) = &clause.pattern.hop {
            let end = merge_node(store, end_pattern, params, &mut bindings, &mut stats)?;
            merge_edge(store, edge_pattern, start, end, &mut bindings, &mut stats)?;
        }
        for item in &clause.set_items {
            apply_set(store, item, params, &bindings, &mut stats)?;
        }
    }

    Ok(stats)
}

fn merge_node(
    store: &mut GraphStore,
    pattern: &NodePattern,
    params: &Params,
    bindings: &mut Bindings,
    stats: &mut QueryStats,
) -> ExecutionResult<NodeId> {
    let record = bindings.snapshot(store);
    let properties = resolve_node_properties(pattern, params, &record)?;

    if let Some(id) = pattern.variable.as_ref().and_then(|v| bindings.nodes.get(v)).copied() {
        let node = store.get_node(id).ok_or(crate::graph::GraphError::NodeNotFound(id))?;
        if !node_matches(node, pattern, &properties) {
            return Err(ExecutionError::RuntimeError(format!(
                "variable '{}' is already bound to a node that does not match the pattern",
                pattern.variable.as_deref().unwrap_or_default()
            )));
        }
        return Ok(id);
    }

    if let Some((key, _)) = properties.iter().find(|(_, value)| value.is_null()) {
        return Err(ExecutionError::TypeError(format!(
            "cannot merge node using null property value for '{}'",
            key
        )));
    }

    let existing = scan_nodes(store, pattern, &properties).first().map(|n| n.id);
    let id = match existing {
        Some(id) => id,
        None => {
            let labels = pattern.label.iter().cloned().collect();
            let props: PropertyMap = properties.iter().cloned().collect();
            let id = store.create_node_with_properties(labels, props);
            stats.nodes_created += 1;
            stats.properties_set += properties.len();
            trace!("MERGE created node {}", id);
            id
        }
    };

    if let Some(var) = &pattern.variable {
        bindings.nodes.insert(var.clone(), id);
    }
    Ok(id)
}

fn merge_edge(
    store: &mut GraphStore,
    pattern: &EdgePattern,
    start: NodeId,
    end: NodeId,
    bindings: &mut Bindings,
    stats: &mut QueryStats,
) -> ExecutionResult<EdgeId> {
    let edge_type = pattern
        .edge_type
        .clone()
        .ok_or_else(|| ExecutionError::RuntimeError("MERGE requires a relationship type".to_string()))?;

    let (source, target) = match pattern.direction {
        Direction::Incoming => (end, start),
        _ => (start, end),
    };

    let mut existing = store.find_edge(source, target, &edge_type).map(|e| e.id);
    if existing.is_none() && pattern.direction == Direction::Both {
        existing = store.find_edge(target, source, &edge_type).map(|e| e.id);
    }

    let id = match existing {
        Some(id) => id,
        None => {
            let id = store.create_edge(source, target, edge_type)?;
            stats.edges_created += 1;
            trace!("MERGE created edge {}", id);
            id
        }
    };

    if let Some(var) = &pattern.variable {
        bindings.edges.insert(var.clone(), id);
    }
    Ok(id)
}

/// `SET v.p = value`; a null value removes the property
fn apply_set(
    store: &mut GraphStore,
    item: &SetItem,
    params: &Params,
    bindings: &Bindings,
    stats: &mut QueryStats,
) -> ExecutionResult<()> {
    let record = bindings.snapshot(store);
    let value = resolve_operand(&item.value, params, &record)?;
    let key = item.target.property.as_str();

    if let Some(&node_id) = bindings.nodes.get(&item.target.variable) {
        if value.is_null() {
            if store.remove_node_property(node_id, key)?.is_some() {
                stats.properties_set += 1;
            }
        } else {
            store.set_node_property(node_id, key, value)?;
            stats.properties_set += 1;
        }
        return Ok(());
    }

    if let Some(&edge_id) = bindings.edges.get(&item.target.variable) {
        let edge = store
            .get_edge_mut(edge_id)
            .ok_or(crate::graph::GraphError::EdgeNotFound(edge_id))?;
        if value.is_null() {
            if edge.properties.remove(key).is_some() {
                stats.properties_set += 1;
            }
        } else {
            edge.set_property(key, value);
            stats.properties_set += 1;
        }
        return Ok(());
    }

    Err(ExecutionError::VariableNotFound(item.target.variable.clone()))
}

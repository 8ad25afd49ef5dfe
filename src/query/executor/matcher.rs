//! Pattern matching and predicate evaluation for MATCH

use super::record::{Record, Value};
use super::{ExecutionError, ExecutionResult, Params};
use crate::graph::{Edge, GraphStore, Node, PropertyValue};
use crate::query::ast::{ComparisonOp, Direction, NodePattern, Operand, PathPattern, Predicate, PropertyRef};
use std::cmp::Ordering;

/// Resolve an operand against the parameters and the current bindings
pub(crate) fn resolve_operand(operand: &Operand, params: &Params, record: &Record) -> ExecutionResult<PropertyValue> {
    match operand {
        Operand::Parameter(name) => params
            .get(name)
            .cloned()
            .ok_or_else(|| ExecutionError::MissingParameter(name.clone())),
        Operand::Literal(value) => Ok(value.clone()),
        Operand::Property(prop) => resolve_property(prop, record),
    }
}

pub(crate) fn resolve_property(prop: &PropertyRef, record: &Record) -> ExecutionResult<PropertyValue> {
    record
        .get(&prop.variable)
        .map(|value| value.property(&prop.property))
        .ok_or_else(|| ExecutionError::VariableNotFound(prop.variable.clone()))
}

/// Evaluate `left <op> right`. Nulls and mismatched types never match.
pub(crate) fn compare(left: &PropertyValue, op: ComparisonOp, right: &PropertyValue) -> bool {
    if left.is_null() || right.is_null() {
        return false;
    }

    match op {
        ComparisonOp::Contains | ComparisonOp::StartsWith | ComparisonOp::EndsWith => {
            let (Some(l), Some(r)) = (left.as_string(), right.as_string()) else {
                return false;
            };
            match op {
                ComparisonOp::Contains => l.contains(r),
                ComparisonOp::StartsWith => l.starts_with(r),
                _ => l.ends_with(r),
            }
        }
        _ => match left.compare(right) {
            Some(ordering) => match op {
                ComparisonOp::Eq => ordering == Ordering::Equal,
                ComparisonOp::Ne => ordering != Ordering::Equal,
                ComparisonOp::Lt => ordering == Ordering::Less,
                ComparisonOp::Le => ordering != Ordering::Greater,
                ComparisonOp::Gt => ordering == Ordering::Greater,
                ComparisonOp::Ge => ordering != Ordering::Less,
                _ => false,
            },
            None => false,
        },
    }
}

/// Evaluate every predicate against a record (conjunction)
pub(crate) fn satisfies(predicates: &[Predicate], params: &Params, record: &Record) -> ExecutionResult<bool> {
    for predicate in predicates {
        let left = resolve_property(&predicate.left, record)?;
        let right = resolve_operand(&predicate.right, params, record)?;
        if !compare(&left, predicate.op, &right) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Resolved `{key: value}` constraints of a node pattern
pub(crate) fn resolve_node_properties(
    pattern: &NodePattern,
    params: &Params,
    record: &Record,
) -> ExecutionResult<Vec<(String, PropertyValue)>> {
    pattern
        .properties
        .iter()
        .map(|(key, operand)| Ok((key.clone(), resolve_operand(operand, params, record)?)))
        .collect()
}

pub(crate) fn node_matches(node: &Node, pattern: &NodePattern, properties: &[(String, PropertyValue)]) -> bool {
    if let Some(label) = &pattern.label {
        if !node.has_label(label) {
            return false;
        }
    }
    properties
        .iter()
        .all(|(key, value)| node.get_property(key).map(|v| compare(v, ComparisonOp::Eq, value)).unwrap_or(false))
}

/// Candidate nodes for a pattern.
///
/// A label plus an indexed string key goes through the key index; otherwise
/// the label index, otherwise a full scan.
pub(crate) fn scan_nodes<'s>(
    store: &'s GraphStore,
    pattern: &NodePattern,
    properties: &[(String, PropertyValue)],
) -> Vec<&'s Node> {
    let candidates = match &pattern.label {
        Some(label) => {
            let indexed = properties
                .iter()
                .find(|(key, value)| value.as_string().is_some() && store.has_key_index(label, key));
            match indexed {
                Some((key, value)) => store.find_nodes_by_property(label, key, value),
                None => store.get_nodes_by_label(label),
            }
        }
        None => store.all_nodes(),
    };

    candidates
        .into_iter()
        .filter(|node| node_matches(node, pattern, properties))
        .collect()
}

/// Edges leaving `node` in the given direction, paired with the node at the other end
pub(crate) fn expand<'s>(store: &'s GraphStore, node: &Node, direction: Direction) -> Vec<(&'s Edge, &'s Node)> {
    let mut hops = Vec::new();
    if matches!(direction, Direction::Outgoing | Direction::Both) {
        for edge in store.get_outgoing_edges(node.id) {
            if let Some(target) = store.get_node(edge.target) {
                hops.push((edge, target));
            }
        }
    }
    if matches!(direction, Direction::Incoming | Direction::Both) {
        for edge in store.get_incoming_edges(node.id) {
            // a self-loop was already produced by the outgoing pass
            if direction == Direction::Both && edge.source == edge.target {
                continue;
            }
            if let Some(source) = store.get_node(edge.source) {
                hops.push((edge, source));
            }
        }
    }
    hops
}

/// All bindings of a path pattern in the store
pub(crate) fn match_path(store: &GraphStore, pattern: &PathPattern, params: &Params) -> ExecutionResult<Vec<Record>> {
    let empty = Record::new();
    let start_props = resolve_node_properties(&pattern.start, params, &empty)?;
    let starts = scan_nodes(store, &pattern.start, &start_props);

    let Some((edge_pattern, end_pattern)) = &pattern.hop else {
        return Ok(starts
            .into_iter()
            .map(|node| {
                let mut record = Record::new();
                if let Some(var) = &pattern.start.variable {
                    record.bind(var.clone(), Value::Node(node.id, node.clone()));
                }
                record
            })
            .collect());
    };

    let end_props = resolve_node_properties(end_pattern, params, &empty)?;
    let mut records = Vec::new();
    for start in starts {
        for (edge, other) in expand(store, start, edge_pattern.direction) {
            if let Some(edge_type) = &edge_pattern.edge_type {
                if &edge.edge_type != edge_type {
                    continue;
                }
            }
            if !node_matches(other, end_pattern, &end_props) {
                continue;
            }

            let mut record = Record::new();
            if let Some(var) = &pattern.start.variable {
                record.bind(var.clone(), Value::Node(start.id, start.clone()));
            }
            if let Some(var) = &edge_pattern.variable {
                record.bind(var.clone(), Value::Edge(edge.id, edge.clone()));
            }
            if let Some(var) = &end_pattern.variable {
                // (n)-[]-(n) only matches self-loops
                if let Some(bound) = record.get(var).and_then(Value::as_node) {
                    if bound.0 != other.id {
                        continue;
                    }
                }
                record.bind(var.clone(), Value::Node(other.id, other.clone()));
            }
            records.push(record);
        }
    }
    Ok(records)
}

//! In-memory property graph
//!
//! Holds the structured side of the connection network:
//! - `Person` and `Company` nodes with typed properties
//! - Directed `WORKS_AT` edges between them
//! - Label and key-property indices for MERGE-by-name lookups

pub mod edge;
pub mod node;
pub mod property;
pub mod store;
pub mod types;

// Re-export main types
pub use edge::Edge;
pub use node::Node;
pub use property::{PropertyMap, PropertyValue};
pub use store::{GraphError, GraphResult, GraphStatistics, GraphStore};
pub use types::{EdgeId, EdgeType, Label, NodeId};

/// Label used for connection nodes
pub const PERSON_LABEL: &str = "Person";
/// Label used for employer nodes
pub const COMPANY_LABEL: &str = "Company";
/// Relationship between a person and their employer
pub const WORKS_AT: &str = "WORKS_AT";

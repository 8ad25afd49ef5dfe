//! Key-property indexing
//!
//! Provides ordered string indices so MERGE-by-name and exact lookups
//! avoid scanning every node carrying a label.

pub mod key_index;
pub mod manager;

pub use key_index::KeyIndex;
pub use manager::{IndexManager, PropertyIndexKey};

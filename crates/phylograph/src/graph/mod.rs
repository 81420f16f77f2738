//! Core graph types and operations.
//!
//! This module defines the fundamental building blocks:
//! - [`Node`]: Tree nodes, source metadata, taxa and match records
//! - [`Edge`]: Directed relationships between nodes
//! - [`TreeGraph`]: The transactional property graph holding them

mod journal;
mod property;
mod treegraph;
mod types;
pub mod algorithms;

pub use property::{PropertyMap, PropertyType, PropertyValue};
pub use treegraph::TreeGraph;
pub use types::{Direction, Edge, EdgeId, EdgeType, Node, NodeId, NodeKind};

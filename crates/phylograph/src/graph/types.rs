//! Core graph types: nodes, edges, IDs, and enums.

use super::property::{PropertyMap, PropertyValue};
use serde::{Deserialize, Serialize};

/// Unique identifier for a node (monotonic counter).
pub type NodeId = u64;

/// Unique identifier for an edge (monotonic counter).
pub type EdgeId = u64;

/// Kind of entity a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Node of a phylogenetic tree (root, internal node or tip)
    TreeNode,
    /// Metadata of one source (study)
    SourceMeta,
    /// Node of the reference taxonomy
    Taxon,
    /// One candidate name returned by taxonomic name resolution
    TnrsMatch,
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeKind::TreeNode => write!(f, "TreeNode"),
            NodeKind::SourceMeta => write!(f, "SourceMeta"),
            NodeKind::Taxon => write!(f, "Taxon"),
            NodeKind::TnrsMatch => write!(f, "TnrsMatch"),
        }
    }
}

/// Type of edge (relationship) between nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeType {
    /// Tree node A is a child of tree node B
    ChildOf,
    /// Source metadata owns a tree root (meta -> root)
    MetadataFor,
    /// Working-copy root duplicates an original root (working -> original)
    WorkingCopyOf,
    /// Local source metadata mirrors remote metadata (local -> remote)
    LocalCopyOf,
    /// Tip is an exemplar of a taxonomy node (tip -> taxon)
    ExemplarOf,
    /// Name-resolution candidate for a tip (match -> tip)
    TnrsMatchFor,
}

impl std::fmt::Display for EdgeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EdgeType::ChildOf => write!(f, "ChildOf"),
            EdgeType::MetadataFor => write!(f, "MetadataFor"),
            EdgeType::WorkingCopyOf => write!(f, "WorkingCopyOf"),
            EdgeType::LocalCopyOf => write!(f, "LocalCopyOf"),
            EdgeType::ExemplarOf => write!(f, "ExemplarOf"),
            EdgeType::TnrsMatchFor => write!(f, "TnrsMatchFor"),
        }
    }
}

/// Direction for neighbor queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Follow outgoing edges (from this node)
    Outgoing,
    /// Follow incoming edges (to this node)
    Incoming,
    /// Follow edges in both directions
    Both,
}

/// A node in the tree graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier (assigned by graph)
    pub id: NodeId,
    /// Kind of entity
    pub kind: NodeKind,
    /// Flexible key-value metadata
    pub properties: PropertyMap,
}

impl Node {
    /// Create a new node (ID will be assigned by graph).
    pub fn new(id: NodeId, kind: NodeKind, properties: PropertyMap) -> Self {
        Self {
            id,
            kind,
            properties,
        }
    }

    /// Add or update a property.
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        self.properties.insert(key, value);
    }

    /// Get a property value.
    pub fn get_property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// The node's `name` property, if it is a string.
    pub fn name(&self) -> Option<&str> {
        self.properties.get_string(crate::store::keys::NAME)
    }
}

/// A directed edge in the tree graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Unique identifier (assigned by graph)
    pub id: EdgeId,
    /// Source node ID
    pub source_id: NodeId,
    /// Target node ID
    pub target_id: NodeId,
    /// Type of relationship
    pub edge_type: EdgeType,
    /// Optional metadata (e.g., branch length on a ChildOf edge)
    pub properties: PropertyMap,
}

impl Edge {
    /// Create a new edge (ID will be assigned by graph).
    pub fn new(
        id: EdgeId,
        source_id: NodeId,
        target_id: NodeId,
        edge_type: EdgeType,
        properties: PropertyMap,
    ) -> Self {
        Self {
            id,
            source_id,
            target_id,
            edge_type,
            properties,
        }
    }
}

//! Error types for tree store operations.
//!
//! All fallible operations return [`Result<T>`]. Lookup misses are reported as
//! `None` or empty collections by the browsing API; the variants here cover
//! faults and refused mutations.

use thiserror::Error;

/// Result type alias for tree store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Error type for all store, index and editing operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Storage backend error (RocksDB, file I/O, etc.)
    #[error("Storage error: {message}")]
    Storage {
        /// Detailed error message
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error details
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Node not found in the graph
    #[error("Node not found: {node_id}")]
    NodeNotFound {
        /// ID of the missing node
        node_id: String,
    },

    /// Edge not found in the graph
    #[error("Edge not found: {edge_id}")]
    EdgeNotFound {
        /// ID of the missing edge
        edge_id: String,
    },

    /// Operation not valid in the current state of the graph
    #[error("Invalid operation: {message}")]
    InvalidOperation {
        /// Description of what went wrong
        message: String,
    },

    /// Caller supplied an argument that cannot be applied
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the rejected argument
        message: String,
    },

    /// A source with this id already exists at this location
    #[error("Source '{source_id}' already exists at location '{location}'")]
    DuplicateSource {
        /// Location of the existing source
        location: String,
        /// Id of the existing source
        source_id: String,
    },

    /// A tree with this id already exists at this location
    #[error("Tree '{tree_id}' already exists at location '{location}'")]
    DuplicateTree {
        /// Location of the existing tree
        location: String,
        /// Id of the existing tree
        tree_id: String,
    },

    /// The node is not part of a phylogenetic tree
    #[error("Node {node_id} is not a tree node")]
    NotATreeNode {
        /// Offending node id
        node_id: String,
    },

    /// The node is not (or is not attached to) a flagged tree root
    #[error("Node {node_id} is not a tree root")]
    NotATreeRoot {
        /// Offending node id
        node_id: String,
    },

    /// The node is not a source metadata node
    #[error("Node {node_id} is not a source metadata node")]
    NotASourceMeta {
        /// Offending node id
        node_id: String,
    },

    /// A working copy is already outstanding for this tree
    #[error("Tree '{tree_id}' already has a working copy")]
    WorkingCopyExists {
        /// Id of the tree being copied
        tree_id: String,
    },

    /// The root has no working-copy link to an original
    #[error("Node {node_id} is not the root of a working copy")]
    NotAWorkingCopy {
        /// Offending node id
        node_id: String,
    },

    /// The property is maintained by the store and cannot be set directly
    #[error("Property '{key}' is protected")]
    ProtectedProperty {
        /// Protected key
        key: String,
    },

    /// The parent chain violates the rooted-tree shape
    #[error("Malformed tree: {message}")]
    MalformedTree {
        /// What was found
        message: String,
    },
}

impl StoreError {
    /// Create a storage error from a message and optional source.
    pub fn storage<E>(message: impl Into<String>, source: Option<E>) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            message: message.into(),
            source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
        }
    }

    /// Create a serialization error from a message and optional source.
    pub fn serialization<E>(message: impl Into<String>, source: Option<E>) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Serialization {
            message: message.into(),
            source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
        }
    }

    /// Create an invalid-argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create an invalid-operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }
}

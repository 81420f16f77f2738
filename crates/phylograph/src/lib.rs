//! # phylograph
//!
//! A graph-native storage and editing engine for curated phylogenetic trees.
//!
//! ## Core Principles
//!
//! - **Parser Agnostic**: Bring your own Newick/NexSON parser, we store the trees
//! - **Atomic Edits**: Every mutation commits fully or leaves the store untouched
//! - **Indexed Lookup**: Sources and trees are found by id, taxon and metadata
//! - **Persistence Primary**: Durable storage with RocksDB
//!
//! ## Architecture
//!
//! phylograph is organized in layers:
//!
//! ```text
//! Curation tools (web services, name resolution clients)
//!     ↓
//! TreeStore (ingest, delete, properties) / TreeEditor / SourceBrowser
//!     ↓
//! Indexes (ids, taxon names, metadata, fuzzy search)
//!     ↓
//! TreeGraph (nodes, edges, transactions, traversals)
//!     ↓
//! Storage Backend (RocksDB, memory)
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use phylograph::input::{InputNode, InputTree, SourceInput};
//! use phylograph::{StoreConfig, TreeStore};
//!
//! let mut store = TreeStore::open("./trees.db", StoreConfig::default()).unwrap();
//!
//! // Parsing is up to the caller
//! let tree = InputTree::new(InputNode::internal(vec![
//!     InputNode::internal(vec![InputNode::leaf("A"), InputNode::leaf("B")]),
//!     InputNode::leaf("C"),
//! ]));
//! let source = SourceInput::new("pg_420").with_tree(tree);
//! store.add_source(&source, "local", false).unwrap();
//!
//! let root = store.browser().tree_root("local", "pg_420___local_id_0").unwrap();
//! let tip_c = store.graph().children(root)[1];
//! let new_root = store.editor().reroot(tip_c).unwrap();
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod browser;
pub mod config;
pub mod editor;
pub mod error;
pub mod export;
pub mod graph;
pub mod index;
pub mod input;
pub mod query;
pub mod storage;
pub mod store;

// Re-export main types
pub use browser::{SourceBrowser, SourceSummary, TreeSummary};
pub use config::StoreConfig;
pub use editor::{TreeEditor, WorkingCopy};
pub use error::{Result, StoreError};
pub use graph::{
    Direction, Edge, EdgeId, EdgeType, Node, NodeId, NodeKind, PropertyMap, PropertyType,
    PropertyValue, TreeGraph,
};
pub use index::SearchableProperty;
pub use query::TreeQuery;
pub use storage::{MemoryBackend, StorageBackend};
#[cfg(feature = "rocksdb-backend")]
pub use storage::RocksDBBackend;
pub use store::{RemoteRegistry, TipTaxa, TnrsMatch, TreeStore};

//! The tree store: graph, indexes, configuration and remotes in one context.
//!
//! [`TreeStore`] owns every component. Reads go through
//! [`TreeStore::browser`], structural edits through [`TreeStore::editor`], and
//! ingestion, deletion and property mutation are methods on the store itself.
//! Every mutating call runs inside one transaction covering the graph and the
//! indexes.

mod ingest;
pub mod keys;
mod properties;
mod remotes;
mod taxonomy;
mod tip_taxa;

pub use remotes::RemoteRegistry;
pub use taxonomy::TnrsMatch;
pub use tip_taxa::TipTaxa;

use crate::browser::SourceBrowser;
use crate::config::StoreConfig;
use crate::editor::TreeEditor;
use crate::error::{Result, StoreError};
use crate::graph::{Direction, EdgeType, NodeId, NodeKind, TreeGraph};
use crate::index::{source_id_field, IndexManager, IndexName, OTT_ID_FIELD};
use crate::storage::StorageBackend;
use log::{info, warn};

/// Storage and mutation engine for source metadata and phylogenetic trees.
pub struct TreeStore {
    pub(crate) graph: TreeGraph,
    pub(crate) indexes: IndexManager,
    pub(crate) config: StoreConfig,
    pub(crate) remotes: RemoteRegistry,
    tx_depth: usize,
    rollback_only: bool,
}

impl TreeStore {
    /// Open a store over the given storage backend.
    ///
    /// Indexes and the remote registry are rebuilt from the persisted graph.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`] or [`StoreError::Serialization`] if the
    /// persisted records cannot be read.
    pub fn with_backend(backend: Box<dyn StorageBackend>, config: StoreConfig) -> Result<Self> {
        let graph = TreeGraph::with_backend(backend)?;
        let remotes = RemoteRegistry::load(&graph);
        let mut store = Self {
            graph,
            indexes: IndexManager::new(),
            config,
            remotes,
            tx_depth: 0,
            rollback_only: false,
        };
        store.rebuild_indexes();
        info!(
            "Opened tree store: {} nodes, {} known remotes",
            store.graph.node_count(),
            store.remotes.list().len()
        );
        Ok(store)
    }

    /// Open a persistent store at the given path.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use phylograph::{StoreConfig, TreeStore};
    ///
    /// let store = TreeStore::open("./trees.db", StoreConfig::default()).unwrap();
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`] if the database cannot be opened.
    #[cfg(feature = "rocksdb-backend")]
    pub fn open<P: AsRef<std::path::Path>>(path: P, config: StoreConfig) -> Result<Self> {
        use crate::storage::RocksDBBackend;
        info!("Opening tree store at path: {:?}", path.as_ref());
        let backend = RocksDBBackend::open(path)?.with_sync_writes(config.sync_writes);
        Self::with_backend(Box::new(backend), config)
    }

    /// Create a store over a fresh in-memory backend.
    pub fn in_memory() -> Result<Self> {
        Self::in_memory_with_config(StoreConfig::default())
    }

    /// Create an in-memory store with a custom configuration.
    pub fn in_memory_with_config(config: StoreConfig) -> Result<Self> {
        use crate::storage::MemoryBackend;
        Self::with_backend(Box::new(MemoryBackend::new()), config)
    }

    /// Read-only lookups and search.
    pub fn browser(&self) -> SourceBrowser<'_> {
        SourceBrowser::new(self)
    }

    /// Structural edits: rerooting, ingroup designation, working copies.
    pub fn editor(&mut self) -> TreeEditor<'_> {
        TreeEditor::new(self)
    }

    /// The underlying graph.
    pub fn graph(&self) -> &TreeGraph {
        &self.graph
    }

    /// The secondary indexes.
    pub fn indexes(&self) -> &IndexManager {
        &self.indexes
    }

    /// The configuration the store was opened with.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The known remote locations.
    pub fn remotes(&self) -> &RemoteRegistry {
        &self.remotes
    }

    /// Flush buffered writes of the storage engine.
    pub fn flush(&mut self) -> Result<()> {
        self.graph.flush()
    }

    /// Close the store, flushing buffered writes.
    pub fn close(mut self) -> Result<()> {
        self.flush()
    }

    /// Run `f` as one transaction over graph and indexes.
    ///
    /// Nested calls join the outer transaction. A failure anywhere marks the
    /// whole transaction for rollback.
    pub(crate) fn atomically<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.tx_depth > 0 {
            self.tx_depth += 1;
            let result = f(self);
            self.tx_depth -= 1;
            if result.is_err() {
                self.rollback_only = true;
            }
            return result;
        }

        self.graph.begin()?;
        self.indexes.begin();
        self.tx_depth = 1;
        self.rollback_only = false;

        let result = f(self);
        self.tx_depth = 0;

        match result {
            Ok(value) if !self.rollback_only => match self.graph.commit() {
                Ok(()) => {
                    self.indexes.commit();
                    Ok(value)
                }
                Err(e) => {
                    // The graph rolled itself back
                    self.indexes.rollback();
                    self.remotes = RemoteRegistry::load(&self.graph);
                    Err(e)
                }
            },
            Ok(_) => {
                self.abort();
                Err(StoreError::invalid_operation(
                    "Transaction was marked rollback-only by a failed inner operation",
                ))
            }
            Err(e) => {
                self.abort();
                Err(e)
            }
        }
    }

    fn abort(&mut self) {
        warn!("Rolling back transaction");
        self.graph.rollback();
        self.indexes.rollback();
        self.remotes = RemoteRegistry::load(&self.graph);
        self.rollback_only = false;
    }

    fn rebuild_indexes(&mut self) {
        let mut indexes = IndexManager::new();
        for node in self.graph.nodes() {
            match node.kind {
                NodeKind::SourceMeta => indexes.add_source(node, &self.config),
                NodeKind::TreeNode => {
                    let linked = self
                        .graph
                        .first_incoming(node.id, EdgeType::MetadataFor)
                        .is_some();
                    if node.properties.flag(keys::IS_ROOT) && linked {
                        indexes.add_tree_root(node, &self.config);
                    }
                }
                NodeKind::Taxon => {
                    if let Some(ott_id) = node.properties.get_int(keys::OT_OTT_ID) {
                        indexes.add(
                            IndexName::TaxonByOttId,
                            node.id,
                            OTT_ID_FIELD,
                            ott_id.to_string(),
                        );
                    }
                }
                NodeKind::TnrsMatch => {}
            }
        }
        self.indexes = indexes;
    }

    // ===== Shared lookups =====

    /// Metadata node of the source `(location, source_id)`.
    pub(crate) fn source_meta(&self, location: &str, source_id: &str) -> Option<NodeId> {
        self.indexes.get_single(
            IndexName::SourceBySourceId,
            &source_id_field(location),
            source_id,
        )
    }

    /// Metadata nodes of every remote copy of `source_id`.
    pub(crate) fn remote_source_metas(&self, source_id: &str) -> Vec<NodeId> {
        self.remotes
            .list()
            .iter()
            .filter(|remote| !self.config.is_local(remote))
            .filter_map(|remote| self.source_meta(remote, source_id))
            .collect()
    }

    /// Require `node` to be a tree node.
    pub(crate) fn require_tree_node(&self, node: NodeId) -> Result<()> {
        match self.graph.get_node(node)?.kind {
            NodeKind::TreeNode => Ok(()),
            _ => Err(StoreError::NotATreeNode {
                node_id: node.to_string(),
            }),
        }
    }

    /// Require `node` to be a flagged tree root.
    pub(crate) fn require_tree_root(&self, node: NodeId) -> Result<()> {
        self.require_tree_node(node)?;
        let flagged = self.graph.get_node(node)?.properties.flag(keys::IS_ROOT);
        if !flagged || self.graph.parent(node).is_some() {
            return Err(StoreError::NotATreeRoot {
                node_id: node.to_string(),
            });
        }
        Ok(())
    }

    /// Require `node` to be source metadata.
    pub(crate) fn require_source_meta(&self, node: NodeId) -> Result<()> {
        match self.graph.get_node(node)?.kind {
            NodeKind::SourceMeta => Ok(()),
            _ => Err(StoreError::NotASourceMeta {
                node_id: node.to_string(),
            }),
        }
    }

    /// Flagged root of the tree containing `node`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotATreeRoot`] if the top of the parent chain is
    /// not flagged as a root.
    pub(crate) fn tree_root_of(&self, node: NodeId) -> Result<NodeId> {
        self.require_tree_node(node)?;
        let root = crate::graph::algorithms::root_of(&self.graph, node)?;
        if !self.graph.get_node(root)?.properties.flag(keys::IS_ROOT) {
            return Err(StoreError::NotATreeRoot {
                node_id: root.to_string(),
            });
        }
        Ok(root)
    }

    /// Source metadata node owning the tree rooted at `root`.
    pub(crate) fn metadata_of(&self, root: NodeId) -> Option<NodeId> {
        self.graph
            .edges_of(root, Direction::Incoming, Some(EdgeType::MetadataFor))
            .first()
            .map(|edge| edge.source_id)
    }

    /// Remove a tree root from the indexes and add it back with its current state.
    pub(crate) fn reindex_tree_root(&mut self, root: NodeId) -> Result<()> {
        self.indexes.remove_node(root);
        let node = self.graph.get_node(root)?;
        self.indexes.add_tree_root(node, &self.config);
        Ok(())
    }

    /// Remove a source from the indexes and add it back with its current state.
    pub(crate) fn reindex_source(&mut self, meta: NodeId) -> Result<()> {
        self.indexes.remove_node(meta);
        let node = self.graph.get_node(meta)?;
        self.indexes.add_source(node, &self.config);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::PropertyMap;
    use crate::storage::MemoryBackend;

    #[test]
    fn test_atomically_rolls_back_on_error() {
        let mut store = TreeStore::in_memory().unwrap();
        let result: Result<()> = store.atomically(|store| {
            let id = store.graph.add_node(NodeKind::Taxon, PropertyMap::new())?;
            store.indexes.add(IndexName::TaxonByOttId, id, OTT_ID_FIELD, "1");
            Err(StoreError::invalid_argument("abort"))
        });

        assert!(result.is_err());
        assert_eq!(store.graph.node_count(), 0);
        assert!(store.indexes.get(IndexName::TaxonByOttId, OTT_ID_FIELD, "1").is_empty());
    }

    #[test]
    fn test_inner_failure_marks_rollback_only() {
        let mut store = TreeStore::in_memory().unwrap();
        let result = store.atomically(|store| {
            store.graph.add_node(NodeKind::Taxon, PropertyMap::new())?;
            let inner: Result<()> =
                store.atomically(|_| Err(StoreError::invalid_argument("inner")));
            assert!(inner.is_err());
            Ok(())
        });

        assert!(matches!(result, Err(StoreError::InvalidOperation { .. })));
        assert_eq!(store.graph.node_count(), 0);
    }

    #[test]
    fn test_commit_failure_rolls_back_indexes() {
        let backend = MemoryBackend::new();
        let handle = backend.clone();
        let mut store = TreeStore::with_backend(Box::new(backend), StoreConfig::default()).unwrap();

        handle.fail_next_batch();
        let result = store.atomically(|store| {
            let id = store.graph.add_node(NodeKind::Taxon, PropertyMap::new())?;
            store.indexes.add(IndexName::TaxonByOttId, id, OTT_ID_FIELD, "1");
            store.remotes.register(&mut store.graph, "treebase")?;
            Ok(())
        });

        assert!(matches!(result, Err(StoreError::Storage { .. })));
        assert_eq!(store.graph.node_count(), 0);
        assert!(!store.indexes.is_indexed(0));
        assert!(store.remotes.list().is_empty());
    }
}

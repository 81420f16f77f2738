//! Structural edits on stored trees.
//!
//! [`TreeEditor`] borrows the store mutably and runs each edit as one
//! transaction. The edit logic lives in free functions over the store so
//! that ingestion can reuse it inside its own transaction.

pub(crate) mod ingroup;
mod reroot;
mod working_copy;

pub use working_copy::WorkingCopy;

use crate::error::Result;
use crate::graph::NodeId;
use crate::store::TreeStore;

/// Reroots trees, designates ingroups and manages working copies.
///
/// # Examples
///
/// ```
/// use phylograph::input::{InputNode, InputTree, SourceInput};
/// use phylograph::TreeStore;
///
/// let mut store = TreeStore::in_memory().unwrap();
/// let tree = InputTree::new(InputNode::internal(vec![
///     InputNode::internal(vec![InputNode::leaf("A"), InputNode::leaf("B")]),
///     InputNode::leaf("C"),
/// ]));
/// store.add_source(&SourceInput::new("S1").with_tree(tree), "local", false).unwrap();
///
/// let root = store.browser().tree_root("local", "S1___local_id_0").unwrap();
/// let copy = store.editor().make_working_copy(root, None).unwrap();
/// let original = store.editor().discard_working_copy(copy.root).unwrap();
/// assert_eq!(original, root);
/// ```
pub struct TreeEditor<'a> {
    store: &'a mut TreeStore,
}

impl<'a> TreeEditor<'a> {
    pub(crate) fn new(store: &'a mut TreeStore) -> Self {
        Self { store }
    }

    /// Reroot the tree containing `node` on that node.
    ///
    /// # Returns
    ///
    /// - `node` itself if it already is the root (rooting is marked as confirmed)
    /// - the new root on success
    /// - the unchanged old root if the reroot was refused because the root has
    ///   two children and no clade off the path to `node` can be dissolved
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotATreeNode`](crate::StoreError::NotATreeNode)
    /// if `node` is not a tree node.
    pub fn reroot(&mut self, node: NodeId) -> Result<NodeId> {
        self.store.atomically(|store| reroot::reroot(store, node))
    }

    /// Mark `node` and its descendants as the ingroup of their tree.
    ///
    /// Any earlier designation on the same tree is replaced.
    pub fn designate_ingroup(&mut self, node: NodeId) -> Result<()> {
        self.store
            .atomically(|store| ingroup::designate(store, node))
    }

    /// Duplicate a saved tree into an editable working copy.
    ///
    /// The source metadata moves to the copy. If `node_of_interest` names a
    /// node of the original, its counterpart in the copy is reported.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::WorkingCopyExists`](crate::StoreError::WorkingCopyExists)
    /// if the tree already has a working copy.
    pub fn make_working_copy(
        &mut self,
        original: NodeId,
        node_of_interest: Option<NodeId>,
    ) -> Result<WorkingCopy> {
        self.store
            .atomically(|store| working_copy::make(store, original, node_of_interest))
    }

    /// Drop a working copy and restore its original. Returns the original root.
    pub fn discard_working_copy(&mut self, working: NodeId) -> Result<NodeId> {
        self.store
            .atomically(|store| working_copy::discard(store, working))
    }

    /// Replace the original with the working copy. Returns the saved root.
    pub fn save_working_copy(&mut self, working: NodeId) -> Result<NodeId> {
        self.store
            .atomically(|store| working_copy::save(store, working))
    }
}

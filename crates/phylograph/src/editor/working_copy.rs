//! Working-copy lifecycle: copy a saved tree, then save or discard the copy.

use crate::error::{Result, StoreError};
use crate::graph::{algorithms, Direction, EdgeType, NodeId, NodeKind, PropertyMap};
use crate::store::{keys, TreeStore};
use log::{debug, info};
use std::collections::HashMap;

/// Result of duplicating a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkingCopy {
    /// Root of the new working copy
    pub root: NodeId,
    /// Counterpart of the requested node of interest, if one was given
    pub node_of_interest: Option<NodeId>,
}

fn tree_id_of(store: &TreeStore, root: NodeId) -> String {
    store
        .graph
        .node(root)
        .and_then(|node| node.properties.get_string(keys::TREE_ID))
        .unwrap_or_default()
        .to_string()
}

/// The original a working copy points at.
fn original_of(store: &TreeStore, working: NodeId) -> Result<(NodeId, crate::graph::EdgeId)> {
    store.require_tree_root(working)?;
    store
        .graph
        .first_outgoing(working, EdgeType::WorkingCopyOf)
        .map(|edge| (edge.target_id, edge.id))
        .ok_or_else(|| StoreError::NotAWorkingCopy {
            node_id: working.to_string(),
        })
}

pub(crate) fn make(
    store: &mut TreeStore,
    original: NodeId,
    node_of_interest: Option<NodeId>,
) -> Result<WorkingCopy> {
    store.require_tree_root(original)?;
    if store
        .graph
        .first_incoming(original, EdgeType::WorkingCopyOf)
        .is_some()
    {
        return Err(StoreError::WorkingCopyExists {
            tree_id: tree_id_of(store, original),
        });
    }
    if store
        .graph
        .first_outgoing(original, EdgeType::WorkingCopyOf)
        .is_some()
    {
        return Err(StoreError::invalid_operation(format!(
            "Tree root {original} is already a working copy"
        )));
    }

    let nodes = algorithms::subtree(&store.graph, original)?;
    let mut copies: HashMap<NodeId, NodeId> = HashMap::with_capacity(nodes.len());

    // Breadth-first, so every parent is copied before its children
    for &old in &nodes {
        let props = store.graph.get_node(old)?.properties.clone();
        let new = store.graph.add_node(NodeKind::TreeNode, props)?;
        copies.insert(old, new);

        let parent_edge = store
            .graph
            .first_outgoing(old, EdgeType::ChildOf)
            .map(|edge| (edge.target_id, edge.properties.clone()));
        if let Some((old_parent, edge_props)) = parent_edge {
            if let Some(&new_parent) = copies.get(&old_parent) {
                store
                    .graph
                    .add_edge(new, new_parent, EdgeType::ChildOf, edge_props)?;
            }
        }

        copy_attachments(store, old, new)?;
    }

    let root = copies.get(&original).copied().ok_or_else(|| StoreError::MalformedTree {
        message: format!("Tree root {original} was not copied"),
    })?;

    store.graph.remove_node_property(root, keys::IS_SAVED_COPY)?;
    store.graph.set_node_property(root, keys::IS_WORKING_COPY, true)?;
    let ingroup = store
        .graph
        .get_node(root)?
        .properties
        .get_int(keys::INGROUP_NODE_ID);
    if let Some(ingroup) = ingroup {
        if let Some(&copied) = copies.get(&(ingroup as NodeId)) {
            store
                .graph
                .set_node_property(root, keys::INGROUP_NODE_ID, copied as i64)?;
        }
    }

    store
        .graph
        .add_edge(root, original, EdgeType::WorkingCopyOf, PropertyMap::new())?;
    move_metadata_link(store, original, root)?;

    store.indexes.remove_node(original);
    store.reindex_tree_root(root)?;

    let node_of_interest = match node_of_interest {
        Some(node) => Some(copies.get(&node).copied().ok_or_else(|| {
            StoreError::invalid_argument(format!(
                "Node {node} is not part of the tree rooted at {original}"
            ))
        })?),
        None => None,
    };

    info!(
        "Created working copy {root} of tree '{}' ({} nodes)",
        tree_id_of(store, root),
        nodes.len()
    );
    Ok(WorkingCopy {
        root,
        node_of_interest,
    })
}

/// Copy taxonomy links and name-resolution records of `old` onto `new`.
fn copy_attachments(store: &mut TreeStore, old: NodeId, new: NodeId) -> Result<()> {
    for taxon in store
        .graph
        .get_neighbors(old, Direction::Outgoing, EdgeType::ExemplarOf)?
    {
        store
            .graph
            .add_edge(new, taxon, EdgeType::ExemplarOf, PropertyMap::new())?;
    }

    for record in store
        .graph
        .get_neighbors(old, Direction::Incoming, EdgeType::TnrsMatchFor)?
    {
        let props = store.graph.get_node(record)?.properties.clone();
        let copy = store.graph.add_node(NodeKind::TnrsMatch, props)?;
        store
            .graph
            .add_edge(copy, new, EdgeType::TnrsMatchFor, PropertyMap::new())?;
    }
    Ok(())
}

fn move_metadata_link(store: &mut TreeStore, from: NodeId, to: NodeId) -> Result<()> {
    let link = store
        .graph
        .first_incoming(from, EdgeType::MetadataFor)
        .map(|edge| (edge.id, edge.source_id));
    if let Some((edge_id, meta)) = link {
        store.graph.delete_edge(edge_id)?;
        store
            .graph
            .add_edge(meta, to, EdgeType::MetadataFor, PropertyMap::new())?;
    }
    Ok(())
}

pub(crate) fn discard(store: &mut TreeStore, working: NodeId) -> Result<NodeId> {
    let (original, _) = original_of(store, working)?;

    move_metadata_link(store, working, original)?;
    store.reindex_tree_root(original)?;
    store.delete_tree_nodes(working)?;

    debug!("Discarded working copy {working}; restored {original}");
    Ok(original)
}

pub(crate) fn save(store: &mut TreeStore, working: NodeId) -> Result<NodeId> {
    let (original, link) = original_of(store, working)?;

    store.graph.delete_edge(link)?;
    store.delete_tree_nodes(original)?;

    store.graph.remove_node_property(working, keys::IS_WORKING_COPY)?;
    store.graph.set_node_property(working, keys::IS_SAVED_COPY, true)?;
    store.reindex_tree_root(working)?;

    info!(
        "Saved working copy {working} as tree '{}'",
        tree_id_of(store, working)
    );
    Ok(working)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{tree_id_field, IndexName};
    use crate::input::{InputNode, InputTree, SourceInput};

    fn store_with_tree() -> (TreeStore, NodeId, NodeId) {
        let mut store = TreeStore::in_memory().unwrap();
        let tree = InputTree::new(InputNode::internal(vec![
            InputNode::internal(vec![InputNode::leaf("A"), InputNode::leaf("B")])
                .as_ingroup_root(),
            InputNode::leaf("C").with_branch_length(0.5),
        ]))
        .with_id("t1");
        let meta = store
            .add_source(&SourceInput::new("S1").with_tree(tree), "local", false)
            .unwrap();
        let root = store
            .graph
            .get_neighbors(meta, Direction::Outgoing, EdgeType::MetadataFor)
            .unwrap()[0];
        (store, meta, root)
    }

    fn indexed_root(store: &TreeStore) -> Option<NodeId> {
        store
            .indexes
            .get_single(IndexName::TreeByTreeId, &tree_id_field("local"), "S1_t1")
    }

    #[test]
    fn test_copy_is_disjoint_and_owns_metadata() {
        let (mut store, meta, root) = store_with_tree();
        let nodes_before = store.graph.node_count();

        let copy = store.editor().make_working_copy(root, None).unwrap();

        assert_eq!(store.graph.node_count(), nodes_before * 2 - 1);
        assert_eq!(
            store
                .graph
                .get_neighbors(meta, Direction::Outgoing, EdgeType::MetadataFor)
                .unwrap(),
            vec![copy.root]
        );
        assert_eq!(indexed_root(&store), Some(copy.root));

        let props = &store.graph.get_node(copy.root).unwrap().properties;
        assert!(props.flag(keys::IS_WORKING_COPY));
        assert!(!props.contains_key(keys::IS_SAVED_COPY));

        // Ingroup reference follows the copy
        let ingroup = props.get_int(keys::INGROUP_NODE_ID).unwrap() as NodeId;
        assert_eq!(store.graph.parent(ingroup), Some(copy.root));
    }

    #[test]
    fn test_copy_keeps_branch_lengths() {
        let (mut store, _, root) = store_with_tree();
        let copy = store.editor().make_working_copy(root, None).unwrap();
        let tip_c = store.graph.children(copy.root)[1];
        let edge = store.graph.first_outgoing(tip_c, EdgeType::ChildOf).unwrap();
        assert_eq!(edge.properties.get_float(keys::BRANCH_LENGTH), Some(0.5));
    }

    #[test]
    fn test_node_of_interest_is_followed() {
        let (mut store, _, root) = store_with_tree();
        let tip_c = store.graph.children(root)[1];

        let copy = store.editor().make_working_copy(root, Some(tip_c)).unwrap();
        let followed = copy.node_of_interest.unwrap();
        assert_ne!(followed, tip_c);
        assert_eq!(store.graph.get_node(followed).unwrap().name(), Some("C"));
    }

    #[test]
    fn test_second_copy_is_rejected() {
        let (mut store, _, root) = store_with_tree();
        let copy = store.editor().make_working_copy(root, None).unwrap();

        assert!(matches!(
            store.editor().make_working_copy(root, None),
            Err(StoreError::WorkingCopyExists { .. })
        ));
        assert!(matches!(
            store.editor().make_working_copy(copy.root, None),
            Err(StoreError::InvalidOperation { .. })
        ));
    }

    #[test]
    fn test_discard_restores_original() {
        let (mut store, meta, root) = store_with_tree();
        let nodes_before = store.graph.node_count();
        let copy = store.editor().make_working_copy(root, None).unwrap();

        assert_eq!(store.editor().discard_working_copy(copy.root).unwrap(), root);
        assert_eq!(store.graph.node_count(), nodes_before);
        assert_eq!(indexed_root(&store), Some(root));
        assert_eq!(store.metadata_of(root), Some(meta));
    }

    #[test]
    fn test_save_replaces_original() {
        let (mut store, meta, root) = store_with_tree();
        let nodes_before = store.graph.node_count();
        let copy = store.editor().make_working_copy(root, None).unwrap();

        assert_eq!(store.editor().save_working_copy(copy.root).unwrap(), copy.root);
        assert!(!store.graph.contains_node(root));
        assert_eq!(store.graph.node_count(), nodes_before);
        assert_eq!(indexed_root(&store), Some(copy.root));
        assert_eq!(store.metadata_of(copy.root), Some(meta));

        let props = &store.graph.get_node(copy.root).unwrap().properties;
        assert!(props.flag(keys::IS_SAVED_COPY));
        assert!(!props.contains_key(keys::IS_WORKING_COPY));
    }

    #[test]
    fn test_discard_requires_working_copy() {
        let (mut store, _, root) = store_with_tree();
        assert!(matches!(
            store.editor().discard_working_copy(root),
            Err(StoreError::NotAWorkingCopy { .. })
        ));
        assert!(matches!(
            store.editor().save_working_copy(root),
            Err(StoreError::NotAWorkingCopy { .. })
        ));
    }
}

use crate::error::Result;
use crate::graph::{algorithms, NodeId, PropertyMap};
use crate::store::{keys, TreeStore};
use log::debug;

/// Designate `node` as the ingroup root of its tree.
pub(crate) fn designate(store: &mut TreeStore, node: NodeId) -> Result<()> {
    store.require_tree_node(node)?;
    let root = algorithms::root_of(&store.graph, node)?;

    let root_props = PropertyMap::new()
        .with(keys::INGROUP_IS_SET, true)
        .with(keys::INGROUP_NODE_ID, node as i64);
    store.graph.update_node_properties(root, &root_props)?;

    clear_marks(store, root)?;
    for id in algorithms::subtree(&store.graph, node)? {
        store.graph.set_node_property(id, keys::WITHIN_INGROUP, true)?;
    }
    store.graph.set_node_property(node, keys::INGROUP_START, true)?;

    debug!("Designated node {node} as ingroup of tree {root}");
    Ok(())
}

/// Remove ingroup membership flags from every node below `root`.
pub(crate) fn clear_marks(store: &mut TreeStore, root: NodeId) -> Result<()> {
    for id in algorithms::subtree(&store.graph, root)? {
        for key in [keys::WITHIN_INGROUP, keys::INGROUP_START] {
            store.graph.remove_node_property(id, key)?;
        }
    }
    Ok(())
}

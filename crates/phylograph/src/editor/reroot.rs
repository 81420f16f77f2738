//! Rerooting by edge reversal along the path to the old root.

use super::ingroup;
use crate::error::Result;
use crate::graph::{algorithms, Direction, EdgeType, NodeId, NodeKind, PropertyMap, PropertyValue};
use crate::store::{keys, TreeStore};
use log::{debug, info};

pub(crate) fn reroot(store: &mut TreeStore, node: NodeId) -> Result<NodeId> {
    store.require_tree_node(node)?;
    let path = algorithms::path_to_root(&store.graph, node)?;
    let old_root = path.last().copied().unwrap_or(node);

    if old_root == node {
        store.graph.set_node_property(node, keys::IS_ROOTED, true)?;
        debug!("Node {node} is already the root; rooting confirmed");
        return Ok(node);
    }
    store.tree_root_of(node)?;

    if store.graph.children(old_root).len() == 2 && !collapse_root_child(store, old_root, &path)? {
        info!("Refusing to reroot tree {old_root} on node {node}: no clade can be dissolved");
        return Ok(old_root);
    }

    let new_root = store.graph.add_node(NodeKind::TreeNode, PropertyMap::new())?;

    // Hang the new root between `node` and its parent
    let parent_edge = store
        .graph
        .first_outgoing(node, EdgeType::ChildOf)
        .map(|edge| (edge.id, edge.target_id, edge.properties.clone()));
    if let Some((edge_id, parent, edge_props)) = parent_edge {
        store.graph.add_edge(new_root, parent, EdgeType::ChildOf, PropertyMap::new())?;
        store.graph.delete_edge(edge_id)?;
        store.graph.add_edge(node, new_root, EdgeType::ChildOf, edge_props)?;
    }

    // Reverse the former ancestor chain, topmost edge first
    let mut chain = vec![new_root];
    chain.extend(path.iter().skip(1).copied());
    for pair in chain.windows(2).rev() {
        let (child, parent) = (pair[0], pair[1]);
        reverse_edge(store, child, parent)?;
    }

    transfer_identity(store, old_root, new_root)?;

    let reset = PropertyMap::new().with(keys::INGROUP_IS_SET, false);
    store.graph.update_node_properties(new_root, &reset)?;
    store.graph.remove_node_property(new_root, keys::INGROUP_NODE_ID)?;
    ingroup::clear_marks(store, new_root)?;

    if store.indexes.is_indexed(old_root) {
        store.indexes.remove_node(old_root);
        store.reindex_tree_root(new_root)?;
    }

    info!("Rerooted tree {old_root} on node {node}; new root is {new_root}");
    Ok(new_root)
}

/// Dissolve the first internal child of `root` off `path` into `root`.
///
/// Returns `false` if there is no such child.
fn collapse_root_child(store: &mut TreeStore, root: NodeId, path: &[NodeId]) -> Result<bool> {
    let candidate = store
        .graph
        .children(root)
        .into_iter()
        .find(|child| !store.graph.is_tip(*child) && !path.contains(child));
    let Some(candidate) = candidate else {
        return Ok(false);
    };

    let edges: Vec<_> = store
        .graph
        .edges_of(candidate, Direction::Incoming, Some(EdgeType::ChildOf))
        .into_iter()
        .map(|edge| (edge.id, edge.source_id, edge.properties.clone()))
        .collect();
    for (edge_id, child, props) in edges {
        store.graph.delete_edge(edge_id)?;
        store.graph.add_edge(child, root, EdgeType::ChildOf, props)?;
    }
    store.graph.delete_node(candidate)?;

    debug!("Dissolved node {candidate} into root {root}");
    Ok(true)
}

/// Turn `child -> parent` into `parent -> child`, moving the label along.
fn reverse_edge(store: &mut TreeStore, child: NodeId, parent: NodeId) -> Result<()> {
    let edge = store
        .graph
        .edges_of(child, Direction::Outgoing, Some(EdgeType::ChildOf))
        .into_iter()
        .find(|edge| edge.target_id == parent)
        .map(|edge| (edge.id, edge.properties.clone()));
    let Some((edge_id, props)) = edge else {
        return Ok(());
    };

    swap_property(store, child, parent, keys::NAME)?;
    store.graph.delete_edge(edge_id)?;
    store.graph.add_edge(parent, child, EdgeType::ChildOf, props)?;
    Ok(())
}

fn swap_property(store: &mut TreeStore, a: NodeId, b: NodeId, key: &str) -> Result<()> {
    let value_a = store.graph.remove_node_property(a, key)?;
    let value_b = store.graph.remove_node_property(b, key)?;
    if let Some(value) = value_b {
        store.graph.set_node_property(a, key, value)?;
    }
    if let Some(value) = value_a {
        store.graph.set_node_property(b, key, value)?;
    }
    Ok(())
}

/// Move source links and root properties from the old root to the new one.
fn transfer_identity(store: &mut TreeStore, old_root: NodeId, new_root: NodeId) -> Result<()> {
    let links: Vec<_> = store
        .graph
        .edges_of(old_root, Direction::Both, None)
        .into_iter()
        .filter(|edge| matches!(edge.edge_type, EdgeType::MetadataFor | EdgeType::WorkingCopyOf))
        .map(|edge| (edge.id, edge.source_id, edge.target_id, edge.edge_type, edge.properties.clone()))
        .collect();
    for (edge_id, source, target, edge_type, props) in links {
        let source = if source == old_root { new_root } else { source };
        let target = if target == old_root { new_root } else { target };
        store.graph.delete_edge(edge_id)?;
        store.graph.add_edge(source, target, edge_type, props)?;
    }

    // Labels stay where the chain reversal put them
    let mut old_props = store.graph.replace_node_properties(old_root, PropertyMap::new())?;
    let mut new_props = store.graph.replace_node_properties(new_root, PropertyMap::new())?;
    let old_name = old_props.remove(keys::NAME);
    let new_name = new_props.remove(keys::NAME);
    restore_name(&mut new_props, old_name);
    restore_name(&mut old_props, new_name);

    old_props.insert(keys::IS_ROOTED, true);
    store.graph.replace_node_properties(new_root, old_props)?;
    store.graph.replace_node_properties(old_root, new_props)?;
    Ok(())
}

fn restore_name(props: &mut PropertyMap, name: Option<PropertyValue>) {
    if let Some(name) = name {
        props.insert(keys::NAME, name);
    }
}

//! Tree traversal algorithms over the `ChildOf` structure.
//!
//! Traversals are iterative so that very deep trees cannot overflow the stack.

use crate::error::{Result, StoreError};
use crate::graph::{Direction, EdgeType, NodeId, TreeGraph};
use std::collections::{HashSet, VecDeque};

/// Breadth-First Search traversal from a starting node over one edge type.
///
/// # Parameters
/// - `graph`: The graph to traverse
/// - `start`: Starting node ID
/// - `direction`: Follow outgoing or incoming edges
/// - `edge_type`: Only edges of this type are followed
/// - `max_depth`: Optional maximum depth (None for unlimited)
///
/// # Returns
/// Vec of reachable node IDs (excluding the start node)
pub fn bfs(
    graph: &TreeGraph,
    start: NodeId,
    direction: Direction,
    edge_type: EdgeType,
    max_depth: Option<usize>,
) -> Result<Vec<NodeId>> {
    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();
    let mut result = Vec::new();

    visited.insert(start);
    queue.push_back((start, 0));

    while let Some((current, depth)) = queue.pop_front() {
        if let Some(max) = max_depth {
            if depth >= max {
                continue;
            }
        }

        for neighbor_id in graph.get_neighbors(current, direction, edge_type)? {
            if visited.insert(neighbor_id) {
                result.push(neighbor_id);
                queue.push_back((neighbor_id, depth + 1));
            }
        }
    }

    Ok(result)
}

/// The node and all its descendants, breadth-first, starting with `start`.
///
/// # Errors
///
/// Returns [`StoreError::NodeNotFound`] if `start` doesn't exist.
pub fn subtree(graph: &TreeGraph, start: NodeId) -> Result<Vec<NodeId>> {
    let mut nodes = vec![start];
    nodes.extend(bfs(graph, start, Direction::Incoming, EdgeType::ChildOf, None)?);
    Ok(nodes)
}

/// The node and all its descendants in preorder (children in creation order).
///
/// # Errors
///
/// Returns [`StoreError::NodeNotFound`] if `start` doesn't exist.
pub fn preorder(graph: &TreeGraph, start: NodeId) -> Result<Vec<NodeId>> {
    graph.get_node(start)?;

    let mut result = Vec::new();
    let mut stack = vec![start];
    let mut visited = HashSet::new();

    while let Some(current) = stack.pop() {
        if !visited.insert(current) {
            continue;
        }
        result.push(current);
        // Reverse so the first child is processed first
        for child in graph.children(current).into_iter().rev() {
            stack.push(child);
        }
    }

    Ok(result)
}

/// Tips below `start` in preorder. A tip passed as `start` is its own only tip.
///
/// # Errors
///
/// Returns [`StoreError::NodeNotFound`] if `start` doesn't exist.
pub fn tips(graph: &TreeGraph, start: NodeId) -> Result<Vec<NodeId>> {
    Ok(preorder(graph, start)?
        .into_iter()
        .filter(|id| graph.is_tip(*id))
        .collect())
}

/// Path from `node` up to the top of its parent chain, both ends included.
///
/// # Errors
///
/// Returns [`StoreError::NodeNotFound`] if `node` doesn't exist, or
/// [`StoreError::MalformedTree`] if the parent chain loops.
pub fn path_to_root(graph: &TreeGraph, node: NodeId) -> Result<Vec<NodeId>> {
    graph.get_node(node)?;

    let mut path = vec![node];
    let mut seen: HashSet<NodeId> = HashSet::from([node]);
    let mut current = node;

    while let Some(parent) = graph.parent(current) {
        if !seen.insert(parent) {
            return Err(StoreError::MalformedTree {
                message: format!("Parent chain of node {node} loops at node {parent}"),
            });
        }
        path.push(parent);
        current = parent;
    }

    Ok(path)
}

/// The top of the parent chain above `node`.
///
/// # Errors
///
/// Same as [`path_to_root`].
pub fn root_of(graph: &TreeGraph, node: NodeId) -> Result<NodeId> {
    let path = path_to_root(graph, node)?;
    Ok(path.last().copied().unwrap_or(node))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{NodeKind, PropertyMap};

    /// ((A,B),C)
    fn small_tree() -> (TreeGraph, [NodeId; 5]) {
        let mut graph = TreeGraph::in_memory().unwrap();
        let mut add = |name: &str| {
            graph
                .add_node(NodeKind::TreeNode, PropertyMap::new().with("name", name))
                .unwrap()
        };
        let root = add("root");
        let ab = add("AB");
        let a = add("A");
        let b = add("B");
        let c = add("C");
        for (child, parent) in [(ab, root), (a, ab), (b, ab), (c, root)] {
            graph
                .add_edge(child, parent, EdgeType::ChildOf, PropertyMap::new())
                .unwrap();
        }
        (graph, [root, ab, a, b, c])
    }

    #[test]
    fn test_preorder() {
        let (graph, [root, ab, a, b, c]) = small_tree();
        assert_eq!(preorder(&graph, root).unwrap(), vec![root, ab, a, b, c]);
        assert_eq!(tips(&graph, root).unwrap(), vec![a, b, c]);
        assert_eq!(tips(&graph, a).unwrap(), vec![a]);
    }

    #[test]
    fn test_subtree_is_breadth_first() {
        let (graph, [root, ab, a, b, c]) = small_tree();
        assert_eq!(subtree(&graph, root).unwrap(), vec![root, ab, c, a, b]);
        assert_eq!(subtree(&graph, ab).unwrap(), vec![ab, a, b]);
    }

    #[test]
    fn test_path_to_root() {
        let (graph, [root, ab, a, _, _]) = small_tree();
        assert_eq!(path_to_root(&graph, a).unwrap(), vec![a, ab, root]);
        assert_eq!(root_of(&graph, a).unwrap(), root);
        assert_eq!(root_of(&graph, root).unwrap(), root);
    }

    #[test]
    fn test_bfs_depth_limit() {
        let (graph, [root, ab, _, _, c]) = small_tree();
        let level_one = bfs(&graph, root, Direction::Incoming, EdgeType::ChildOf, Some(1)).unwrap();
        assert_eq!(level_one, vec![ab, c]);
    }

    #[test]
    fn test_looping_parent_chain_is_malformed() {
        let (mut graph, [root, _, a, _, _]) = small_tree();
        graph
            .add_edge(root, a, EdgeType::ChildOf, PropertyMap::new())
            .unwrap();
        assert!(matches!(
            path_to_root(&graph, a),
            Err(StoreError::MalformedTree { .. })
        ));
    }
}

//! JSON tree view export for web display clients.
//!
//! Generates a nested `{"node_id", "name", "children": [...]}` view of the
//! subtree below a node, breadth-first and truncated after a node budget.

use crate::browser::SourceBrowser;
use crate::error::{Result, StoreError};
use crate::graph::{EdgeType, Node, NodeId};
use crate::store::{keys, TreeStore};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet, VecDeque};

/// Node properties shown to display clients.
pub const VISIBLE_PROPERTIES: &[&str] = &[
    keys::NAME,
    keys::WITHIN_INGROUP,
    keys::INGROUP_START,
    keys::PROCESSED_BY_TNRS,
    keys::OT_ORIGINAL_LABEL,
    keys::OT_OTT_ID,
    keys::OT_OTT_TAXON_NAME,
    keys::IS_SAVED_COPY,
    keys::IS_WORKING_COPY,
];

/// Ancestors listed above the exported node.
pub const MAX_CRUMBS: usize = 5;

/// Export the subtree below `node` as a JSON view.
///
/// The view holds at most `max_nodes` nodes, in breadth-first order. Nodes
/// whose children were cut off report `"truncated": true`.
///
/// # Errors
///
/// Returns [`StoreError::NodeNotFound`] if `node` doesn't exist, or
/// [`StoreError::NotATreeNode`] if it is not a tree node.
pub fn export_tree_json(store: &TreeStore, node: NodeId, max_nodes: usize) -> Result<Value> {
    store.require_tree_node(node)?;
    let graph = store.graph();

    let mut order = Vec::new();
    let mut included = HashSet::new();
    let mut queue = VecDeque::from([node]);
    while let Some(current) = queue.pop_front() {
        if order.len() >= max_nodes.max(1) {
            break;
        }
        if !included.insert(current) {
            continue;
        }
        order.push(current);
        queue.extend(graph.children(current));
    }

    // Children are built before their parents
    let browser = store.browser();
    let mut built: HashMap<NodeId, Value> = HashMap::with_capacity(order.len());
    for &id in order.iter().rev() {
        let tree_node = graph.get_node(id)?;
        let children = graph.children(id);
        let shown: Vec<Value> = children
            .iter()
            .filter_map(|child| built.remove(child))
            .collect();

        let mut view = node_to_json(tree_node);
        view["child_count"] = json!(children.len());
        if shown.len() < children.len() {
            view["truncated"] = json!(true);
        }
        if let Some(length) = graph
            .first_outgoing(id, EdgeType::ChildOf)
            .and_then(|edge| edge.properties.get_float(keys::BRANCH_LENGTH))
        {
            view["branch_length"] = json!(length);
        }
        if children.is_empty() {
            add_tnrs_hits(&browser, tree_node, &mut view);
        }
        view["children"] = Value::Array(shown);
        built.insert(id, view);
    }

    let root_view = built.remove(&node).ok_or_else(|| StoreError::MalformedTree {
        message: format!("Node {node} missing from its own view"),
    })?;

    let crumbs: Vec<Value> = crate::graph::algorithms::path_to_root(graph, node)?
        .into_iter()
        .skip(1)
        .take(MAX_CRUMBS)
        .filter_map(|ancestor| graph.node(ancestor))
        .map(|ancestor| json!({ "node_id": ancestor.id, "name": display_name(ancestor) }))
        .collect();

    let tree_id = browser
        .root_of_tree_containing(node)
        .and_then(|root| graph.node(root))
        .and_then(|root| root.properties.get_string(keys::TREE_ID))
        .map(String::from);

    Ok(json!({
        "tree_id": tree_id,
        "node_count": order.len(),
        "crumbs": crumbs,
        "root": root_view,
    }))
}

/// Export the view as a pretty-printed JSON string.
///
/// # Errors
///
/// Same as [`export_tree_json`].
pub fn export_tree_json_string(store: &TreeStore, node: NodeId, max_nodes: usize) -> Result<String> {
    let view = export_tree_json(store, node, max_nodes)?;
    serde_json::to_string_pretty(&view)
        .map_err(|e| StoreError::serialization("Failed to serialize tree view", Some(e)))
}

/// Label shown for a node.
fn display_name(node: &Node) -> String {
    let props = &node.properties;
    props
        .get_string(keys::NAME)
        .or_else(|| props.get_string(keys::OT_OTT_TAXON_NAME))
        .or_else(|| props.get_string(keys::OT_ORIGINAL_LABEL))
        .unwrap_or_default()
        .to_string()
}

/// Convert a tree node to its JSON object without children.
fn node_to_json(node: &Node) -> Value {
    let mut properties = serde_json::Map::new();
    for key in VISIBLE_PROPERTIES {
        if let Some(value) = node.properties.get(key) {
            properties.insert(key.to_string(), value.to_json());
        }
    }

    json!({
        "node_id": node.id,
        "name": display_name(node),
        "properties": Value::Object(properties),
    })
}

/// Attach name-resolution candidates to unmapped tips.
fn add_tnrs_hits(browser: &SourceBrowser<'_>, tip: &Node, view: &mut Value) {
    if tip.properties.contains_key(keys::OT_OTT_ID) {
        return;
    }
    let hits = browser.tnrs_matches(tip.id);
    if !hits.is_empty() {
        view["tnrs_matches"] = json!(hits);
    }
}

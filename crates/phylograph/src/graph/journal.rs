//! Transaction journal for [`TreeGraph`](super::TreeGraph).
//!
//! The journal remembers the state each node, edge and the graph-property map
//! had before the transaction first touched it. Commit turns the touched set
//! into one storage batch; rollback puts the remembered states back.

use super::property::PropertyMap;
use super::types::{Edge, EdgeId, Node, NodeId};
use std::collections::HashMap;

#[derive(Debug)]
pub(crate) struct Journal {
    pub(crate) nodes: HashMap<NodeId, Option<Node>>,
    pub(crate) edges: HashMap<EdgeId, Option<Edge>>,
    pub(crate) graph_properties: Option<PropertyMap>,
    pub(crate) node_counter: NodeId,
    pub(crate) edge_counter: EdgeId,
}

impl Journal {
    pub(crate) fn new(node_counter: NodeId, edge_counter: EdgeId) -> Self {
        Self {
            nodes: HashMap::new(),
            edges: HashMap::new(),
            graph_properties: None,
            node_counter,
            edge_counter,
        }
    }

    /// Record `prior` unless this node was already touched.
    pub(crate) fn record_node(&mut self, id: NodeId, prior: impl FnOnce() -> Option<Node>) {
        self.nodes.entry(id).or_insert_with(prior);
    }

    /// Record `prior` unless this edge was already touched.
    pub(crate) fn record_edge(&mut self, id: EdgeId, prior: impl FnOnce() -> Option<Edge>) {
        self.edges.entry(id).or_insert_with(prior);
    }

    pub(crate) fn record_graph_properties(&mut self, prior: impl FnOnce() -> PropertyMap) {
        if self.graph_properties.is_none() {
            self.graph_properties = Some(prior());
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty() && self.graph_properties.is_none()
    }
}

//! The `TreeGraph` property-graph engine.

use super::journal::Journal;
use super::property::{PropertyMap, PropertyValue};
use super::types::{Direction, Edge, EdgeId, EdgeType, Node, NodeId, NodeKind};
use crate::error::{Result, StoreError};
use crate::storage::{BatchOperation, StorageBackend};
use log::{debug, trace, warn};
use std::collections::{BTreeSet, HashMap};

const COUNTERS_KEY: &[u8] = b"meta:counters";
const GRAPH_PROPERTIES_KEY: &[u8] = b"meta:graph";

/// Property graph holding trees, source metadata, taxa and match records.
///
/// All state lives in memory and is written to the storage backend in one
/// atomic batch per transaction. Mutations made outside an explicit
/// transaction commit on their own.
pub struct TreeGraph {
    storage: Box<dyn StorageBackend>,
    // Node and edge counters for monotonic ID generation
    node_counter: NodeId,
    edge_counter: EdgeId,
    nodes: HashMap<NodeId, Node>,
    edges: HashMap<EdgeId, Edge>,
    // Ordered by edge id, so children come back in creation order
    adjacency_out: HashMap<NodeId, BTreeSet<EdgeId>>,
    adjacency_in: HashMap<NodeId, BTreeSet<EdgeId>>,
    graph_properties: PropertyMap,
    journal: Option<Journal>,
}

impl TreeGraph {
    /// Open a graph over the given storage backend, loading any persisted state.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`] or [`StoreError::Serialization`] if the
    /// persisted records cannot be read.
    pub fn with_backend(backend: Box<dyn StorageBackend>) -> Result<Self> {
        let mut graph = Self {
            storage: backend,
            node_counter: 0,
            edge_counter: 0,
            nodes: HashMap::new(),
            edges: HashMap::new(),
            adjacency_out: HashMap::new(),
            adjacency_in: HashMap::new(),
            graph_properties: PropertyMap::new(),
            journal: None,
        };

        graph.rebuild_from_storage()?;

        Ok(graph)
    }

    /// Create a graph over a fresh in-memory backend.
    pub fn in_memory() -> Result<Self> {
        use crate::storage::MemoryBackend;
        Self::with_backend(Box::new(MemoryBackend::new()))
    }

    // ===== Transactions =====

    /// Start a transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidOperation`] if a transaction is already open.
    pub fn begin(&mut self) -> Result<()> {
        if self.journal.is_some() {
            return Err(StoreError::invalid_operation("A transaction is already open"));
        }
        self.journal = Some(Journal::new(self.node_counter, self.edge_counter));
        Ok(())
    }

    /// Whether a transaction is open.
    pub fn in_transaction(&self) -> bool {
        self.journal.is_some()
    }

    /// Write every change of the open transaction as one atomic batch.
    ///
    /// If the batch fails the in-memory state is rolled back before the error
    /// is returned.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidOperation`] without an open transaction, or
    /// the storage error of the failed batch.
    pub fn commit(&mut self) -> Result<()> {
        let journal = self
            .journal
            .take()
            .ok_or_else(|| StoreError::invalid_operation("No transaction is open"))?;

        if journal.is_empty() {
            return Ok(());
        }

        let operations = match self.batch_for(&journal) {
            Ok(operations) => operations,
            Err(e) => {
                self.restore(journal);
                return Err(e);
            }
        };
        let count = operations.len();

        if let Err(e) = self.storage.write_batch(operations) {
            warn!("Commit failed, rolling back: {e}");
            self.restore(journal);
            return Err(e);
        }
        trace!("Committed transaction with {count} operations");

        Ok(())
    }

    /// Discard every change of the open transaction. No-op without one.
    pub fn rollback(&mut self) {
        if let Some(journal) = self.journal.take() {
            debug!(
                "Rolling back transaction: {} nodes, {} edges",
                journal.nodes.len(),
                journal.edges.len()
            );
            self.restore(journal);
        }
    }

    // ===== Nodes =====

    /// Add a node to the graph.
    ///
    /// # Returns
    ///
    /// The unique ID assigned to the created node.
    ///
    /// # Errors
    ///
    /// Returns a storage error if an implicit commit fails.
    pub fn add_node(&mut self, kind: NodeKind, properties: PropertyMap) -> Result<NodeId> {
        self.mutate(|graph| {
            let node_id = graph.next_node_id();
            trace!("Adding node: id={node_id}, kind={kind}");
            graph.touch_node(node_id);
            graph
                .nodes
                .insert(node_id, Node::new(node_id, kind, properties));
            Ok(node_id)
        })
    }

    /// Get a node by ID.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NodeNotFound`] if the node doesn't exist.
    pub fn get_node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(&id).ok_or_else(|| StoreError::NodeNotFound {
            node_id: id.to_string(),
        })
    }

    /// Get a node by ID, `None` if absent.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Whether a node with this ID exists.
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Iterate over all nodes in unspecified order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Set one property on a node.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NodeNotFound`] if the node doesn't exist.
    pub fn set_node_property(
        &mut self,
        id: NodeId,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Result<()> {
        let key = key.into();
        let value = value.into();
        self.mutate(|graph| {
            graph.node_for_write(id)?.properties.insert(key, value);
            Ok(())
        })
    }

    /// Remove one property from a node, returning the old value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NodeNotFound`] if the node doesn't exist.
    pub fn remove_node_property(&mut self, id: NodeId, key: &str) -> Result<Option<PropertyValue>> {
        self.mutate(|graph| {
            if !graph.get_node(id)?.properties.contains_key(key) {
                return Ok(None);
            }
            Ok(graph.node_for_write(id)?.properties.remove(key))
        })
    }

    /// Merge properties into a node (overwrites duplicates).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NodeNotFound`] if the node doesn't exist.
    pub fn update_node_properties(&mut self, id: NodeId, properties: &PropertyMap) -> Result<()> {
        self.mutate(|graph| {
            graph.node_for_write(id)?.properties.merge(properties);
            Ok(())
        })
    }

    /// Replace the whole property map of a node, returning the old map.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NodeNotFound`] if the node doesn't exist.
    pub fn replace_node_properties(
        &mut self,
        id: NodeId,
        properties: PropertyMap,
    ) -> Result<PropertyMap> {
        self.mutate(|graph| {
            let node = graph.node_for_write(id)?;
            Ok(std::mem::replace(&mut node.properties, properties))
        })
    }

    /// Delete a node and all its connected edges.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NodeNotFound`] if the node doesn't exist.
    pub fn delete_node(&mut self, id: NodeId) -> Result<()> {
        self.mutate(|graph| {
            graph.get_node(id)?;
            trace!("Deleting node: id={id}");

            let mut edges_to_delete: Vec<EdgeId> = Vec::new();
            if let Some(out_edges) = graph.adjacency_out.get(&id) {
                edges_to_delete.extend(out_edges.iter().copied());
            }
            if let Some(in_edges) = graph.adjacency_in.get(&id) {
                edges_to_delete.extend(in_edges.iter().copied());
            }
            for edge_id in edges_to_delete {
                graph.delete_edge(edge_id)?;
            }

            graph.touch_node(id);
            graph.nodes.remove(&id);
            graph.adjacency_out.remove(&id);
            graph.adjacency_in.remove(&id);
            Ok(())
        })
    }

    // ===== Edges =====

    /// Add an edge to the graph.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NodeNotFound`] if either endpoint doesn't exist.
    pub fn add_edge(
        &mut self,
        source_id: NodeId,
        target_id: NodeId,
        edge_type: EdgeType,
        properties: PropertyMap,
    ) -> Result<EdgeId> {
        self.mutate(|graph| {
            graph.get_node(source_id)?;
            graph.get_node(target_id)?;

            let edge_id = graph.next_edge_id();
            trace!("Adding edge: id={edge_id}, {source_id} -[{edge_type}]-> {target_id}");
            graph.touch_edge(edge_id);
            graph.link(Edge::new(edge_id, source_id, target_id, edge_type, properties));
            Ok(edge_id)
        })
    }

    /// Get an edge by ID.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::EdgeNotFound`] if the edge doesn't exist.
    pub fn get_edge(&self, id: EdgeId) -> Result<&Edge> {
        self.edges.get(&id).ok_or_else(|| StoreError::EdgeNotFound {
            edge_id: id.to_string(),
        })
    }

    /// Delete an edge.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::EdgeNotFound`] if the edge doesn't exist.
    pub fn delete_edge(&mut self, id: EdgeId) -> Result<()> {
        self.mutate(|graph| {
            graph.get_edge(id)?;
            trace!("Deleting edge: id={id}");
            graph.touch_edge(id);
            graph.unlink(id);
            Ok(())
        })
    }

    /// Edges attached to a node in the given direction, optionally filtered by
    /// type, in creation order.
    pub fn edges_of(
        &self,
        node_id: NodeId,
        direction: Direction,
        edge_type: Option<EdgeType>,
    ) -> Vec<&Edge> {
        let mut ids: Vec<EdgeId> = Vec::new();
        if matches!(direction, Direction::Outgoing | Direction::Both) {
            if let Some(out_edges) = self.adjacency_out.get(&node_id) {
                ids.extend(out_edges.iter().copied());
            }
        }
        if matches!(direction, Direction::Incoming | Direction::Both) {
            if let Some(in_edges) = self.adjacency_in.get(&node_id) {
                ids.extend(in_edges.iter().copied());
            }
        }
        ids.sort_unstable();
        ids.dedup();

        ids.into_iter()
            .filter_map(|id| self.edges.get(&id))
            .filter(|edge| edge_type.map_or(true, |t| edge.edge_type == t))
            .collect()
    }

    /// Neighbor nodes across edges of one type, in edge creation order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NodeNotFound`] if the node doesn't exist.
    pub fn get_neighbors(
        &self,
        node_id: NodeId,
        direction: Direction,
        edge_type: EdgeType,
    ) -> Result<Vec<NodeId>> {
        self.get_node(node_id)?;

        let neighbors = self
            .edges_of(node_id, direction, Some(edge_type))
            .into_iter()
            .map(|edge| {
                if edge.source_id == node_id {
                    edge.target_id
                } else {
                    edge.source_id
                }
            })
            .collect();
        Ok(neighbors)
    }

    /// First outgoing edge of the given type.
    pub fn first_outgoing(&self, node_id: NodeId, edge_type: EdgeType) -> Option<&Edge> {
        self.edges_of(node_id, Direction::Outgoing, Some(edge_type))
            .into_iter()
            .next()
    }

    /// First incoming edge of the given type.
    pub fn first_incoming(&self, node_id: NodeId, edge_type: EdgeType) -> Option<&Edge> {
        self.edges_of(node_id, Direction::Incoming, Some(edge_type))
            .into_iter()
            .next()
    }

    /// The parent of a tree node, following its `ChildOf` edge.
    pub fn parent(&self, node_id: NodeId) -> Option<NodeId> {
        self.first_outgoing(node_id, EdgeType::ChildOf)
            .map(|edge| edge.target_id)
    }

    /// Children of a tree node in creation order.
    pub fn children(&self, node_id: NodeId) -> Vec<NodeId> {
        self.edges_of(node_id, Direction::Incoming, Some(EdgeType::ChildOf))
            .into_iter()
            .map(|edge| edge.source_id)
            .collect()
    }

    /// Whether a tree node has no children.
    pub fn is_tip(&self, node_id: NodeId) -> bool {
        self.adjacency_in.get(&node_id).map_or(true, |in_edges| {
            !in_edges.iter().any(|id| {
                self.edges
                    .get(id)
                    .is_some_and(|edge| edge.edge_type == EdgeType::ChildOf)
            })
        })
    }

    // ===== Graph properties =====

    /// Read a graph-level property.
    pub fn graph_property(&self, key: &str) -> Option<&PropertyValue> {
        self.graph_properties.get(key)
    }

    /// Set a graph-level property.
    ///
    /// # Errors
    ///
    /// Returns a storage error if an implicit commit fails.
    pub fn set_graph_property(
        &mut self,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Result<()> {
        let key = key.into();
        let value = value.into();
        self.mutate(|graph| {
            if let Some(journal) = graph.journal.as_mut() {
                let prior = &graph.graph_properties;
                journal.record_graph_properties(|| prior.clone());
            }
            graph.graph_properties.insert(key, value);
            Ok(())
        })
    }

    // ===== Counts and persistence =====

    /// Get the total number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get the total number of edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Flush buffered writes of the storage engine.
    pub fn flush(&mut self) -> Result<()> {
        debug!("Flushing tree graph");
        self.storage.flush()
    }

    // Private helper methods

    /// Run `f` inside the open transaction, or inside its own one.
    fn mutate<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.journal.is_some() {
            return f(self);
        }

        self.begin()?;
        match f(self) {
            Ok(value) => {
                self.commit()?;
                Ok(value)
            }
            Err(e) => {
                self.rollback();
                Err(e)
            }
        }
    }

    fn node_for_write(&mut self, id: NodeId) -> Result<&mut Node> {
        self.get_node(id)?;
        self.touch_node(id);
        self.nodes.get_mut(&id).ok_or_else(|| StoreError::NodeNotFound {
            node_id: id.to_string(),
        })
    }

    fn touch_node(&mut self, id: NodeId) {
        if let Some(journal) = self.journal.as_mut() {
            let nodes = &self.nodes;
            journal.record_node(id, || nodes.get(&id).cloned());
        }
    }

    fn touch_edge(&mut self, id: EdgeId) {
        if let Some(journal) = self.journal.as_mut() {
            let edges = &self.edges;
            journal.record_edge(id, || edges.get(&id).cloned());
        }
    }

    fn link(&mut self, edge: Edge) {
        self.adjacency_out
            .entry(edge.source_id)
            .or_default()
            .insert(edge.id);
        self.adjacency_in
            .entry(edge.target_id)
            .or_default()
            .insert(edge.id);
        self.edges.insert(edge.id, edge);
    }

    fn unlink(&mut self, id: EdgeId) {
        if let Some(edge) = self.edges.remove(&id) {
            if let Some(out_edges) = self.adjacency_out.get_mut(&edge.source_id) {
                out_edges.remove(&id);
            }
            if let Some(in_edges) = self.adjacency_in.get_mut(&edge.target_id) {
                in_edges.remove(&id);
            }
        }
    }

    fn batch_for(&self, journal: &Journal) -> Result<Vec<BatchOperation>> {
        let mut operations =
            Vec::with_capacity(journal.nodes.len() + journal.edges.len() + 2);

        for id in journal.nodes.keys() {
            let key = format!("node:{id}").into_bytes();
            match self.nodes.get(id) {
                Some(node) => {
                    let value = serde_json::to_vec(node).map_err(|e| {
                        StoreError::serialization("Failed to serialize node", Some(e))
                    })?;
                    operations.push(BatchOperation::Put { key, value });
                }
                None => operations.push(BatchOperation::Delete { key }),
            }
        }

        for id in journal.edges.keys() {
            let key = format!("edge:{id}").into_bytes();
            match self.edges.get(id) {
                Some(edge) => {
                    let value = serde_json::to_vec(edge).map_err(|e| {
                        StoreError::serialization("Failed to serialize edge", Some(e))
                    })?;
                    operations.push(BatchOperation::Put { key, value });
                }
                None => operations.push(BatchOperation::Delete { key }),
            }
        }

        if journal.graph_properties.is_some() {
            let value = serde_json::to_vec(&self.graph_properties).map_err(|e| {
                StoreError::serialization("Failed to serialize graph properties", Some(e))
            })?;
            operations.push(BatchOperation::Put {
                key: GRAPH_PROPERTIES_KEY.to_vec(),
                value,
            });
        }

        let counters = serde_json::json!({
            "node_counter": self.node_counter,
            "edge_counter": self.edge_counter,
        });
        let value = serde_json::to_vec(&counters)
            .map_err(|e| StoreError::serialization("Failed to serialize counters", Some(e)))?;
        operations.push(BatchOperation::Put {
            key: COUNTERS_KEY.to_vec(),
            value,
        });

        Ok(operations)
    }

    fn restore(&mut self, journal: Journal) {
        for (id, prior) in journal.edges {
            self.unlink(id);
            if let Some(edge) = prior {
                self.link(edge);
            }
        }

        for (id, prior) in journal.nodes {
            match prior {
                Some(node) => {
                    self.nodes.insert(id, node);
                }
                None => {
                    self.nodes.remove(&id);
                    self.adjacency_out.remove(&id);
                    self.adjacency_in.remove(&id);
                }
            }
        }

        if let Some(properties) = journal.graph_properties {
            self.graph_properties = properties;
        }

        self.node_counter = journal.node_counter;
        self.edge_counter = journal.edge_counter;
    }

    fn next_node_id(&mut self) -> NodeId {
        let id = self.node_counter;
        self.node_counter += 1;
        id
    }

    fn next_edge_id(&mut self) -> EdgeId {
        let id = self.edge_counter;
        self.edge_counter += 1;
        id
    }

    fn load_counters(&mut self) -> Result<()> {
        if let Some(value) = self.storage.get(COUNTERS_KEY)? {
            let counters: serde_json::Value = serde_json::from_slice(&value).map_err(|e| {
                StoreError::serialization("Failed to deserialize counters", Some(e))
            })?;

            if let Some(node_counter) = counters.get("node_counter").and_then(|v| v.as_u64()) {
                self.node_counter = node_counter;
            }

            if let Some(edge_counter) = counters.get("edge_counter").and_then(|v| v.as_u64()) {
                self.edge_counter = edge_counter;
            }
        }

        Ok(())
    }

    fn rebuild_from_storage(&mut self) -> Result<()> {
        self.load_counters()?;

        if let Some(value) = self.storage.get(GRAPH_PROPERTIES_KEY)? {
            self.graph_properties = serde_json::from_slice(&value).map_err(|e| {
                StoreError::serialization("Failed to deserialize graph properties", Some(e))
            })?;
        }

        for (_, value) in self.storage.scan_prefix(b"node:")? {
            let node: Node = serde_json::from_slice(&value)
                .map_err(|e| StoreError::serialization("Failed to deserialize node", Some(e)))?;
            self.nodes.insert(node.id, node);
        }

        for (_, value) in self.storage.scan_prefix(b"edge:")? {
            let edge: Edge = serde_json::from_slice(&value)
                .map_err(|e| StoreError::serialization("Failed to deserialize edge", Some(e)))?;
            self.link(edge);
        }

        debug!(
            "Loaded tree graph: {} nodes, {} edges",
            self.nodes.len(),
            self.edges.len()
        );
        Ok(())
    }
}

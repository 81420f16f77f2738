//! Ingestion and cascading deletion of sources and trees.

use super::keys;
use super::{TipTaxa, TreeStore};
use crate::error::{Result, StoreError};
use crate::graph::{algorithms, Direction, EdgeType, NodeId, NodeKind, PropertyMap};
use crate::index::{tree_id_field, IndexName};
use crate::input::{InputNode, InputTree, SourceInput};
use log::{debug, info};

/// Copy every non-reserved entry of `from` into `into`.
fn copy_unreserved(from: &PropertyMap, into: &mut PropertyMap) {
    for (key, value) in from.iter() {
        if !keys::is_reserved(key) {
            into.insert(key.clone(), value.clone());
        }
    }
}

impl TreeStore {
    /// Add a source and all its trees under `location`.
    ///
    /// Trees without a supplied id get `{source_id}_{prefix}{n}`, where `n`
    /// counts the trees actually added. Missing trees are skipped.
    ///
    /// # Returns
    ///
    /// The id of the new source metadata node.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateSource`] if the source exists and
    /// `overwrite` is false, or [`StoreError::DuplicateTree`] if a tree id is
    /// already taken. Nothing is stored on error.
    pub fn add_source(
        &mut self,
        source: &SourceInput,
        location: &str,
        overwrite: bool,
    ) -> Result<NodeId> {
        let meta = self.atomically(|store| store.add_source_inner(source, location, overwrite))?;
        info!(
            "Added source '{}' at '{location}' with {} trees",
            source.source_id,
            self.graph
                .edges_of(meta, Direction::Outgoing, Some(EdgeType::MetadataFor))
                .len()
        );
        Ok(meta)
    }

    /// Add one tree to an existing source.
    ///
    /// Local trees are stored with their full topology; trees of remote
    /// sources are represented by a placeholder root only.
    ///
    /// # Returns
    ///
    /// The id of the new tree root.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotASourceMeta`] if `meta` is not source metadata,
    /// or [`StoreError::DuplicateTree`] if the tree id is already taken.
    pub fn add_tree(&mut self, tree: &InputTree, tree_id: &str, meta: NodeId) -> Result<NodeId> {
        self.atomically(|store| store.add_tree_inner(tree, tree_id, meta))
    }

    /// Delete a tree with every node reachable below its root.
    ///
    /// Deleting either side of a working-copy pair deletes both sides.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotATreeRoot`] if `root` is not a tree root.
    pub fn delete_tree(&mut self, root: NodeId) -> Result<()> {
        self.atomically(|store| store.delete_tree_versions(root))?;
        debug!("Deleted tree rooted at {root}");
        Ok(())
    }

    /// Delete a source, all its trees and its metadata node.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotASourceMeta`] if `meta` is not source metadata.
    pub fn delete_source(&mut self, meta: NodeId) -> Result<()> {
        self.atomically(|store| store.delete_source_inner(meta))?;
        info!("Deleted source metadata node {meta}");
        Ok(())
    }

    fn add_source_inner(
        &mut self,
        source: &SourceInput,
        location: &str,
        overwrite: bool,
    ) -> Result<NodeId> {
        let source_id = source.source_id.as_str();

        if let Some(existing) = self.source_meta(location, source_id) {
            if !overwrite {
                return Err(StoreError::DuplicateSource {
                    location: location.to_string(),
                    source_id: source_id.to_string(),
                });
            }
            debug!("Overwriting source '{source_id}' at '{location}'");
            self.delete_source_inner(existing)?;
        }

        let mut props = PropertyMap::new();
        copy_unreserved(&source.properties, &mut props);
        props.insert(keys::LOCATION, location);
        props.insert(keys::SOURCE_ID, source_id);
        props.insert(keys::IS_SOURCE_META, true);
        let meta = self.graph.add_node(NodeKind::SourceMeta, props)?;

        let mut added = 0usize;
        for (position, tree) in source.trees.iter().enumerate() {
            let Some(tree) = tree else {
                debug!("Skipping missing tree at position {position} of source '{source_id}'");
                continue;
            };
            let suffix = match &tree.id {
                Some(id) => id.clone(),
                None => format!("{}{added}", self.config.local_tree_id_prefix),
            };
            let tree_id = format!("{source_id}_{suffix}");
            self.add_tree_inner(tree, &tree_id, meta)?;
            added += 1;
        }

        if self.config.is_local(location) {
            for remote_meta in self.remote_source_metas(source_id) {
                self.graph
                    .add_edge(meta, remote_meta, EdgeType::LocalCopyOf, PropertyMap::new())?;
            }
        } else {
            let local = self.config.local_location.clone();
            if let Some(local_meta) = self.source_meta(&local, source_id) {
                self.graph
                    .add_edge(local_meta, meta, EdgeType::LocalCopyOf, PropertyMap::new())?;
            }
            self.remotes.register(&mut self.graph, location)?;
        }

        self.reindex_source(meta)?;
        Ok(meta)
    }

    pub(crate) fn add_tree_inner(
        &mut self,
        tree: &InputTree,
        tree_id: &str,
        meta: NodeId,
    ) -> Result<NodeId> {
        self.require_source_meta(meta)?;
        let meta_props = &self.graph.get_node(meta)?.properties;
        let location = meta_props
            .get_string(keys::LOCATION)
            .unwrap_or(&self.config.local_location)
            .to_string();
        let source_id = meta_props
            .get_string(keys::SOURCE_ID)
            .unwrap_or_default()
            .to_string();

        if self
            .indexes
            .get_single(IndexName::TreeByTreeId, &tree_id_field(&location), tree_id)
            .is_some()
        {
            return Err(StoreError::DuplicateTree {
                location,
                tree_id: tree_id.to_string(),
            });
        }

        let (root, ingroup) = if self.config.is_local(&location) {
            self.copy_topology(&tree.root)?
        } else {
            (self.graph.add_node(NodeKind::TreeNode, PropertyMap::new())?, None)
        };
        debug!("Adding tree '{tree_id}' of source '{source_id}' at root {root}");

        let mut root_props = PropertyMap::new();
        copy_unreserved(&tree.properties, &mut root_props);
        root_props.insert(keys::IS_ROOT, true);
        root_props.insert(keys::LOCATION, location);
        root_props.insert(keys::SOURCE_ID, source_id);
        root_props.insert(keys::TREE_ID, tree_id);
        root_props.insert(keys::IS_SAVED_COPY, true);
        self.graph.update_node_properties(root, &root_props)?;
        self.graph
            .add_edge(meta, root, EdgeType::MetadataFor, PropertyMap::new())?;

        if let Some(ingroup) = ingroup {
            crate::editor::ingroup::designate(self, ingroup)?;
        }

        TipTaxa::from_input(tree, &self.config).store_on(&mut self.graph, root)?;
        self.reindex_tree_root(root)?;

        Ok(root)
    }

    /// Store the input topology in preorder. Returns the root and the node
    /// carrying the ingroup marker, if any.
    fn copy_topology(&mut self, input_root: &InputNode) -> Result<(NodeId, Option<NodeId>)> {
        let mut root = None;
        let mut ingroup = None;
        let mut stack: Vec<(&InputNode, Option<NodeId>)> = vec![(input_root, None)];

        while let Some((input, parent)) = stack.pop() {
            let mut props = PropertyMap::new();
            copy_unreserved(&input.properties, &mut props);
            if let Some(name) = &input.name {
                props.insert(keys::NAME, name.as_str());
            }
            if input.is_leaf() {
                props.insert(keys::OT_IS_OTU, true);
            }
            if input.ingroup_root {
                props.insert(keys::INGROUP_START, true);
            }
            let node = self.graph.add_node(NodeKind::TreeNode, props)?;

            match parent {
                Some(parent) => {
                    let mut edge_props = PropertyMap::new();
                    if let Some(length) = input.branch_length {
                        edge_props.insert(keys::BRANCH_LENGTH, length);
                    }
                    self.graph
                        .add_edge(node, parent, EdgeType::ChildOf, edge_props)?;
                }
                None => root = Some(node),
            }

            if input.ingroup_root {
                ingroup = Some(node);
            }
            if input.is_leaf() {
                self.link_to_taxonomy(node)?;
            }

            for child in input.children.iter().rev() {
                stack.push((child, Some(node)));
            }
        }

        let root = root.ok_or_else(|| StoreError::MalformedTree {
            message: "Input tree has no root".to_string(),
        })?;
        Ok((root, ingroup))
    }

    /// Delete `root`'s tree together with its working copy or original.
    fn delete_tree_versions(&mut self, root: NodeId) -> Result<()> {
        self.require_tree_root(root)?;

        let mut versions = vec![root];
        versions.extend(self.graph.get_neighbors(root, Direction::Incoming, EdgeType::WorkingCopyOf)?);
        versions.extend(self.graph.get_neighbors(root, Direction::Outgoing, EdgeType::WorkingCopyOf)?);

        for version in versions {
            if self.graph.contains_node(version) {
                self.delete_tree_nodes(version)?;
            }
        }
        Ok(())
    }

    /// Remove `root` from the indexes and delete every node below it,
    /// including name-resolution records attached to those nodes.
    pub(crate) fn delete_tree_nodes(&mut self, root: NodeId) -> Result<()> {
        self.require_tree_root(root)?;
        self.indexes.remove_node(root);

        let nodes = algorithms::subtree(&self.graph, root)?;
        debug!("Deleting {} nodes of tree rooted at {root}", nodes.len());

        for &id in &nodes {
            for record in self
                .graph
                .get_neighbors(id, Direction::Incoming, EdgeType::TnrsMatchFor)?
            {
                self.graph.delete_node(record)?;
            }
        }
        for id in nodes {
            self.graph.delete_node(id)?;
        }
        Ok(())
    }

    fn delete_source_inner(&mut self, meta: NodeId) -> Result<()> {
        self.require_source_meta(meta)?;
        self.indexes.remove_node(meta);

        let roots = self
            .graph
            .get_neighbors(meta, Direction::Outgoing, EdgeType::MetadataFor)?;
        for root in roots {
            if self.graph.contains_node(root) {
                self.delete_tree_versions(root)?;
            }
        }

        self.graph.delete_node(meta)
    }
}

//! Property mutation on tree nodes and source metadata.

use super::TreeStore;
use crate::error::{Result, StoreError};
use crate::graph::{NodeId, NodeKind, PropertyMap, PropertyType};
use log::debug;

impl TreeStore {
    /// Merge `properties` into a tree node or source metadata node.
    ///
    /// Index entries of the owning tree root or source are refreshed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ProtectedProperty`] if a key is maintained by
    /// the store, or [`StoreError::InvalidArgument`] for taxon and match nodes.
    pub fn set_properties(&mut self, node: NodeId, properties: &PropertyMap) -> Result<()> {
        self.atomically(|store| store.apply_properties(node, properties))
    }

    /// Set properties supplied as parallel arrays of keys, textual values and
    /// type names.
    ///
    /// Every value is converted before anything is written.
    ///
    /// # Example
    ///
    /// ```
    /// use phylograph::input::{InputNode, InputTree, SourceInput};
    /// use phylograph::TreeStore;
    ///
    /// let mut store = TreeStore::in_memory().unwrap();
    /// let source = SourceInput::new("S1").with_tree(InputTree::new(InputNode::leaf("A")));
    /// let meta = store.add_source(&source, "local", false).unwrap();
    ///
    /// store
    ///     .set_typed_properties(meta, &["ot:studyYear"], &["2012"], &["integer"])
    ///     .unwrap();
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidArgument`] if the arrays differ in length,
    /// a type name is unknown, or a value does not convert. No property is
    /// written in that case.
    pub fn set_typed_properties(
        &mut self,
        node: NodeId,
        keys: &[&str],
        values: &[&str],
        types: &[&str],
    ) -> Result<()> {
        if keys.len() != values.len() || keys.len() != types.len() {
            return Err(StoreError::invalid_argument(format!(
                "Expected equal numbers of keys, values and types, got {}, {} and {}",
                keys.len(),
                values.len(),
                types.len()
            )));
        }

        self.atomically(|store| {
            let mut properties = PropertyMap::new();
            for ((key, raw), tag) in keys.iter().zip(values).zip(types) {
                let value = PropertyType::parse(tag)?.convert(key, raw)?;
                properties.insert(*key, value);
            }
            store.apply_properties(node, &properties)
        })
    }

    fn apply_properties(&mut self, node: NodeId, properties: &PropertyMap) -> Result<()> {
        let kind = self.graph.get_node(node)?.kind;
        let protected = match kind {
            NodeKind::TreeNode => &self.config.protected_tree_properties,
            NodeKind::SourceMeta => &self.config.protected_source_properties,
            other => {
                return Err(StoreError::invalid_argument(format!(
                    "Cannot set properties on {other} node {node}"
                )))
            }
        };
        if let Some(key) = properties
            .sorted_keys()
            .into_iter()
            .find(|key| protected.contains(*key))
        {
            return Err(StoreError::ProtectedProperty {
                key: key.to_string(),
            });
        }

        debug!("Setting {} properties on node {node}", properties.len());
        self.graph.update_node_properties(node, properties)?;

        match kind {
            NodeKind::SourceMeta => self.reindex_source(node),
            _ => self.refresh_tree_of(node),
        }
    }
}

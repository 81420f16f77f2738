//! Taxonomy nodes, tip-to-taxon links and name-resolution records.

use super::keys;
use super::{TipTaxa, TreeStore};
use crate::error::{Result, StoreError};
use crate::graph::{algorithms, Direction, EdgeType, NodeId, NodeKind, PropertyMap, PropertyValue};
use crate::index::{IndexName, OTT_ID_FIELD};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// One candidate returned by a taxonomic name resolution service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TnrsMatch {
    /// Candidate taxon name
    pub matched_name: String,
    /// Candidate OTT id
    pub matched_ott_id: i64,
    /// Similarity score, higher is better
    pub score: f64,
}

impl TnrsMatch {
    /// Create a match record.
    pub fn new(matched_name: impl Into<String>, matched_ott_id: i64, score: f64) -> Self {
        Self {
            matched_name: matched_name.into(),
            matched_ott_id,
            score,
        }
    }

    pub(crate) fn to_properties(&self) -> PropertyMap {
        PropertyMap::new()
            .with(keys::MATCHED_NAME, self.matched_name.as_str())
            .with(keys::MATCHED_OTT_ID, self.matched_ott_id)
            .with(keys::SCORE, self.score)
    }

    pub(crate) fn from_properties(props: &PropertyMap) -> Option<Self> {
        Some(Self {
            matched_name: props.get_string(keys::MATCHED_NAME)?.to_string(),
            matched_ott_id: props.get_int(keys::MATCHED_OTT_ID)?,
            score: props.get_float(keys::SCORE).unwrap_or(0.0),
        })
    }
}

impl TreeStore {
    /// Install a taxon of the reference taxonomy.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidOperation`] if a taxon with this OTT id
    /// is already installed.
    pub fn install_taxon(&mut self, ott_id: i64, name: &str) -> Result<NodeId> {
        self.atomically(|store| {
            let value = ott_id.to_string();
            if store
                .indexes
                .get_single(IndexName::TaxonByOttId, OTT_ID_FIELD, &value)
                .is_some()
            {
                return Err(StoreError::invalid_operation(format!(
                    "Taxon with OTT id {ott_id} is already installed"
                )));
            }

            let props = PropertyMap::new()
                .with(keys::OT_OTT_ID, ott_id)
                .with(keys::NAME, name);
            let taxon = store.graph.add_node(NodeKind::Taxon, props)?;
            store
                .indexes
                .add(IndexName::TaxonByOttId, taxon, OTT_ID_FIELD, value);
            store.graph.set_graph_property(keys::HAS_TAXONOMY, true)?;
            debug!("Installed taxon {ott_id} '{name}' as node {taxon}");
            Ok(taxon)
        })
    }

    /// Whether any taxon has been installed.
    pub fn has_taxonomy(&self) -> bool {
        matches!(
            self.graph.graph_property(keys::HAS_TAXONOMY),
            Some(PropertyValue::Bool(true))
        )
    }

    /// Link a tree node to the taxon matching its `ot:ottId`.
    ///
    /// Returns `false` without changes if the node is unmapped, no taxonomy
    /// is installed, or no taxon has that id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotATreeNode`] if `node` is not a tree node.
    pub fn connect_tree_node_to_taxonomy(&mut self, node: NodeId) -> Result<bool> {
        self.atomically(|store| {
            store.require_tree_node(node)?;
            store.link_to_taxonomy(node)
        })
    }

    /// Link every tip of every local tree to the taxonomy.
    ///
    /// # Returns
    ///
    /// The number of tips linked.
    pub fn connect_all_trees_to_taxonomy(&mut self) -> Result<usize> {
        let linked = self.atomically(|store| {
            let roots: Vec<NodeId> = store
                .graph
                .nodes()
                .filter(|node| node.kind == NodeKind::TreeNode)
                .filter(|node| node.properties.flag(keys::IS_ROOT))
                .filter(|node| {
                    node.properties
                        .get_string(keys::LOCATION)
                        .is_some_and(|location| store.config.is_local(location))
                })
                .map(|node| node.id)
                .collect();

            let mut linked = 0;
            for root in roots {
                for tip in algorithms::tips(&store.graph, root)? {
                    if store.link_to_taxonomy(tip)? {
                        linked += 1;
                    }
                }
            }
            Ok(linked)
        })?;
        info!("Connected {linked} tips to the taxonomy");
        Ok(linked)
    }

    /// Map a tree node to a taxon.
    ///
    /// Sets `ot:ottId`, `ot:ottTaxonName` and the node name, drops any
    /// pending name-resolution records and refreshes the tree's indexes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotATreeNode`] if `node` is not a tree node.
    pub fn assign_taxon(&mut self, node: NodeId, ott_id: i64, taxon_name: &str) -> Result<()> {
        self.atomically(|store| {
            store.require_tree_node(node)?;
            let props = PropertyMap::new()
                .with(keys::OT_OTT_ID, ott_id)
                .with(keys::OT_OTT_TAXON_NAME, taxon_name)
                .with(keys::NAME, taxon_name);
            store.graph.update_node_properties(node, &props)?;

            for record in store
                .graph
                .get_neighbors(node, Direction::Incoming, EdgeType::TnrsMatchFor)?
            {
                store.graph.delete_node(record)?;
            }

            store.link_to_taxonomy(node)?;
            store.refresh_tree_of(node)
        })
    }

    /// Attach name-resolution candidates to a tip.
    ///
    /// Marks the tree as processed by name resolution.
    ///
    /// # Returns
    ///
    /// The ids of the new match nodes, in input order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotATreeNode`] if `tip` is not a tree node.
    pub fn record_tnrs_matches(&mut self, tip: NodeId, matches: &[TnrsMatch]) -> Result<Vec<NodeId>> {
        self.atomically(|store| {
            store.require_tree_node(tip)?;
            let mut ids = Vec::with_capacity(matches.len());
            for candidate in matches {
                let record = store
                    .graph
                    .add_node(NodeKind::TnrsMatch, candidate.to_properties())?;
                store
                    .graph
                    .add_edge(record, tip, EdgeType::TnrsMatchFor, PropertyMap::new())?;
                ids.push(record);
            }

            let root = algorithms::root_of(&store.graph, tip)?;
            store
                .graph
                .set_node_property(root, keys::PROCESSED_BY_TNRS, true)?;
            Ok(ids)
        })
    }

    /// Replace the `ExemplarOf` link of `node` according to its OTT id.
    pub(crate) fn link_to_taxonomy(&mut self, node: NodeId) -> Result<bool> {
        let existing: Vec<_> = self
            .graph
            .edges_of(node, Direction::Outgoing, Some(EdgeType::ExemplarOf))
            .into_iter()
            .map(|edge| edge.id)
            .collect();
        for edge in existing {
            self.graph.delete_edge(edge)?;
        }

        if !self.has_taxonomy() {
            return Ok(false);
        }
        let Some(ott_id) = self.graph.get_node(node)?.properties.get_int(keys::OT_OTT_ID) else {
            return Ok(false);
        };
        let Some(taxon) =
            self.indexes
                .get_single(IndexName::TaxonByOttId, OTT_ID_FIELD, &ott_id.to_string())
        else {
            return Ok(false);
        };

        self.graph
            .add_edge(node, taxon, EdgeType::ExemplarOf, PropertyMap::new())?;
        Ok(true)
    }

    /// Recompute the tip-taxon arrays of the tree containing `node` and
    /// refresh its index entries.
    ///
    /// Remote trees keep the arrays collected at ingestion, since their
    /// placeholder root stores no tips.
    pub(crate) fn refresh_tree_of(&mut self, node: NodeId) -> Result<()> {
        let root = algorithms::root_of(&self.graph, node)?;
        let props = &self.graph.get_node(root)?.properties;
        if !props.flag(keys::IS_ROOT) {
            return Ok(());
        }
        let local = props
            .get_string(keys::LOCATION)
            .map_or(true, |location| self.config.is_local(location));

        if local {
            TipTaxa::from_graph(&self.graph, root, &self.config)?
                .store_on(&mut self.graph, root)?;
        }
        if self.indexes.is_indexed(root) || self.metadata_of(root).is_some() {
            self.reindex_tree_root(root)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{InputNode, InputTree, SourceInput};

    fn store_with_tree() -> (TreeStore, NodeId) {
        let mut store = TreeStore::in_memory().unwrap();
        let source = SourceInput::new("S1").with_tree(InputTree::new(InputNode::internal(vec![
            InputNode::leaf("Homo sapiens").with_ott_id(770315),
            InputNode::leaf("chimp"),
        ])));
        let meta = store.add_source(&source, "local", false).unwrap();
        let root = store
            .graph
            .get_neighbors(meta, Direction::Outgoing, EdgeType::MetadataFor)
            .unwrap()[0];
        (store, root)
    }

    #[test]
    fn test_connect_requires_installed_taxon() {
        let (mut store, root) = store_with_tree();
        let human = store.graph.children(root)[0];
        assert!(!store.connect_tree_node_to_taxonomy(human).unwrap());

        let taxon = store.install_taxon(770315, "Homo sapiens").unwrap();
        assert!(store.has_taxonomy());
        assert_eq!(store.connect_all_trees_to_taxonomy().unwrap(), 1);
        assert_eq!(
            store
                .graph
                .get_neighbors(human, Direction::Outgoing, EdgeType::ExemplarOf)
                .unwrap(),
            vec![taxon]
        );

        // Relinking replaces rather than duplicates
        assert!(store.connect_tree_node_to_taxonomy(human).unwrap());
        assert_eq!(
            store
                .graph
                .edges_of(human, Direction::Outgoing, Some(EdgeType::ExemplarOf))
                .len(),
            1
        );
    }

    #[test]
    fn test_install_taxon_twice_fails() {
        let mut store = TreeStore::in_memory().unwrap();
        store.install_taxon(1, "Life").unwrap();
        assert!(matches!(
            store.install_taxon(1, "Life"),
            Err(StoreError::InvalidOperation { .. })
        ));
    }

    #[test]
    fn test_assign_taxon_updates_tip_arrays() {
        let (mut store, root) = store_with_tree();
        let chimp = store.graph.children(root)[1];
        store
            .record_tnrs_matches(chimp, &[TnrsMatch::new("Pan troglodytes", 417950, 0.9)])
            .unwrap();
        assert!(store
            .graph
            .get_node(root)
            .unwrap()
            .properties
            .flag(keys::PROCESSED_BY_TNRS));

        store.assign_taxon(chimp, 417950, "Pan troglodytes").unwrap();

        let props = &store.graph.get_node(root).unwrap().properties;
        assert_eq!(
            props.get_int_list(keys::TIP_MAPPED_OTTIDS),
            Some(&[770315, 417950][..])
        );
        assert!(store
            .graph
            .get_neighbors(chimp, Direction::Incoming, EdgeType::TnrsMatchFor)
            .unwrap()
            .is_empty());
        assert_eq!(
            store
                .indexes
                .get(IndexName::TreeByMappedTaxonOttId, OTT_ID_FIELD, "417950"),
            vec![root]
        );
    }
}

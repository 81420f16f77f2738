//! Secondary indexes over tree roots, source metadata and taxa.
//!
//! Every index maps `field -> value -> nodes`. The manager also keeps a
//! reverse map from node to its entries, so removing a node from all indexes
//! needs no knowledge of what was indexed for it. Entries are kept in memory
//! only and rebuilt from the persisted graph when a store is opened.

pub mod fuzzy;

use crate::config::StoreConfig;
use crate::graph::{Node, NodeId};
use crate::store::keys;
use fuzzy::FuzzyQuery;
use log::trace;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Field used by the taxon name indexes.
pub const NAME_FIELD: &str = "name";
/// Field used by the OTT id indexes.
pub const OTT_ID_FIELD: &str = "ott_id";

/// Names of the maintained indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndexName {
    /// Tree roots by tree id, field `{location}_tree_id`
    TreeByTreeId,
    /// Tree roots by source id, field `{location}_source_id`
    TreeBySourceId,
    /// Tree roots by whitelisted root property
    TreeByProperty,
    /// Tree roots by original labels of their tips
    TreeByOriginalTaxonName,
    /// Tree roots by mapped taxon names of tips
    TreeByMappedTaxonName,
    /// Tree roots by mapped names with whitespace substituted
    TreeByMappedTaxonNameWhitespaceFilled,
    /// Tree roots by mapped OTT ids of tips
    TreeByMappedTaxonOttId,
    /// Source metadata by source id, field `{location}_source_id`
    SourceBySourceId,
    /// Source metadata by whitelisted property
    SourceByProperty,
    /// Taxonomy nodes by OTT id
    TaxonByOttId,
}

/// Field name of the tree-id index for a location.
pub fn tree_id_field(location: &str) -> String {
    format!("{location}_tree_id")
}

/// Field name of the source-id indexes for a location.
pub fn source_id_field(location: &str) -> String {
    format!("{location}_source_id")
}

/// Domains accepted by the basic search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchableProperty {
    /// `ot:curatorName` of a source
    CuratorName,
    /// `ot:dataDeposit` of a source
    DataDeposit,
    /// `ot:studyPublicationReference` of a source
    PublicationReference,
    /// Id of a source
    SourceId,
    /// `ot:studyPublication` of a source
    StudyPublication,
    /// `ot:studyYear` of a source
    Year,
    /// `ot:tag` of a source
    TagSource,
    /// Original tip labels of a tree
    OriginalTaxonName,
    /// Mapped tip names of a tree
    MappedTaxonName,
    /// Mapped tip OTT ids of a tree
    MappedTaxonOttId,
    /// `ot:branchLengthMode` of a tree
    BranchLengthMode,
    /// `ot:tag` of a tree
    TagTree,
}

impl SearchableProperty {
    /// The index and field searched for this domain.
    pub fn target(self) -> (IndexName, &'static str) {
        match self {
            SearchableProperty::CuratorName => (IndexName::SourceByProperty, "ot:curatorName"),
            SearchableProperty::DataDeposit => (IndexName::SourceByProperty, "ot:dataDeposit"),
            SearchableProperty::PublicationReference => {
                (IndexName::SourceByProperty, "ot:studyPublicationReference")
            }
            SearchableProperty::SourceId => (IndexName::SourceByProperty, keys::SOURCE_ID),
            SearchableProperty::StudyPublication => {
                (IndexName::SourceByProperty, "ot:studyPublication")
            }
            SearchableProperty::Year => (IndexName::SourceByProperty, "ot:studyYear"),
            SearchableProperty::TagSource => (IndexName::SourceByProperty, "ot:tag"),
            SearchableProperty::OriginalTaxonName => {
                (IndexName::TreeByOriginalTaxonName, NAME_FIELD)
            }
            SearchableProperty::MappedTaxonName => (IndexName::TreeByMappedTaxonName, NAME_FIELD),
            SearchableProperty::MappedTaxonOttId => {
                (IndexName::TreeByMappedTaxonOttId, OTT_ID_FIELD)
            }
            SearchableProperty::BranchLengthMode => {
                (IndexName::TreeByProperty, "ot:branchLengthMode")
            }
            SearchableProperty::TagTree => (IndexName::TreeByProperty, "ot:tag"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct IndexEntry {
    index: IndexName,
    field: String,
    value: String,
    node: NodeId,
}

#[derive(Debug)]
enum UndoOp {
    Added(IndexEntry),
    Removed(IndexEntry),
}

/// In-memory secondary indexes with transactional undo.
#[derive(Debug, Default)]
pub struct IndexManager {
    indexes: HashMap<IndexName, HashMap<String, BTreeMap<String, BTreeSet<NodeId>>>>,
    by_node: HashMap<NodeId, Vec<IndexEntry>>,
    undo: Option<Vec<UndoOp>>,
}

impl IndexManager {
    /// Create an empty index manager.
    pub fn new() -> Self {
        Self::default()
    }

    // ===== Transactions =====

    /// Start recording changes so they can be undone.
    pub fn begin(&mut self) {
        self.undo = Some(Vec::new());
    }

    /// Keep every change made since [`begin`](Self::begin).
    pub fn commit(&mut self) {
        self.undo = None;
    }

    /// Undo every change made since [`begin`](Self::begin).
    pub fn rollback(&mut self) {
        let Some(log) = self.undo.take() else {
            return;
        };
        for op in log.into_iter().rev() {
            match op {
                UndoOp::Added(entry) => self.unlink(&entry),
                UndoOp::Removed(entry) => self.link(entry),
            }
        }
    }

    // ===== Entries =====

    /// Index `node` under `field = value`. Adding an existing entry is a no-op.
    pub fn add(
        &mut self,
        index: IndexName,
        node: NodeId,
        field: impl Into<String>,
        value: impl Into<String>,
    ) {
        let entry = IndexEntry {
            index,
            field: field.into(),
            value: value.into(),
            node,
        };
        if self.contains(&entry) {
            return;
        }
        trace!(
            "Index add: {:?} {}={} -> {}",
            entry.index,
            entry.field,
            entry.value,
            entry.node
        );
        if let Some(log) = self.undo.as_mut() {
            log.push(UndoOp::Added(entry.clone()));
        }
        self.link(entry);
    }

    /// Remove every entry pointing at `node`, in every index.
    pub fn remove_node(&mut self, node: NodeId) {
        let Some(entries) = self.by_node.get(&node).cloned() else {
            return;
        };
        trace!("Index remove: {} entries for node {node}", entries.len());
        for entry in entries {
            self.unlink(&entry);
            if let Some(log) = self.undo.as_mut() {
                log.push(UndoOp::Removed(entry));
            }
        }
    }

    /// Nodes indexed under exactly `field = value`, in id order.
    pub fn get(&self, index: IndexName, field: &str, value: &str) -> Vec<NodeId> {
        self.indexes
            .get(&index)
            .and_then(|fields| fields.get(field))
            .and_then(|values| values.get(value))
            .map(|nodes| nodes.iter().copied().collect())
            .unwrap_or_default()
    }

    /// The single node indexed under `field = value`, if any.
    pub fn get_single(&self, index: IndexName, field: &str, value: &str) -> Option<NodeId> {
        self.get(index, field, value).into_iter().next()
    }

    /// Every value indexed under `field` with its nodes, in value order.
    pub fn values(&self, index: IndexName, field: &str) -> Vec<(&str, Vec<NodeId>)> {
        self.indexes
            .get(&index)
            .and_then(|fields| fields.get(field))
            .map(|values| {
                values
                    .iter()
                    .map(|(value, nodes)| (value.as_str(), nodes.iter().copied().collect()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Nodes whose value under `field` approximately matches `query`.
    pub fn fuzzy(&self, index: IndexName, field: &str, query: &str) -> BTreeSet<NodeId> {
        let query = FuzzyQuery::new(query);
        let mut hits = BTreeSet::new();
        if query.is_empty() {
            return hits;
        }
        if let Some(values) = self.indexes.get(&index).and_then(|fields| fields.get(field)) {
            for (value, nodes) in values {
                if query.matches(value) {
                    hits.extend(nodes.iter().copied());
                }
            }
        }
        hits
    }

    /// Whether `node` appears in any index.
    pub fn is_indexed(&self, node: NodeId) -> bool {
        self.by_node.get(&node).is_some_and(|entries| !entries.is_empty())
    }

    /// Whether `node` appears in the given index.
    pub fn is_indexed_in(&self, index: IndexName, node: NodeId) -> bool {
        self.by_node
            .get(&node)
            .is_some_and(|entries| entries.iter().any(|entry| entry.index == index))
    }

    // ===== Entity indexing =====

    /// Index a tree root under its ids, whitelisted properties and tip-taxon arrays.
    pub fn add_tree_root(&mut self, root: &Node, config: &StoreConfig) {
        let props = &root.properties;
        let location = props
            .get_string(keys::LOCATION)
            .unwrap_or(&config.local_location)
            .to_string();

        if let Some(tree_id) = props.get_string(keys::TREE_ID) {
            self.add(
                IndexName::TreeByTreeId,
                root.id,
                tree_id_field(&location),
                tree_id,
            );
        }
        if let Some(source_id) = props.get_string(keys::SOURCE_ID) {
            self.add(
                IndexName::TreeBySourceId,
                root.id,
                source_id_field(&location),
                source_id,
            );
        }

        for key in &config.tree_search_properties {
            if let Some(value) = props.get(key) {
                for term in value.index_terms() {
                    self.add(IndexName::TreeByProperty, root.id, key.as_str(), term);
                }
            }
        }

        let tip_indexes = [
            (keys::TIP_ORIGINAL_NAMES, IndexName::TreeByOriginalTaxonName),
            (keys::TIP_MAPPED_NAMES, IndexName::TreeByMappedTaxonName),
            (
                keys::TIP_MAPPED_NAMES_NO_SPACES,
                IndexName::TreeByMappedTaxonNameWhitespaceFilled,
            ),
        ];
        for (key, index) in tip_indexes {
            for name in props.get_string_list(key).unwrap_or_default() {
                self.add(index, root.id, NAME_FIELD, name.as_str());
            }
        }
        for ott_id in props.get_int_list(keys::TIP_MAPPED_OTTIDS).unwrap_or_default() {
            self.add(
                IndexName::TreeByMappedTaxonOttId,
                root.id,
                OTT_ID_FIELD,
                ott_id.to_string(),
            );
        }
    }

    /// Index a source metadata node under its id and whitelisted properties.
    pub fn add_source(&mut self, meta: &Node, config: &StoreConfig) {
        let props = &meta.properties;
        let location = props
            .get_string(keys::LOCATION)
            .unwrap_or(&config.local_location)
            .to_string();

        if let Some(source_id) = props.get_string(keys::SOURCE_ID) {
            self.add(
                IndexName::SourceBySourceId,
                meta.id,
                source_id_field(&location),
                source_id,
            );
        }

        for key in &config.source_search_properties {
            if let Some(value) = props.get(key) {
                for term in value.index_terms() {
                    self.add(IndexName::SourceByProperty, meta.id, key.as_str(), term);
                }
            }
        }
    }

    // Private helpers

    fn contains(&self, entry: &IndexEntry) -> bool {
        self.indexes
            .get(&entry.index)
            .and_then(|fields| fields.get(&entry.field))
            .and_then(|values| values.get(&entry.value))
            .is_some_and(|nodes| nodes.contains(&entry.node))
    }

    fn link(&mut self, entry: IndexEntry) {
        self.indexes
            .entry(entry.index)
            .or_default()
            .entry(entry.field.clone())
            .or_default()
            .entry(entry.value.clone())
            .or_default()
            .insert(entry.node);
        self.by_node.entry(entry.node).or_default().push(entry);
    }

    fn unlink(&mut self, entry: &IndexEntry) {
        if let Some(values) = self
            .indexes
            .get_mut(&entry.index)
            .and_then(|fields| fields.get_mut(&entry.field))
        {
            if let Some(nodes) = values.get_mut(&entry.value) {
                nodes.remove(&entry.node);
                if nodes.is_empty() {
                    values.remove(&entry.value);
                }
            }
        }
        if let Some(entries) = self.by_node.get_mut(&entry.node) {
            entries.retain(|e| e != entry);
            if entries.is_empty() {
                self.by_node.remove(&entry.node);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{NodeKind, PropertyMap};

    fn root_node(id: NodeId) -> Node {
        Node::new(
            id,
            NodeKind::TreeNode,
            PropertyMap::new()
                .with(keys::TREE_ID, "S1_t1")
                .with(keys::SOURCE_ID, "S1")
                .with(keys::LOCATION, "local")
                .with("ot:tag", vec!["primates".to_string()])
                .with(
                    keys::TIP_MAPPED_NAMES,
                    vec!["Homo sapiens".to_string(), "Pan troglodytes".to_string()],
                )
                .with(
                    keys::TIP_MAPPED_NAMES_NO_SPACES,
                    vec!["Homo%s%sapiens".to_string()],
                )
                .with(keys::TIP_MAPPED_OTTIDS, vec![770315i64]),
        )
    }

    #[test]
    fn test_add_tree_root() {
        let mut indexes = IndexManager::new();
        indexes.add_tree_root(&root_node(7), &StoreConfig::default());

        assert_eq!(
            indexes.get_single(IndexName::TreeByTreeId, "local_tree_id", "S1_t1"),
            Some(7)
        );
        assert_eq!(
            indexes.get(IndexName::TreeBySourceId, "local_source_id", "S1"),
            vec![7]
        );
        assert_eq!(
            indexes.get(IndexName::TreeByProperty, "ot:tag", "primates"),
            vec![7]
        );
        assert_eq!(
            indexes.get(IndexName::TreeByMappedTaxonOttId, OTT_ID_FIELD, "770315"),
            vec![7]
        );
        assert_eq!(
            indexes.get(
                IndexName::TreeByMappedTaxonNameWhitespaceFilled,
                NAME_FIELD,
                "Homo%s%sapiens"
            ),
            vec![7]
        );
    }

    #[test]
    fn test_remove_node_clears_every_index() {
        let mut indexes = IndexManager::new();
        indexes.add_tree_root(&root_node(7), &StoreConfig::default());
        assert!(indexes.is_indexed(7));

        indexes.remove_node(7);
        assert!(!indexes.is_indexed(7));
        assert!(indexes
            .get(IndexName::TreeByTreeId, "local_tree_id", "S1_t1")
            .is_empty());
        assert!(indexes.values(IndexName::TreeByMappedTaxonName, NAME_FIELD).is_empty());
    }

    #[test]
    fn test_fuzzy_search() {
        let mut indexes = IndexManager::new();
        indexes.add_tree_root(&root_node(7), &StoreConfig::default());

        let hits = indexes.fuzzy(IndexName::TreeByMappedTaxonName, NAME_FIELD, "troglodytis");
        assert!(hits.contains(&7));
        let hits = indexes.fuzzy(IndexName::TreeByMappedTaxonName, NAME_FIELD, "Gorilla");
        assert!(hits.is_empty());
    }

    #[test]
    fn test_rollback_undoes_adds_and_removes() {
        let mut indexes = IndexManager::new();
        indexes.add(IndexName::TaxonByOttId, 1, OTT_ID_FIELD, "10");

        indexes.begin();
        indexes.add(IndexName::TaxonByOttId, 2, OTT_ID_FIELD, "20");
        indexes.remove_node(1);
        indexes.rollback();

        assert_eq!(indexes.get(IndexName::TaxonByOttId, OTT_ID_FIELD, "10"), vec![1]);
        assert!(indexes.get(IndexName::TaxonByOttId, OTT_ID_FIELD, "20").is_empty());
        assert!(!indexes.is_indexed(2));
    }

    #[test]
    fn test_duplicate_add_is_noop() {
        let mut indexes = IndexManager::new();
        indexes.begin();
        indexes.add(IndexName::TaxonByOttId, 1, OTT_ID_FIELD, "10");
        indexes.add(IndexName::TaxonByOttId, 1, OTT_ID_FIELD, "10");
        indexes.remove_node(1);
        indexes.rollback();
        assert!(!indexes.is_indexed(1));
    }

    #[test]
    fn test_searchable_property_targets() {
        assert_eq!(
            SearchableProperty::MappedTaxonName.target(),
            (IndexName::TreeByMappedTaxonName, NAME_FIELD)
        );
        assert_eq!(
            SearchableProperty::Year.target(),
            (IndexName::SourceByProperty, "ot:studyYear")
        );
    }
}

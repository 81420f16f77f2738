//! Read-only lookups, search and summaries over a [`TreeStore`].
//!
//! Lookup misses come back as `None` or empty collections, never as errors.

use crate::error::Result;
use crate::graph::{algorithms, Direction, EdgeType, NodeId, NodeKind, PropertyMap};
use crate::index::{source_id_field, tree_id_field, IndexName, SearchableProperty, NAME_FIELD};
use crate::query::TreeQuery;
use crate::store::{keys, TnrsMatch, TreeStore};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Summary of one source for display clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceSummary {
    /// Source id
    pub source_id: String,
    /// Location the source is stored under
    pub location: String,
    /// Metadata without store-maintained keys
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// Ids of the source's trees, sorted
    pub trees: Vec<String>,
    /// A local copy of this source id exists
    pub has_local_copy: bool,
    /// Remote locations holding this source id
    pub remotes_known: Vec<String>,
}

/// Summary of one tree for display clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeSummary {
    /// Tree id
    pub tree_id: String,
    /// Id of the owning source
    pub source_id: String,
    /// Root properties without store-maintained keys
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// Visible entries of a property map, keyed in sorted order.
pub(crate) fn visible_metadata(props: &PropertyMap) -> BTreeMap<String, serde_json::Value> {
    props
        .iter()
        .filter(|(key, _)| !keys::is_reserved(key))
        .map(|(key, value)| (key.clone(), value.to_json()))
        .collect()
}

/// Borrowing view for lookups.
pub struct SourceBrowser<'a> {
    store: &'a TreeStore,
}

impl<'a> SourceBrowser<'a> {
    pub(crate) fn new(store: &'a TreeStore) -> Self {
        Self { store }
    }

    // ===== Sources =====

    /// Ids of all sources stored under `location`, sorted.
    pub fn source_ids(&self, location: &str) -> Vec<String> {
        self.source_ids_except(location, &[])
    }

    /// Ids of the sources under `location`, minus `excluded`.
    pub fn source_ids_except(&self, location: &str, excluded: &[&str]) -> Vec<String> {
        self.store
            .indexes
            .values(IndexName::SourceBySourceId, &source_id_field(location))
            .into_iter()
            .map(|(value, _)| value)
            .filter(|value| !excluded.contains(value))
            .map(String::from)
            .collect()
    }

    /// Metadata node of `(location, source_id)`.
    pub fn source_meta(&self, location: &str, source_id: &str) -> Option<NodeId> {
        self.store.source_meta(location, source_id)
    }

    /// Metadata nodes of every remote copy of `source_id`.
    pub fn remote_source_metas(&self, source_id: &str) -> Vec<NodeId> {
        self.store.remote_source_metas(source_id)
    }

    /// Known remote locations in registration order.
    pub fn known_remotes(&self) -> &'a [String] {
        self.store.remotes.list()
    }

    // ===== Trees =====

    /// Ids of the trees of a source, sorted.
    pub fn tree_ids_for_source(&self, location: &str, source_id: &str) -> Vec<String> {
        self.tree_ids_for_source_except(location, source_id, &[])
    }

    /// Ids of the trees of a source, minus `excluded`.
    pub fn tree_ids_for_source_except(
        &self,
        location: &str,
        source_id: &str,
        excluded: &[&str],
    ) -> Vec<String> {
        let mut ids: Vec<String> = self
            .store
            .indexes
            .get(IndexName::TreeBySourceId, &source_id_field(location), source_id)
            .into_iter()
            .filter_map(|root| self.string_property(root, keys::TREE_ID))
            .filter(|id| !excluded.contains(&id.as_str()))
            .collect();
        ids.sort();
        ids
    }

    /// Root of the tree `(location, tree_id)`.
    pub fn tree_root(&self, location: &str, tree_id: &str) -> Option<NodeId> {
        self.store
            .indexes
            .get_single(IndexName::TreeByTreeId, &tree_id_field(location), tree_id)
    }

    /// Flagged root of the tree containing `node`, `None` if `node` is not
    /// part of a stored tree.
    pub fn root_of_tree_containing(&self, node: NodeId) -> Option<NodeId> {
        self.store.tree_root_of(node).ok()
    }

    /// Tips below `node` in preorder.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NodeNotFound`](crate::StoreError::NodeNotFound)
    /// if `node` doesn't exist.
    pub fn descendant_tips(&self, node: NodeId) -> Result<Vec<NodeId>> {
        algorithms::tips(&self.store.graph, node)
    }

    /// Working copy of the tree rooted at `root`, if one is outstanding.
    pub fn working_copy_of(&self, root: NodeId) -> Option<NodeId> {
        self.store
            .graph
            .first_incoming(root, EdgeType::WorkingCopyOf)
            .map(|edge| edge.source_id)
    }

    /// Original tree behind the working copy rooted at `working`.
    pub fn original_of(&self, working: NodeId) -> Option<NodeId> {
        self.store
            .graph
            .first_outgoing(working, EdgeType::WorkingCopyOf)
            .map(|edge| edge.target_id)
    }

    // ===== Search =====

    /// Source ids whose indexed values in `domain` approximately match `query`.
    ///
    /// Tree-level domains report the sources owning the matching trees.
    /// Multi-word mapped taxon names also match exactly through the
    /// whitespace-filled index.
    ///
    /// # Examples
    ///
    /// ```
    /// use phylograph::index::SearchableProperty;
    /// use phylograph::input::{InputNode, InputTree, SourceInput};
    /// use phylograph::TreeStore;
    ///
    /// let mut store = TreeStore::in_memory().unwrap();
    /// let tree = InputTree::new(InputNode::internal(vec![
    ///     InputNode::leaf("Homo sapiens").with_ott_id(770315),
    ///     InputNode::leaf("Pan troglodytes").with_ott_id(417950),
    /// ]));
    /// store.add_source(&SourceInput::new("S1").with_tree(tree), "local", false).unwrap();
    ///
    /// let hits = store.browser().search(SearchableProperty::MappedTaxonName, "Homo sapiens");
    /// assert!(hits.contains("S1"));
    /// ```
    pub fn search(&self, domain: SearchableProperty, query: &str) -> BTreeSet<String> {
        let (index, field) = domain.target();
        let mut nodes = self.store.indexes.fuzzy(index, field, query);

        if domain == SearchableProperty::MappedTaxonName {
            let filled = self.store.config.fill_whitespace(query);
            nodes.extend(self.store.indexes.get(
                IndexName::TreeByMappedTaxonNameWhitespaceFilled,
                NAME_FIELD,
                &filled,
            ));
        }

        nodes
            .into_iter()
            .filter_map(|node| self.string_property(node, keys::SOURCE_ID))
            .collect()
    }

    /// Fluent filter over stored tree roots.
    pub fn query(&self) -> TreeQuery<'a> {
        TreeQuery::new(self.store)
    }

    // ===== Summaries =====

    /// Summary of the source behind metadata node `meta`.
    pub fn source_summary(&self, meta: NodeId) -> Option<SourceSummary> {
        let node = self.store.graph.node(meta)?;
        if node.kind != NodeKind::SourceMeta {
            return None;
        }
        let props = &node.properties;
        let source_id = props.get_string(keys::SOURCE_ID)?.to_string();
        let location = props
            .get_string(keys::LOCATION)
            .unwrap_or(&self.store.config.local_location)
            .to_string();

        let mut trees: Vec<String> = self
            .store
            .graph
            .edges_of(meta, Direction::Outgoing, Some(EdgeType::MetadataFor))
            .into_iter()
            .filter_map(|edge| self.string_property(edge.target_id, keys::TREE_ID))
            .collect();
        trees.sort();

        let remotes_known = self
            .store
            .remotes
            .list()
            .iter()
            .filter(|remote| self.store.source_meta(remote, &source_id).is_some())
            .cloned()
            .collect();

        Some(SourceSummary {
            has_local_copy: self
                .store
                .source_meta(&self.store.config.local_location, &source_id)
                .is_some(),
            metadata: visible_metadata(props),
            source_id,
            location,
            trees,
            remotes_known,
        })
    }

    /// Summary of the tree rooted at `root`.
    pub fn tree_summary(&self, root: NodeId) -> Option<TreeSummary> {
        let node = self.store.graph.node(root)?;
        if !node.properties.flag(keys::IS_ROOT) {
            return None;
        }
        Some(TreeSummary {
            tree_id: node.properties.get_string(keys::TREE_ID)?.to_string(),
            source_id: node
                .properties
                .get_string(keys::SOURCE_ID)
                .unwrap_or_default()
                .to_string(),
            metadata: visible_metadata(&node.properties),
        })
    }

    // ===== Name resolution =====

    /// Name-resolution candidates recorded for `node`, best score first.
    pub fn tnrs_matches(&self, node: NodeId) -> Vec<TnrsMatch> {
        let mut matches: Vec<TnrsMatch> = self
            .store
            .graph
            .edges_of(node, Direction::Incoming, Some(EdgeType::TnrsMatchFor))
            .into_iter()
            .filter_map(|edge| self.store.graph.node(edge.source_id))
            .filter_map(|record| TnrsMatch::from_properties(&record.properties))
            .collect();
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches
    }

    fn string_property(&self, node: NodeId, key: &str) -> Option<String> {
        self.store
            .graph
            .node(node)
            .and_then(|node| node.properties.get_string(key))
            .map(String::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{InputNode, InputTree, SourceInput};

    fn primates() -> SourceInput {
        SourceInput::new("S1")
            .with_property("ot:curatorName", "Jane Doe")
            .with_property("ot:studyYear", 2012i64)
            .with_tree(InputTree::new(InputNode::internal(vec![
                InputNode::leaf("Homo sapiens").with_ott_id(770315),
                InputNode::leaf("Pan troglodytes").with_ott_id(417950),
            ])))
    }

    #[test]
    fn test_source_and_tree_ids() {
        let mut store = TreeStore::in_memory().unwrap();
        store.add_source(&primates(), "local", false).unwrap();
        store
            .add_source(&SourceInput::new("S2"), "local", false)
            .unwrap();

        let browser = store.browser();
        assert_eq!(browser.source_ids("local"), vec!["S1", "S2"]);
        assert_eq!(browser.source_ids_except("local", &["S1"]), vec!["S2"]);
        assert!(browser.source_ids("treebase").is_empty());
        assert_eq!(
            browser.tree_ids_for_source("local", "S1"),
            vec!["S1___local_id_0"]
        );
        assert!(browser
            .tree_ids_for_source_except("local", "S1", &["S1___local_id_0"])
            .is_empty());
        assert!(browser.tree_root("local", "S1___local_id_0").is_some());
        assert!(browser.tree_root("local", "missing").is_none());
    }

    #[test]
    fn test_search_domains() {
        let mut store = TreeStore::in_memory().unwrap();
        store.add_source(&primates(), "local", false).unwrap();
        let browser = store.browser();

        assert!(browser
            .search(SearchableProperty::CuratorName, "Jane")
            .contains("S1"));
        assert!(browser
            .search(SearchableProperty::MappedTaxonName, "sapiens")
            .contains("S1"));
        // One edit tolerated at this length
        assert!(browser
            .search(SearchableProperty::MappedTaxonName, "sapiems")
            .contains("S1"));
        assert!(browser
            .search(SearchableProperty::MappedTaxonOttId, "417950")
            .contains("S1"));
        assert!(browser
            .search(SearchableProperty::MappedTaxonName, "Gorilla")
            .is_empty());
    }

    #[test]
    fn test_summaries_hide_reserved_keys() {
        let mut store = TreeStore::in_memory().unwrap();
        let meta = store.add_source(&primates(), "local", false).unwrap();
        store.add_source(&primates(), "treebase", false).unwrap();

        let summary = store.browser().source_summary(meta).unwrap();
        assert_eq!(summary.source_id, "S1");
        assert_eq!(summary.location, "local");
        assert!(summary.has_local_copy);
        assert_eq!(summary.remotes_known, vec!["treebase"]);
        assert_eq!(summary.trees, vec!["S1___local_id_0"]);
        assert_eq!(
            summary.metadata.get("ot:studyYear"),
            Some(&serde_json::json!(2012))
        );
        assert!(!summary.metadata.contains_key(keys::LOCATION));

        let root = store.browser().tree_root("local", "S1___local_id_0").unwrap();
        let tree = store.browser().tree_summary(root).unwrap();
        assert_eq!(tree.source_id, "S1");
        assert!(!tree.metadata.contains_key(keys::TIP_MAPPED_NAMES));
        assert!(store.browser().tree_summary(meta).is_none());
    }

    #[test]
    fn test_tnrs_matches_best_first() {
        let mut store = TreeStore::in_memory().unwrap();
        store.add_source(&primates(), "local", false).unwrap();
        let root = store.browser().tree_root("local", "S1___local_id_0").unwrap();
        let tip = store.graph.children(root)[0];

        store
            .record_tnrs_matches(
                tip,
                &[
                    TnrsMatch::new("Homo", 770309, 0.4),
                    TnrsMatch::new("Homo sapiens", 770315, 0.95),
                ],
            )
            .unwrap();

        let matches = store.browser().tnrs_matches(tip);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].matched_ott_id, 770315);
        assert_eq!(store.browser().root_of_tree_containing(tip), Some(root));
        assert_eq!(store.browser().descendant_tips(root).unwrap().len(), 2);
    }
}

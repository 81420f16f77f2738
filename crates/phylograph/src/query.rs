//! Query builder for fluent tree queries.
//!
//! Provides a fluent interface for filtering stored tree roots by location,
//! source, arbitrary root properties and working-copy state.

use crate::graph::{EdgeType, Node, NodeId, NodeKind, PropertyValue};
use crate::store::{keys, TreeStore};

/// A filter predicate that can be applied to tree roots.
type FilterFn = Box<dyn Fn(&Node) -> bool>;

/// Fluent query builder over tree roots.
///
/// Only roots linked to source metadata are candidates, so originals hidden
/// behind an outstanding working copy are not returned.
///
/// # Examples
///
/// ```
/// use phylograph::TreeStore;
///
/// # fn example() -> phylograph::Result<()> {
/// let store = TreeStore::in_memory()?;
/// // ... ingest sources ...
///
/// // Find the local trees of one source tagged as a bootstrap consensus
/// let roots = store.browser().query()
///     .location("local")
///     .source_id("S1")
///     .property("ot:tag", "consensus")
///     .execute();
/// # Ok(())
/// # }
/// ```
pub struct TreeQuery<'a> {
    store: &'a TreeStore,
    filters: Vec<FilterFn>,
    limit_value: Option<usize>,
}

impl<'a> TreeQuery<'a> {
    /// Create a new query over the given store.
    pub fn new(store: &'a TreeStore) -> Self {
        Self {
            store,
            filters: Vec::new(),
            limit_value: None,
        }
    }

    /// Filter trees by location.
    pub fn location(self, location: &str) -> Self {
        self.property(keys::LOCATION, location)
    }

    /// Filter trees by owning source id.
    pub fn source_id(self, source_id: &str) -> Self {
        self.property(keys::SOURCE_ID, source_id)
    }

    /// Filter trees by exact root property match.
    ///
    /// A list-valued property matches when it contains the value.
    pub fn property<V: Into<PropertyValue>>(mut self, key: &str, value: V) -> Self {
        let key = key.to_string();
        let value = value.into();

        self.filters.push(Box::new(move |node| {
            match (&value, node.properties.get(&key)) {
                (PropertyValue::String(v1), Some(PropertyValue::String(v2))) => v1 == v2,
                (PropertyValue::String(v1), Some(PropertyValue::StringList(list))) => {
                    list.contains(v1)
                }
                (PropertyValue::Int(v1), Some(PropertyValue::Int(v2))) => v1 == v2,
                (PropertyValue::Int(v1), Some(PropertyValue::IntList(list))) => list.contains(v1),
                (PropertyValue::Float(v1), Some(PropertyValue::Float(v2))) => {
                    (v1 - v2).abs() < f64::EPSILON
                }
                (PropertyValue::Bool(v1), Some(PropertyValue::Bool(v2))) => v1 == v2,
                _ => false,
            }
        }));
        self
    }

    /// Filter trees whose root has a specific property (regardless of value).
    pub fn has_property(mut self, key: &str) -> Self {
        let key = key.to_string();
        self.filters
            .push(Box::new(move |node| node.properties.contains_key(&key)));
        self
    }

    /// Keep only working copies (`true`) or only saved trees (`false`).
    pub fn working_copy(mut self, working: bool) -> Self {
        self.filters.push(Box::new(move |node| {
            node.properties.flag(keys::IS_WORKING_COPY) == working
        }));
        self
    }

    /// Filter trees using a custom predicate on the root node.
    pub fn custom<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Node) -> bool + 'static,
    {
        self.filters.push(Box::new(predicate));
        self
    }

    /// Limit the number of results returned.
    pub fn limit(mut self, n: usize) -> Self {
        self.limit_value = Some(n);
        self
    }

    /// Execute the query and return matching root IDs in id order.
    pub fn execute(&self) -> Vec<NodeId> {
        let limit = self.limit_value.unwrap_or(usize::MAX);
        self.matching().take(limit).collect()
    }

    /// Count the number of matching trees without allocating a result vector.
    pub fn count(&self) -> usize {
        self.matching().count()
    }

    /// Check if any tree matches the query (short-circuits on first match).
    pub fn exists(&self) -> bool {
        self.matching().next().is_some()
    }

    fn matching(&self) -> impl Iterator<Item = NodeId> + '_ {
        let mut roots: Vec<&Node> = self
            .store
            .graph
            .nodes()
            .filter(|node| node.kind == NodeKind::TreeNode)
            .filter(|node| node.properties.flag(keys::IS_ROOT))
            .filter(|node| {
                self.store
                    .graph
                    .first_incoming(node.id, EdgeType::MetadataFor)
                    .is_some()
            })
            .collect();
        roots.sort_by_key(|node| node.id);

        roots
            .into_iter()
            .filter(|node| self.matches_filters(node))
            .map(|node| node.id)
    }

    /// Check if a node matches all filters.
    fn matches_filters(&self, node: &Node) -> bool {
        self.filters.iter().all(|filter| filter(node))
    }
}

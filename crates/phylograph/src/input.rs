//! In-memory trees handed to the store for ingestion.
//!
//! Parsers for Newick or NexSON build these values; the store never parses
//! text itself.

use crate::graph::{PropertyMap, PropertyValue};
use crate::store::keys;

/// One source (study) with its metadata and trees.
#[derive(Debug, Clone, Default)]
pub struct SourceInput {
    /// Source id, unique per location
    pub source_id: String,
    /// Source metadata copied verbatim onto the metadata node
    pub properties: PropertyMap,
    /// Parsed trees. `None` marks a tree the parser failed to produce.
    pub trees: Vec<Option<InputTree>>,
}

impl SourceInput {
    /// Create a source with no metadata and no trees.
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            ..Default::default()
        }
    }

    /// Builder pattern: add a metadata property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key, value);
        self
    }

    /// Builder pattern: add a tree.
    pub fn with_tree(mut self, tree: InputTree) -> Self {
        self.trees.push(Some(tree));
        self
    }

    /// Builder pattern: add a slot for a tree the parser failed to produce.
    pub fn with_missing_tree(mut self) -> Self {
        self.trees.push(None);
        self
    }
}

/// One parsed tree.
#[derive(Debug, Clone)]
pub struct InputTree {
    /// Tree id within the source, if the input supplied one
    pub id: Option<String>,
    /// Tree-level properties copied onto the stored root
    pub properties: PropertyMap,
    /// Root of the topology
    pub root: InputNode,
}

impl InputTree {
    /// Create a tree without id or properties.
    pub fn new(root: InputNode) -> Self {
        Self {
            id: None,
            properties: PropertyMap::new(),
            root,
        }
    }

    /// Builder pattern: set the tree id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Builder pattern: add a tree-level property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key, value);
        self
    }

    /// Tips in preorder.
    pub fn tips(&self) -> Vec<&InputNode> {
        let mut tips = Vec::new();
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            if node.is_leaf() {
                tips.push(node);
            }
            stack.extend(node.children.iter().rev());
        }
        tips
    }
}

/// One node of a parsed tree.
#[derive(Debug, Clone, Default)]
pub struct InputNode {
    /// Node label
    pub name: Option<String>,
    /// Open property bag (`ot:ottId`, `ot:originalLabel`, ...)
    pub properties: PropertyMap,
    /// Length of the branch to the parent
    pub branch_length: Option<f64>,
    /// The parser saw the ingroup start marker on this node
    pub ingroup_root: bool,
    /// Ordered children; empty for a leaf
    pub children: Vec<InputNode>,
}

impl InputNode {
    /// Create a named leaf.
    pub fn leaf(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Create an unnamed internal node.
    pub fn internal(children: Vec<InputNode>) -> Self {
        Self {
            children,
            ..Default::default()
        }
    }

    /// Whether the node has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Builder pattern: set the label.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builder pattern: add a property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key, value);
        self
    }

    /// Builder pattern: map the node to a taxon id.
    pub fn with_ott_id(self, ott_id: i64) -> Self {
        self.with_property(keys::OT_OTT_ID, ott_id)
    }

    /// Builder pattern: set the branch length.
    pub fn with_branch_length(mut self, length: f64) -> Self {
        self.branch_length = Some(length);
        self
    }

    /// Builder pattern: mark the node as the start of the ingroup.
    pub fn as_ingroup_root(mut self) -> Self {
        self.ingroup_root = true;
        self
    }
}

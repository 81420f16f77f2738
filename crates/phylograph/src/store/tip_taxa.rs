//! Tip-taxon arrays stored on tree roots for indexing.
//!
//! A tip is mapped when it carries an `ot:ottId`. Mapped tips contribute their
//! OTT id and mapped name (`ot:ottTaxonName`, else the tip name). Every tip
//! contributes its original name (`ot:originalLabel`, else the tip name).

use super::keys;
use crate::config::StoreConfig;
use crate::error::Result;
use crate::graph::{algorithms, NodeId, PropertyMap, TreeGraph};
use crate::input::InputTree;

/// The four denormalized tip-taxon arrays of one tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TipTaxa {
    /// Original labels of all tips
    pub original_names: Vec<String>,
    /// Mapped names of mapped tips
    pub mapped_names: Vec<String>,
    /// Mapped names with whitespace runs substituted
    pub mapped_names_no_spaces: Vec<String>,
    /// OTT ids of mapped tips
    pub mapped_ott_ids: Vec<i64>,
}

impl TipTaxa {
    /// Collect from `(name, properties)` pairs of tips.
    pub fn collect<'a>(
        tips: impl IntoIterator<Item = (Option<&'a str>, &'a PropertyMap)>,
        config: &StoreConfig,
    ) -> Self {
        let mut taxa = Self::default();
        for (name, props) in tips {
            if let Some(original) = props.get_string(keys::OT_ORIGINAL_LABEL).or(name) {
                taxa.original_names.push(original.to_string());
            }

            let Some(ott_id) = props.get_int(keys::OT_OTT_ID) else {
                continue;
            };
            taxa.mapped_ott_ids.push(ott_id);
            if let Some(mapped) = props.get_string(keys::OT_OTT_TAXON_NAME).or(name) {
                taxa.mapped_names.push(mapped.to_string());
                taxa.mapped_names_no_spaces.push(config.fill_whitespace(mapped));
            }
        }
        taxa
    }

    /// Collect from the tips of an input tree.
    pub fn from_input(tree: &InputTree, config: &StoreConfig) -> Self {
        Self::collect(
            tree.tips()
                .into_iter()
                .map(|tip| (tip.name.as_deref(), &tip.properties)),
            config,
        )
    }

    /// Collect from the stored tips below `root`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NodeNotFound`](crate::StoreError::NodeNotFound)
    /// if `root` doesn't exist.
    pub fn from_graph(graph: &TreeGraph, root: NodeId, config: &StoreConfig) -> Result<Self> {
        let mut tips = Vec::new();
        for id in algorithms::tips(graph, root)? {
            let node = graph.get_node(id)?;
            tips.push((node.name(), &node.properties));
        }
        Ok(Self::collect(tips, config))
    }

    /// Write the arrays onto `root`.
    pub(crate) fn store_on(self, graph: &mut TreeGraph, root: NodeId) -> Result<()> {
        let props = PropertyMap::new()
            .with(keys::TIP_ORIGINAL_NAMES, self.original_names)
            .with(keys::TIP_MAPPED_NAMES, self.mapped_names)
            .with(keys::TIP_MAPPED_NAMES_NO_SPACES, self.mapped_names_no_spaces)
            .with(keys::TIP_MAPPED_OTTIDS, self.mapped_ott_ids);
        graph.update_node_properties(root, &props)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::InputNode;

    #[test]
    fn test_mapped_iff_ott_id() {
        let tree = InputTree::new(InputNode::internal(vec![
            InputNode::leaf("Homo sapiens").with_ott_id(770315),
            InputNode::leaf("pan_trog")
                .with_ott_id(417950)
                .with_property(keys::OT_OTT_TAXON_NAME, "Pan troglodytes")
                .with_property(keys::OT_ORIGINAL_LABEL, "pan_trog_label"),
            InputNode::leaf("unknown"),
        ]));
        let taxa = TipTaxa::from_input(&tree, &StoreConfig::default());

        assert_eq!(
            taxa.original_names,
            vec!["Homo sapiens", "pan_trog_label", "unknown"]
        );
        assert_eq!(taxa.mapped_names, vec!["Homo sapiens", "Pan troglodytes"]);
        assert_eq!(
            taxa.mapped_names_no_spaces,
            vec!["Homo%s%sapiens", "Pan%s%troglodytes"]
        );
        assert_eq!(taxa.mapped_ott_ids, vec![770315, 417950]);
    }

    #[test]
    fn test_taxon_name_without_ott_id_is_unmapped() {
        let tree = InputTree::new(InputNode::internal(vec![
            InputNode::leaf("a").with_property(keys::OT_OTT_TAXON_NAME, "Alpha"),
            InputNode::leaf("b"),
        ]));
        let taxa = TipTaxa::from_input(&tree, &StoreConfig::default());
        assert!(taxa.mapped_names.is_empty());
        assert!(taxa.mapped_ott_ids.is_empty());
        assert_eq!(taxa.original_names.len(), 2);
    }
}

//! Property keys written and read by the store.
//!
//! Keys without a prefix are maintained by the store itself. Keys with the
//! `ot:` prefix belong to the shared tree vocabulary and arrive with input trees.

/// Node label (taxon name for tips, clade label for internal nodes)
pub const NAME: &str = "name";
/// Set on the single root node of every stored tree
pub const IS_ROOT: &str = "is_root";
/// Set on source metadata nodes
pub const IS_SOURCE_META: &str = "is_source_meta";
/// Tree id, unique per location
pub const TREE_ID: &str = "tree_id";
/// Source id, unique per location
pub const SOURCE_ID: &str = "source_id";
/// `local` or a remote identifier
pub const LOCATION: &str = "location";
/// Original labels of every tip
pub const TIP_ORIGINAL_NAMES: &str = "tip_original_names";
/// Taxonomic names of the mapped tips
pub const TIP_MAPPED_NAMES: &str = "tip_mapped_names";
/// Taxonomic names with whitespace replaced by the search substitute
pub const TIP_MAPPED_NAMES_NO_SPACES: &str = "tip_mapped_names_no_spaces";
/// OTT ids of the mapped tips
pub const TIP_MAPPED_OTTIDS: &str = "tip_mapped_ottids";
/// Rooting has been confirmed explicitly
pub const IS_ROOTED: &str = "is_rooted";
/// An ingroup has been designated for the tree
pub const INGROUP_IS_SET: &str = "ingroup_is_set";
/// Node id of the ingroup root, stored on the tree root
pub const INGROUP_NODE_ID: &str = "ingroup_node_id";
/// Set on the node where the ingroup starts
pub const INGROUP_START: &str = "ingroup_start";
/// Set on every node inside the ingroup
pub const WITHIN_INGROUP: &str = "within_ingroup";
/// Set on the root of a working copy
pub const IS_WORKING_COPY: &str = "is_working_copy";
/// Set on the root of a saved tree
pub const IS_SAVED_COPY: &str = "is_saved_copy";
/// Name resolution results have been recorded for this tree
pub const PROCESSED_BY_TNRS: &str = "processed_by_tnrs";

/// Label the tip carried before any taxonomic mapping
pub const OT_ORIGINAL_LABEL: &str = "ot:originalLabel";
/// Numeric taxon id in the reference taxonomy
pub const OT_OTT_ID: &str = "ot:ottId";
/// Taxonomic name for the mapped OTT id
pub const OT_OTT_TAXON_NAME: &str = "ot:ottTaxonName";
/// Written on tips
pub const OT_IS_OTU: &str = "ot:isOTU";

/// Branch length, on `ChildOf` edges
pub const BRANCH_LENGTH: &str = "branch_length";

/// Name of a TNRS candidate, on match nodes
pub const MATCHED_NAME: &str = "matched_name";
/// OTT id of a TNRS candidate, on match nodes
pub const MATCHED_OTT_ID: &str = "matched_ott_id";
/// Similarity score of a TNRS candidate, on match nodes
pub const SCORE: &str = "score";

/// Graph-level property holding the known remote locations
pub const KNOWN_REMOTES: &str = "known_remotes";
/// Graph-level flag set once a taxonomy node has been installed
pub const HAS_TAXONOMY: &str = "has_taxonomy";

/// Keys that the store maintains on tree and source nodes.
///
/// These are never copied from input property bags and are hidden from summaries.
pub const RESERVED: &[&str] = &[
    NAME,
    IS_ROOT,
    IS_SOURCE_META,
    TREE_ID,
    SOURCE_ID,
    LOCATION,
    TIP_ORIGINAL_NAMES,
    TIP_MAPPED_NAMES,
    TIP_MAPPED_NAMES_NO_SPACES,
    TIP_MAPPED_OTTIDS,
    IS_ROOTED,
    INGROUP_IS_SET,
    INGROUP_NODE_ID,
    INGROUP_START,
    WITHIN_INGROUP,
    IS_WORKING_COPY,
    IS_SAVED_COPY,
    PROCESSED_BY_TNRS,
];

/// Tree properties callers may not set directly.
pub const PROTECTED_TREE: &[&str] = &[
    TIP_MAPPED_NAMES,
    TIP_MAPPED_NAMES_NO_SPACES,
    TIP_MAPPED_OTTIDS,
    TIP_ORIGINAL_NAMES,
    INGROUP_IS_SET,
    INGROUP_NODE_ID,
    INGROUP_START,
    IS_ROOT,
    WITHIN_INGROUP,
    LOCATION,
    IS_ROOTED,
    SOURCE_ID,
    TREE_ID,
    IS_WORKING_COPY,
    IS_SAVED_COPY,
];

/// Source properties callers may not set directly.
pub const PROTECTED_SOURCE: &[&str] = &[SOURCE_ID, LOCATION, IS_SOURCE_META];

/// Whether `key` is maintained by the store.
pub fn is_reserved(key: &str) -> bool {
    RESERVED.contains(&key)
}

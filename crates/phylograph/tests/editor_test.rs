//! Integration tests for rerooting, ingroup designation and working copies.

use phylograph::graph::algorithms;
use phylograph::input::{InputNode, InputTree, SourceInput};
use phylograph::store::keys;
use phylograph::{NodeId, PropertyMap, StoreError, TreeStore};
use std::collections::BTreeSet;

const TREE_ID: &str = "S1_t1";

/// ((A,B),C) rooted above (A,B).
fn three_tip_store() -> (TreeStore, NodeId) {
    let mut store = TreeStore::in_memory().unwrap();
    let tree = InputTree::new(InputNode::internal(vec![
        InputNode::internal(vec![
            InputNode::leaf("A").with_ott_id(1),
            InputNode::leaf("B").with_ott_id(2),
        ]),
        InputNode::leaf("C").with_ott_id(3),
    ]))
    .with_id("t1")
    .with_property("ot:branchLengthMode", "ot:substitutionCount");
    store
        .add_source(&SourceInput::new("S1").with_tree(tree), "local", false)
        .unwrap();
    let root = store.browser().tree_root("local", TREE_ID).unwrap();
    (store, root)
}

fn find(store: &TreeStore, root: NodeId, name: &str) -> NodeId {
    algorithms::subtree(store.graph(), root)
        .unwrap()
        .into_iter()
        .find(|id| store.graph().get_node(*id).unwrap().name() == Some(name))
        .unwrap()
}

fn names(store: &TreeStore, nodes: Vec<NodeId>) -> BTreeSet<String> {
    nodes
        .into_iter()
        .filter_map(|id| store.graph().get_node(id).unwrap().name().map(String::from))
        .collect()
}

#[test]
fn test_reroot_on_tip() {
    let (mut store, root) = three_tip_store();
    let c = find(&store, root, "C");

    let new_root = store.editor().reroot(c).unwrap();
    assert_ne!(new_root, root);
    assert_eq!(store.browser().tree_root("local", TREE_ID), Some(new_root));

    let graph = store.graph();
    let children = graph.children(new_root);
    assert_eq!(children.len(), 2);
    assert!(children.contains(&c));

    // The other child is the intact (A,B) clade
    let clade = children.into_iter().find(|id| *id != c).unwrap();
    assert_eq!(
        names(&store, graph.children(clade)),
        BTreeSet::from(["A".to_string(), "B".to_string()])
    );

    for id in algorithms::subtree(graph, new_root).unwrap() {
        assert_ne!(graph.children(id).len(), 1, "node {id} has a single child");
    }
    assert!(store.browser().root_of_tree_containing(c) == Some(new_root));
}

#[test]
fn test_reroot_keeps_tree_metadata_and_tips() {
    let (mut store, root) = three_tip_store();
    let before = store.browser().tree_summary(root).unwrap();
    let tips_before = store
        .graph()
        .get_node(root)
        .unwrap()
        .properties
        .get_int_list(keys::TIP_MAPPED_OTTIDS)
        .map(<[i64]>::to_vec);

    let c = find(&store, root, "C");
    let new_root = store.editor().reroot(c).unwrap();

    let after = store.browser().tree_summary(new_root).unwrap();
    assert_eq!(after, before);
    let props = &store.graph().get_node(new_root).unwrap().properties;
    assert_eq!(
        props.get_int_list(keys::TIP_MAPPED_OTTIDS).map(<[i64]>::to_vec),
        tips_before
    );
    assert_eq!(
        store.browser().search(phylograph::SearchableProperty::MappedTaxonOttId, "3"),
        BTreeSet::from(["S1".to_string()])
    );
}

#[test]
fn test_reroot_on_root_is_identity() {
    let (mut store, root) = three_tip_store();
    let nodes = store.graph().node_count();
    assert_eq!(store.editor().reroot(root).unwrap(), root);
    assert_eq!(store.graph().node_count(), nodes);
}

#[test]
fn test_reroot_clears_ingroup() {
    let (mut store, root) = three_tip_store();
    let a = find(&store, root, "A");
    let clade = store.graph().parent(a).unwrap();
    store.editor().designate_ingroup(clade).unwrap();

    let c = find(&store, root, "C");
    let new_root = store.editor().reroot(c).unwrap();

    let graph = store.graph();
    assert!(!graph
        .get_node(new_root)
        .unwrap()
        .properties
        .flag(keys::INGROUP_IS_SET));
    for id in algorithms::subtree(graph, new_root).unwrap() {
        assert!(!graph.get_node(id).unwrap().properties.flag(keys::WITHIN_INGROUP));
    }
}

#[test]
fn test_designate_ingroup_is_idempotent() {
    let (mut store, root) = three_tip_store();
    let a = find(&store, root, "A");
    let clade = store.graph().parent(a).unwrap();

    let marked = |store: &TreeStore| -> BTreeSet<NodeId> {
        algorithms::subtree(store.graph(), root)
            .unwrap()
            .into_iter()
            .filter(|id| {
                store
                    .graph()
                    .get_node(*id)
                    .unwrap()
                    .properties
                    .flag(keys::WITHIN_INGROUP)
            })
            .collect()
    };

    store.editor().designate_ingroup(clade).unwrap();
    let once = marked(&store);
    store.editor().designate_ingroup(clade).unwrap();
    assert_eq!(marked(&store), once);
    assert_eq!(once.len(), 3);
}

#[test]
fn test_discard_restores_identity() {
    let (mut store, root) = three_tip_store();
    let summary = store.browser().tree_summary(root).unwrap();
    let tips: Vec<String> = store
        .graph()
        .get_node(root)
        .unwrap()
        .properties
        .get_string_list(keys::TIP_MAPPED_NAMES)
        .unwrap()
        .to_vec();

    let copy = store.editor().make_working_copy(root, None).unwrap();
    assert_eq!(store.browser().working_copy_of(root), Some(copy.root));
    assert_eq!(store.browser().original_of(copy.root), Some(root));

    let restored = store.editor().discard_working_copy(copy.root).unwrap();
    assert_eq!(restored, root);
    assert_eq!(store.browser().tree_root("local", TREE_ID), Some(root));
    assert_eq!(store.browser().tree_summary(root).unwrap(), summary);
    assert_eq!(
        store
            .graph()
            .get_node(root)
            .unwrap()
            .properties
            .get_string_list(keys::TIP_MAPPED_NAMES)
            .unwrap(),
        tips.as_slice()
    );
    assert!(store.browser().working_copy_of(root).is_none());
}

#[test]
fn test_save_keeps_edits_under_same_identity() {
    let (mut store, root) = three_tip_store();
    let copy = store.editor().make_working_copy(root, None).unwrap();

    let c = find(&store, copy.root, "C");
    let edited_root = store.editor().reroot(c).unwrap();
    store
        .set_properties(edited_root, &PropertyMap::new().with("ot:comment", "rerooted"))
        .unwrap();

    let saved = store.editor().save_working_copy(edited_root).unwrap();
    assert!(!store.graph().contains_node(root));
    assert_eq!(store.browser().tree_root("local", TREE_ID), Some(saved));

    let summary = store.browser().tree_summary(saved).unwrap();
    assert_eq!(summary.tree_id, TREE_ID);
    assert_eq!(summary.source_id, "S1");
    assert_eq!(summary.metadata["ot:comment"], "rerooted");
    assert_eq!(store.graph().children(saved).len(), 2);
    assert!(store.graph().children(saved).contains(&c));
}

#[test]
fn test_working_copy_guards() {
    let (mut store, root) = three_tip_store();
    store.editor().make_working_copy(root, None).unwrap();

    assert!(matches!(
        store.editor().make_working_copy(root, None),
        Err(StoreError::WorkingCopyExists { .. })
    ));
    assert!(matches!(
        store.editor().save_working_copy(root),
        Err(StoreError::NotAWorkingCopy { .. })
    ));
}

/// (((A,B)P,(C,D)Q)X,(E,F)Y) with branch lengths on A, P and X.
fn deep_store() -> (TreeStore, NodeId) {
    let mut store = TreeStore::in_memory().unwrap();
    let tree = InputTree::new(InputNode::internal(vec![
        InputNode::internal(vec![
            InputNode::internal(vec![
                InputNode::leaf("A").with_branch_length(0.1),
                InputNode::leaf("B"),
            ])
            .with_name("P")
            .with_branch_length(0.3),
            InputNode::internal(vec![InputNode::leaf("C"), InputNode::leaf("D")]).with_name("Q"),
        ])
        .with_name("X")
        .with_branch_length(0.7),
        InputNode::internal(vec![InputNode::leaf("E"), InputNode::leaf("F")]).with_name("Y"),
    ]))
    .with_id("t1");
    store
        .add_source(&SourceInput::new("S1").with_tree(tree), "local", false)
        .unwrap();
    let root = store.browser().tree_root("local", TREE_ID).unwrap();
    (store, root)
}

fn branch_length(store: &TreeStore, node: NodeId) -> Option<f64> {
    store
        .graph()
        .first_outgoing(node, phylograph::EdgeType::ChildOf)
        .and_then(|edge| edge.properties.get_float(keys::BRANCH_LENGTH))
}

#[test]
fn test_reroot_reverses_long_ancestor_chain() {
    let (mut store, root) = deep_store();
    let a = find(&store, root, "A");
    let tips_before = names(&store, store.browser().descendant_tips(root).unwrap());

    let new_root = store.editor().reroot(a).unwrap();
    assert_ne!(new_root, root);
    assert_eq!(store.browser().tree_root("local", TREE_ID), Some(new_root));

    let graph = store.graph();
    let parentless: Vec<NodeId> = graph
        .nodes()
        .filter(|node| node.kind == phylograph::NodeKind::TreeNode)
        .filter(|node| graph.parent(node.id).is_none())
        .map(|node| node.id)
        .collect();
    assert_eq!(parentless, vec![new_root]);
    for id in algorithms::subtree(graph, new_root).unwrap() {
        assert_ne!(graph.children(id).len(), 1, "node {id} has a single child");
    }
    assert_eq!(
        names(&store, store.browser().descendant_tips(new_root).unwrap()),
        tips_before
    );

    // The dissolved clade leaves its label behind
    assert!(algorithms::subtree(graph, new_root)
        .unwrap()
        .into_iter()
        .all(|id| graph.get_node(id).unwrap().name() != Some("Y")));

    assert_eq!(graph.parent(a), Some(new_root));
    assert_eq!(branch_length(&store, a), Some(0.1));

    // Labels follow the inverted branches
    let p_label = find(&store, new_root, "P");
    let x_label = find(&store, new_root, "X");
    assert_eq!(
        names(&store, graph.children(p_label)),
        BTreeSet::from(["Q".to_string(), "X".to_string()])
    );
    assert_eq!(
        names(&store, graph.children(x_label)),
        BTreeSet::from(["E".to_string(), "F".to_string()])
    );
    assert_eq!(graph.parent(x_label), Some(p_label));
    assert_eq!(branch_length(&store, x_label), Some(0.7));

    // The unlabeled former P now sits below the new root
    let former_p = graph.parent(p_label).unwrap();
    assert_eq!(graph.parent(former_p), Some(new_root));
    assert_eq!(graph.get_node(former_p).unwrap().name(), None);
    assert_eq!(branch_length(&store, p_label), Some(0.3));
    assert_eq!(
        names(&store, graph.children(former_p)),
        BTreeSet::from(["B".to_string(), "P".to_string()])
    );
}

//! Integration tests for source search and tree queries.

use phylograph::input::{InputNode, InputTree, SourceInput};
use phylograph::{SearchableProperty, TreeStore};
use std::collections::BTreeSet;

fn store() -> TreeStore {
    let mut store = TreeStore::in_memory().unwrap();
    let hominids = SourceInput::new("S1")
        .with_property("ot:studyPublicationReference", "Doe 2012")
        .with_property("ot:curatorName", "Jane Curator")
        .with_tree(
            InputTree::new(InputNode::internal(vec![
                InputNode::leaf("Homo sapiens").with_ott_id(770315),
                InputNode::leaf("Pan troglodytes").with_ott_id(417950),
            ]))
            .with_property("ot:branchLengthMode", "ot:substitutionCount"),
        );
    let felids = SourceInput::new("S2")
        .with_property("ot:studyPublicationReference", "Smith 2019")
        .with_tree(InputTree::new(InputNode::internal(vec![
            InputNode::leaf("Felis catus").with_ott_id(563166),
            InputNode::leaf("Panthera leo").with_ott_id(563151),
        ])));
    store.add_source(&hominids, "local", false).unwrap();
    store.add_source(&felids, "local", false).unwrap();
    store
}

fn ids(ids: &[&str]) -> BTreeSet<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

#[test]
fn test_exact_source_property_search() {
    let store = store();
    let browser = store.browser();
    assert_eq!(
        browser.search(SearchableProperty::PublicationReference, "Doe 2012"),
        ids(&["S1"])
    );
    assert_eq!(
        browser.search(SearchableProperty::CuratorName, "jane curator"),
        ids(&["S1"])
    );
}

#[test]
fn test_fuzzy_taxon_search() {
    let store = store();
    let browser = store.browser();
    assert_eq!(
        browser.search(SearchableProperty::MappedTaxonName, "Homo sapien"),
        ids(&["S1"])
    );
    assert_eq!(
        browser.search(SearchableProperty::MappedTaxonName, "Panthera leo"),
        ids(&["S2"])
    );
    assert!(browser
        .search(SearchableProperty::MappedTaxonName, "Quercus robur")
        .is_empty());
}

#[test]
fn test_whitespace_filled_name_matches() {
    let store = store();
    // Too far from the indexed name for fuzzy matching
    let hits = store
        .browser()
        .search(SearchableProperty::MappedTaxonName, "Homo\t\t\t\t sapiens");
    assert_eq!(hits, ids(&["S1"]));
}

#[test]
fn test_ott_id_and_tree_property_search() {
    let store = store();
    let browser = store.browser();
    assert_eq!(
        browser.search(SearchableProperty::MappedTaxonOttId, "563166"),
        ids(&["S2"])
    );
    assert_eq!(
        browser.search(SearchableProperty::BranchLengthMode, "ot:substitutionCount"),
        ids(&["S1"])
    );
}

#[test]
fn test_query_filters_tree_roots() {
    let store = store();
    let browser = store.browser();

    assert_eq!(browser.query().location("local").count(), 2);
    assert_eq!(browser.query().source_id("S2").count(), 1);
    assert!(browser
        .query()
        .has_property("ot:branchLengthMode")
        .source_id("S1")
        .exists());
    assert!(!browser.query().working_copy(true).exists());
    assert_eq!(browser.query().limit(1).execute().len(), 1);
}

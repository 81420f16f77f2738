//! Store configuration.
//!
//! A [`StoreConfig`] is built once when the store is opened and borrowed by
//! every component afterwards.

use crate::error::{Result, StoreError};
use crate::store::keys;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Configuration for a tree store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Location string of locally curated sources
    pub local_location: String,

    /// Inserted between source id and index for trees without a supplied id
    pub local_tree_id_prefix: String,

    /// Replacement for whitespace runs in the whitespace-filled name index
    pub whitespace_substitute: String,

    /// Tree root properties copied into the generic tree property index
    pub tree_search_properties: Vec<String>,

    /// Source metadata properties copied into the generic source property index
    pub source_search_properties: Vec<String>,

    /// Tree properties rejected by the property-mutation API
    pub protected_tree_properties: BTreeSet<String>,

    /// Source properties rejected by the property-mutation API
    pub protected_source_properties: BTreeSet<String>,

    /// Wait for the storage engine to sync every commit
    pub sync_writes: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            local_location: "local".to_string(),
            local_tree_id_prefix: "__local_id_".to_string(),
            whitespace_substitute: "%s%".to_string(),
            tree_search_properties: ["ot:branchLengthMode", "ot:tag"]
                .into_iter()
                .map(String::from)
                .collect(),
            source_search_properties: [
                "ot:curatorName",
                "ot:dataDeposit",
                "ot:studyPublicationReference",
                keys::SOURCE_ID,
                "ot:studyPublication",
                "ot:studyYear",
                "ot:tag",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            protected_tree_properties: keys::PROTECTED_TREE
                .iter()
                .map(|k| k.to_string())
                .collect(),
            protected_source_properties: keys::PROTECTED_SOURCE
                .iter()
                .map(|k| k.to_string())
                .collect(),
            sync_writes: false,
        }
    }
}

impl StoreConfig {
    /// Parse a configuration from JSON; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialization`] if the JSON is malformed.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| StoreError::serialization("Failed to parse store configuration", Some(e)))
    }

    /// Set the local location string
    pub fn with_local_location(mut self, location: impl Into<String>) -> Self {
        self.local_location = location.into();
        self
    }

    /// Set the whitespace substitute used for exact multi-word name search
    pub fn with_whitespace_substitute(mut self, substitute: impl Into<String>) -> Self {
        self.whitespace_substitute = substitute.into();
        self
    }

    /// Set the tree property whitelist for generic indexing
    pub fn with_tree_search_properties<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tree_search_properties = properties.into_iter().map(Into::into).collect();
        self
    }

    /// Set the source property whitelist for generic indexing
    pub fn with_source_search_properties<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.source_search_properties = properties.into_iter().map(Into::into).collect();
        self
    }

    /// Enable synchronous writes
    pub fn with_sync_writes(mut self, sync: bool) -> Self {
        self.sync_writes = sync;
        self
    }

    /// Whether `location` names the local store
    pub fn is_local(&self, location: &str) -> bool {
        location == self.local_location
    }

    /// Replace every whitespace run in `name` with the configured substitute
    pub fn fill_whitespace(&self, name: &str) -> String {
        name.split_whitespace()
            .collect::<Vec<_>>()
            .join(&self.whitespace_substitute)
    }
}

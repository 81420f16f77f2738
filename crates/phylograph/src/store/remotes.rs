//! Registry of known remote locations.
//!
//! The list is persisted as the `known_remotes` graph property and cached
//! here. It only grows.

use super::keys;
use crate::error::Result;
use crate::graph::{PropertyValue, TreeGraph};
use log::debug;

/// Cached list of remote location strings, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteRegistry {
    remotes: Vec<String>,
}

impl RemoteRegistry {
    /// Load the registry from the graph's persisted value.
    pub fn load(graph: &TreeGraph) -> Self {
        let remotes = match graph.graph_property(keys::KNOWN_REMOTES) {
            Some(PropertyValue::StringList(list)) => list.clone(),
            _ => Vec::new(),
        };
        Self { remotes }
    }

    /// Known remotes in registration order.
    pub fn list(&self) -> &[String] {
        &self.remotes
    }

    /// Whether `location` has been registered.
    pub fn contains(&self, location: &str) -> bool {
        self.remotes.iter().any(|r| r == location)
    }

    /// Register `location` if unseen, persisting the new list through `graph`.
    ///
    /// Returns `true` if the location was added.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the graph write fails.
    pub fn register(&mut self, graph: &mut TreeGraph, location: &str) -> Result<bool> {
        if self.contains(location) {
            return Ok(false);
        }

        let mut remotes = self.remotes.clone();
        remotes.push(location.to_string());
        graph.set_graph_property(keys::KNOWN_REMOTES, remotes.clone())?;
        self.remotes = remotes;
        debug!("Registered remote location: {location}");

        Ok(true)
    }
}

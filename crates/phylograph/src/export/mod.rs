//! Export of stored trees for display clients.
//!
//! - **JSON**: nested tree views with truncation and ancestor crumbs

pub mod json;

pub use json::{export_tree_json, export_tree_json_string};

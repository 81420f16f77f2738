//! Property system for tree node, source and edge metadata.
//!
//! Provides a tagged value type, a property bag with a builder pattern, and the
//! declared type tags accepted by the bulk property setter.

use crate::error::{Result, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Strongly-typed property value for node/edge metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    /// String value (taxon labels, citations, ids)
    String(String),
    /// Integer value (OTT ids, years, node references)
    Int(i64),
    /// Floating point value (branch lengths, match scores)
    Float(f64),
    /// Boolean flag (is_root, within_ingroup, ot:isOTU)
    Bool(bool),
    /// List of strings (tip names, tags)
    StringList(Vec<String>),
    /// List of integers (tip OTT ids)
    IntList(Vec<i64>),
    /// Explicit null/absence of value
    Null,
}

impl PropertyValue {
    /// Render the value as the strings a search index stores for it.
    ///
    /// Lists contribute one entry per element; `Null` contributes nothing.
    pub fn index_terms(&self) -> Vec<String> {
        match self {
            PropertyValue::String(s) => vec![s.clone()],
            PropertyValue::Int(i) => vec![i.to_string()],
            PropertyValue::Float(f) => vec![f.to_string()],
            PropertyValue::Bool(b) => vec![b.to_string()],
            PropertyValue::StringList(list) => list.clone(),
            PropertyValue::IntList(list) => list.iter().map(|i| i.to_string()).collect(),
            PropertyValue::Null => Vec::new(),
        }
    }

    /// Convert to a `serde_json::Value` for display clients.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            PropertyValue::String(s) => serde_json::Value::String(s.clone()),
            PropertyValue::Int(i) => serde_json::Value::from(*i),
            PropertyValue::Float(f) => serde_json::Value::from(*f),
            PropertyValue::Bool(b) => serde_json::Value::Bool(*b),
            PropertyValue::StringList(list) => serde_json::Value::from(list.clone()),
            PropertyValue::IntList(list) => serde_json::Value::from(list.clone()),
            PropertyValue::Null => serde_json::Value::Null,
        }
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Int(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        PropertyValue::Int(value as i64)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Float(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(value: Vec<String>) -> Self {
        PropertyValue::StringList(value)
    }
}

impl From<Vec<i64>> for PropertyValue {
    fn from(value: Vec<i64>) -> Self {
        PropertyValue::IntList(value)
    }
}

/// Declared type tag for a property supplied as text.
///
/// Used by the bulk property setter, where callers send parallel arrays of
/// keys, textual values and type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyType {
    /// `string`
    String,
    /// `integer`, `int` or `long`
    Integer,
    /// `decimal`, `float` or `double`
    Decimal,
    /// `boolean` or `bool`
    Boolean,
    /// `string_array`, comma separated
    StringArray,
    /// `integer_array`, comma separated
    IntegerArray,
}

impl PropertyType {
    /// Parse a type tag (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidArgument`] for an unrecognized tag.
    pub fn parse(tag: &str) -> Result<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "string" => Ok(PropertyType::String),
            "integer" | "int" | "long" => Ok(PropertyType::Integer),
            "decimal" | "float" | "double" => Ok(PropertyType::Decimal),
            "boolean" | "bool" => Ok(PropertyType::Boolean),
            "string_array" => Ok(PropertyType::StringArray),
            "integer_array" => Ok(PropertyType::IntegerArray),
            _ => Err(StoreError::invalid_argument(format!(
                "The type '{tag}' is not a valid property type"
            ))),
        }
    }

    /// Convert a textual value into a typed [`PropertyValue`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidArgument`] if the text does not parse as this type.
    pub fn convert(self, key: &str, raw: &str) -> Result<PropertyValue> {
        let bad = || {
            StoreError::invalid_argument(format!(
                "Value '{raw}' for property '{key}' is not a valid {self:?}"
            ))
        };
        let value = match self {
            PropertyType::String => PropertyValue::String(raw.to_string()),
            PropertyType::Integer => PropertyValue::Int(raw.trim().parse().map_err(|_| bad())?),
            PropertyType::Decimal => PropertyValue::Float(raw.trim().parse().map_err(|_| bad())?),
            PropertyType::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
                "true" => PropertyValue::Bool(true),
                "false" => PropertyValue::Bool(false),
                _ => return Err(bad()),
            },
            PropertyType::StringArray => PropertyValue::StringList(
                split_list(raw).map(str::to_string).collect(),
            ),
            PropertyType::IntegerArray => PropertyValue::IntList(
                split_list(raw)
                    .map(|item| item.parse::<i64>().map_err(|_| bad()))
                    .collect::<Result<Vec<_>>>()?,
            ),
        };
        Ok(value)
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|item| !item.is_empty())
}

/// Flexible key-value metadata store for nodes and edges.
///
/// Provides builder pattern and type-safe getters for properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyMap {
    data: HashMap<String, PropertyValue>,
}

impl PropertyMap {
    /// Create a new empty property map.
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
        }
    }

    /// Builder pattern: add a property and return self.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Insert a property value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        self.data.insert(key.into(), value.into());
    }

    /// Get a property value by key.
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.data.get(key)
    }

    /// Remove a property by key.
    pub fn remove(&mut self, key: &str) -> Option<PropertyValue> {
        self.data.remove(key)
    }

    /// Check if a property exists.
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Get the number of properties.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the property map is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterate over all properties.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &PropertyValue)> {
        self.data.iter()
    }

    /// Property keys in sorted order.
    pub fn sorted_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.data.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Copy every entry of `other` into this map, overwriting duplicates.
    pub fn merge(&mut self, other: &PropertyMap) {
        for (key, value) in other.iter() {
            self.data.insert(key.clone(), value.clone());
        }
    }

    /// Type-safe getter for string properties.
    pub fn get_string(&self, key: &str) -> Option<&str> {
        match self.data.get(key) {
            Some(PropertyValue::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Type-safe getter for integer properties.
    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.data.get(key) {
            Some(PropertyValue::Int(i)) => Some(*i),
            _ => None,
        }
    }

    /// Type-safe getter for float properties.
    pub fn get_float(&self, key: &str) -> Option<f64> {
        match self.data.get(key) {
            Some(PropertyValue::Float(f)) => Some(*f),
            _ => None,
        }
    }

    /// Type-safe getter for boolean properties.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.data.get(key) {
            Some(PropertyValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// Boolean flag lookup; a missing or non-boolean value reads as `false`.
    pub fn flag(&self, key: &str) -> bool {
        self.get_bool(key).unwrap_or(false)
    }

    /// Type-safe getter for string list properties.
    pub fn get_string_list(&self, key: &str) -> Option<&[String]> {
        match self.data.get(key) {
            Some(PropertyValue::StringList(list)) => Some(list),
            _ => None,
        }
    }

    /// Type-safe getter for integer list properties.
    pub fn get_int_list(&self, key: &str) -> Option<&[i64]> {
        match self.data.get(key) {
            Some(PropertyValue::IntList(list)) => Some(list),
            _ => None,
        }
    }
}

impl FromIterator<(String, PropertyValue)> for PropertyMap {
    fn from_iter<T: IntoIterator<Item = (String, PropertyValue)>>(iter: T) -> Self {
        Self {
            data: HashMap::from_iter(iter),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_map_builder() {
        let props = PropertyMap::new()
            .with("name", "Homo sapiens")
            .with("ot:ottId", 770315i64)
            .with("ot:isOTU", true);

        assert_eq!(props.get_string("name"), Some("Homo sapiens"));
        assert_eq!(props.get_int("ot:ottId"), Some(770315));
        assert!(props.flag("ot:isOTU"));
        assert!(!props.flag("is_root"));
    }

    #[test]
    fn test_property_map_type_safety() {
        let props = PropertyMap::new()
            .with("name", "Pan")
            .with("ot:studyYear", 2011i64);

        // Wrong type returns None
        assert_eq!(props.get_int("name"), None);
        assert_eq!(props.get_string("ot:studyYear"), None);
    }

    #[test]
    fn test_property_map_merge_overwrites() {
        let mut props = PropertyMap::new().with("ot:tag", "old").with("keep", 1i64);
        props.merge(&PropertyMap::new().with("ot:tag", "new"));

        assert_eq!(props.get_string("ot:tag"), Some("new"));
        assert_eq!(props.get_int("keep"), Some(1));
        assert_eq!(props.sorted_keys(), vec!["keep", "ot:tag"]);
    }

    #[test]
    fn test_index_terms() {
        let list: PropertyValue = vec!["a".to_string(), "b".to_string()].into();
        assert_eq!(list.index_terms(), vec!["a", "b"]);
        assert_eq!(PropertyValue::Int(7).index_terms(), vec!["7"]);
        assert!(PropertyValue::Null.index_terms().is_empty());
    }

    #[test]
    fn test_property_type_parse_aliases() {
        assert_eq!(PropertyType::parse("Integer").unwrap(), PropertyType::Integer);
        assert_eq!(PropertyType::parse("long").unwrap(), PropertyType::Integer);
        assert_eq!(PropertyType::parse("DOUBLE").unwrap(), PropertyType::Decimal);
        assert_eq!(PropertyType::parse("bool").unwrap(), PropertyType::Boolean);
        assert!(matches!(
            PropertyType::parse("quaternion"),
            Err(StoreError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_property_type_convert() {
        assert_eq!(
            PropertyType::Integer.convert("year", " 2012 ").unwrap(),
            PropertyValue::Int(2012)
        );
        assert_eq!(
            PropertyType::Boolean.convert("flag", "TRUE").unwrap(),
            PropertyValue::Bool(true)
        );
        assert_eq!(
            PropertyType::IntegerArray.convert("ids", "1, 2,3").unwrap(),
            PropertyValue::IntList(vec![1, 2, 3])
        );
        assert_eq!(
            PropertyType::StringArray.convert("tags", "a,,b").unwrap(),
            PropertyValue::StringList(vec!["a".to_string(), "b".to_string()])
        );
        assert!(PropertyType::Integer.convert("year", "twenty").is_err());
        assert!(PropertyType::Boolean.convert("flag", "yes").is_err());
    }
}

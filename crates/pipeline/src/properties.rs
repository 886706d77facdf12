//! The mutable property set that becomes an event's `properties` object.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Mapping from property name to JSON value.
///
/// Starts as the user-supplied `properties` object (or empty), is enriched by
/// the metadata steps, and is finally merged with the execution context.
/// Keys are kept in sorted order, so two bags with the same content always
/// serialise to the same bytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyBag(Map<String, Value>);

impl PropertyBag {
    /// Creates an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing JSON object.
    pub fn from_object(object: Map<String, Value>) -> Self {
        Self(object)
    }

    /// Sets `key` to `value`, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns `true` if `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the bag holds no properties.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Spreads `overrides` over this bag; on a key collision the value from
    /// `overrides` wins.
    pub fn merge(&mut self, overrides: PropertyBag) {
        self.0.extend(overrides.0);
    }

    /// Iterates over `(name, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Returns the underlying JSON object.
    pub fn into_object(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for PropertyBag {
    fn from(object: Map<String, Value>) -> Self {
        Self(object)
    }
}

//! Pipeline metadata tree
//!
//! Metadata is a JSON object tree that travels with each unit of work. The
//! bridge publishes it to scripts before execution and attaches whatever the
//! script left behind after execution.

use crate::errors::PointError;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    root: Value,
}

impl Default for Metadata {
    fn default() -> Self {
        Self::new()
    }
}

impl Metadata {
    /// An empty metadata tree.
    pub fn new() -> Self {
        Self {
            root: Value::Object(Map::new()),
        }
    }

    /// Wrap an existing JSON value. Non-object values are stored under an
    /// empty object's `"value"` key so the tree root stays an object.
    pub fn from_value(value: Value) -> Self {
        if value.is_object() {
            Self { root: value }
        } else {
            let mut map = Map::new();
            map.insert("value".to_string(), value);
            Self {
                root: Value::Object(map),
            }
        }
    }

    pub fn as_value(&self) -> &Value {
        &self.root
    }

    pub fn to_json_string(&self) -> Result<String, PointError> {
        Ok(serde_json::to_string(&self.root)?)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.root.get(key)
    }

    pub fn insert(&mut self, key: &str, value: Value) {
        if let Value::Object(map) = &mut self.root {
            map.insert(key.to_string(), value);
        }
    }

    /// Merge another JSON object into this tree, key by key. Colliding keys
    /// are overwritten by `other`; a non-object `other` lands under `"value"`.
    pub fn merge(&mut self, other: &Value) {
        match (&mut self.root, other) {
            (Value::Object(into), Value::Object(from)) => {
                for (key, value) in from {
                    into.insert(key.clone(), value.clone());
                }
            }
            (Value::Object(into), scalar) => {
                into.insert("value".to_string(), scalar.clone());
            }
            _ => {}
        }
    }
}

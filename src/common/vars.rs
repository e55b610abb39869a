//! String-keyed bag of arbitrary JSON values.
//!
//! `Vars` backs both node configuration data and the execution context that
//! is threaded through a run. The context is only ever extended between
//! steps: executors return a new `Vars` that is the old one plus their own
//! output key.

use std::fmt;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

/// Ordered-insensitive mapping from variable name to arbitrary JSON value.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct Vars {
    inner: Map<String, Value>,
}

impl Vars {
    /// create an empty vars
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value under `key`, overwriting any existing entry.
    pub fn set<V: Into<Value>>(
        &mut self,
        key: impl Into<String>,
        value: V,
    ) {
        self.inner.insert(key.into(), value.into());
    }

    /// Get a value by key, deserialized into `T`.
    pub fn get<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Option<T> {
        self.inner.get(key).and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Get the raw JSON value by key.
    pub fn get_value(
        &self,
        key: &str,
    ) -> Option<&Value> {
        self.inner.get(key)
    }

    /// Get a string field, treating blank values as absent.
    pub fn get_str(
        &self,
        key: &str,
    ) -> Option<String> {
        match self.inner.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        }
    }

    pub fn remove(
        &mut self,
        key: &str,
    ) -> Option<Value> {
        self.inner.remove(key)
    }

    pub fn contains_key(
        &self,
        key: &str,
    ) -> bool {
        self.inner.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.inner.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.inner.iter()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Return a copy with `key` set. Used by executors to extend the context
    /// without mutating the caller's copy.
    pub fn with<V: Into<Value>>(
        &self,
        key: impl Into<String>,
        value: V,
    ) -> Self {
        let mut next = self.clone();
        next.set(key, value);
        next
    }
}

impl From<Value> for Vars {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self {
                inner: map,
            },
            _ => Self::default(),
        }
    }
}

impl From<Vars> for Value {
    fn from(vars: Vars) -> Self {
        Value::Object(vars.inner)
    }
}

impl fmt::Display for Vars {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}", Value::Object(self.inner.clone()))
    }
}

//! The single parameters object every operation accepts.
//!
//! Keys are the local (camelCase) parameter names, values are JSON. Caller
//! supplied headers ride along and win over the defaults the builder adds.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ApiError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    values: Map<String, Value>,
    headers: Vec<(String, String)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing JSON object.
    pub fn from_map(values: Map<String, Value>) -> Self {
        Self {
            values,
            headers: Vec::new(),
        }
    }

    /// Set a parameter. Setting a key twice keeps the last value.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Set a parameter from any serializable value, typically one of the
    /// models in `types`.
    pub fn set_serialized<T: Serialize>(
        self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<Self, ApiError> {
        let value = serde_json::to_value(value)?;
        Ok(self.set(key, value))
    }

    /// Add a header override for this call only.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// A parameter value; `null` is reported as absent.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key).filter(|v| !v.is_null())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }
}

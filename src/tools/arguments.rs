//! Parsed tool-call arguments with typed accessors.

use serde_json::Value;

use crate::error::{ConciergeError, Result};

/// Key-value arguments decoded from the textual payload of a tool call.
#[derive(Debug, Clone, Default)]
pub struct ToolArguments {
    values: serde_json::Map<String, Value>,
}

impl ToolArguments {
    /// Wrap an already-structured value. Non-object values become empty.
    pub fn new(value: Value) -> Self {
        match value {
            Value::Object(values) => Self { values },
            _ => Self::default(),
        }
    }

    /// Parse the serialized textual form the remote service hands us.
    ///
    /// Fails with [`ConciergeError::ArgumentParse`] if the text is not valid
    /// JSON or does not decode to a key-value mapping.
    pub fn parse(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| ConciergeError::ArgumentParse(e.to_string()))?;
        match value {
            Value::Object(values) => Ok(Self { values }),
            other => Err(ConciergeError::ArgumentParse(format!(
                "expected a JSON object, got {other}"
            ))),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn get_str(&self, name: &str) -> Result<&str> {
        self.get(name)
            .and_then(Value::as_str)
            .ok_or_else(|| missing(name, "string"))
    }

    pub fn get_str_opt(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn get_bool(&self, name: &str) -> Result<bool> {
        self.get(name)
            .and_then(Value::as_bool)
            .ok_or_else(|| missing(name, "boolean"))
    }

    pub fn get_bool_opt(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    pub fn get_i64_opt(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    /// Deserialize the whole argument map into a typed struct.
    pub fn deserialize<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.values.clone()))
            .map_err(|e| ConciergeError::ArgumentParse(e.to_string()))
    }
}

fn missing(name: &str, kind: &str) -> ConciergeError {
    ConciergeError::ArgumentParse(format!("missing or non-{kind} argument '{name}'"))
}

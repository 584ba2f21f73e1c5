//! Typed access to tool call arguments.

use serde_json::{Map, Value};

use super::error::ToolError;

/// Parsed arguments of one tool call: always a JSON object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArguments {
    value: Map<String, Value>,
}

impl ToolArguments {
    pub fn new(value: Map<String, Value>) -> Self {
        Self { value }
    }

    /// Parse the raw argument text the model produced.
    ///
    /// Blank text is read as `{}`. Anything that is not a JSON object is
    /// rejected.
    pub fn parse(raw: &str) -> Result<Self, ToolError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }
        match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::Object(map)) => Ok(Self::new(map)),
            Ok(other) => Err(ToolError::invalid_arguments(format!(
                "expected a JSON object, got {}",
                json_type_name(&other)
            ))),
            Err(e) => Err(ToolError::invalid_arguments(e.to_string())),
        }
    }

    /// Get the raw JSON object.
    pub fn raw(&self) -> &Map<String, Value> {
        &self.value
    }

    /// Get a string argument by key.
    pub fn get_str(&self, key: &str) -> Result<&str, ToolError> {
        self.value
            .get(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::invalid_arguments(format!("missing string argument: {key}")))
    }

    /// Get an optional string argument.
    pub fn get_str_opt(&self, key: &str) -> Option<&str> {
        self.value.get(key).and_then(|v| v.as_str())
    }

    /// Get an integer argument.
    pub fn get_i64(&self, key: &str) -> Result<i64, ToolError> {
        self.value
            .get(key)
            .and_then(|v| v.as_i64())
            .ok_or_else(|| ToolError::invalid_arguments(format!("missing integer argument: {key}")))
    }

    /// Get an optional integer argument.
    pub fn get_i64_opt(&self, key: &str) -> Option<i64> {
        self.value.get(key).and_then(|v| v.as_i64())
    }

    /// Deserialize the entire arguments into a typed struct.
    pub fn deserialize<T: serde::de::DeserializeOwned>(&self) -> Result<T, ToolError> {
        serde_json::from_value(Value::Object(self.value.clone()))
            .map_err(|e| ToolError::invalid_arguments(format!("failed to deserialize arguments: {e}")))
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

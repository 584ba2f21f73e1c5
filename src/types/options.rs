//! Per-request completion options and the declared tool catalog.

use bon::Builder;
use serde::{Deserialize, Serialize};

/// Options sent with every completion request.
#[derive(Debug, Clone, Builder, Serialize, Deserialize, PartialEq)]
pub struct CompletionOptions {
    #[builder(into)]
    pub model: String,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    /// Tool catalog declared to the model.
    #[builder(default)]
    #[serde(default)]
    pub tools: Vec<ToolSpec>,
    #[builder(default)]
    #[serde(default)]
    pub tool_choice: ToolChoice,
    /// Request incremental delivery. When false the service answers with one
    /// terminal fragment.
    #[builder(default = true)]
    #[serde(default = "default_stream")]
    pub stream: bool,
    /// Extra top-level body fields for server-specific features such as
    /// `guided_json`. They are written last and override generated keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_body: Option<serde_json::Map<String, serde_json::Value>>,
}

fn default_stream() -> bool {
    true
}

impl CompletionOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self::builder().model(model).build()
    }

    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = tools;
        self
    }

    /// Add one extra body field.
    pub fn with_extra_body(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra_body
            .get_or_insert_with(serde_json::Map::new)
            .insert(key.into(), value);
        self
    }

    /// Constrain the reply to a JSON schema (vLLM-style guided decoding).
    pub fn with_guided_json(self, schema: serde_json::Value) -> Self {
        self.with_extra_body("guided_json", schema)
    }
}

/// A tool declared to the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema for the arguments object.
    pub parameters: serde_json::Value,
}

/// How the model may pick tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    #[default]
    Auto,
    None,
    Required,
    /// Force a call to the named tool.
    Function(String),
}

impl ToolChoice {
    /// Wire representation used by OpenAI-compatible servers.
    pub fn to_wire(&self) -> serde_json::Value {
        match self {
            Self::Auto => "auto".into(),
            Self::None => "none".into(),
            Self::Required => "required".into(),
            Self::Function(name) => serde_json::json!({
                "type": "function",
                "function": { "name": name },
            }),
        }
    }
}

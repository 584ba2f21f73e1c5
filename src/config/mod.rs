//! Configuration (layered: defaults < TOML file < environment).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ChatError;
use crate::types::CompletionOptions;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/v1";
pub const DEFAULT_MODEL: &str = "Bielik-11B-v2.5-Instruct";

/// Settings for talking to an OpenAI-compatible server and running turns.
#[derive(Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChatConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub stream: bool,
    pub request_timeout_ms: u64,
    pub max_tool_rounds: usize,
    pub parallel_tools: bool,
    pub system_prompt: Option<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: "EMPTY".to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: Some(0.2),
            max_tokens: Some(500),
            stream: true,
            request_timeout_ms: 120_000,
            max_tool_rounds: 1,
            parallel_tools: false,
            system_prompt: None,
        }
    }
}

impl std::fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"..")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("stream", &self.stream)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("max_tool_rounds", &self.max_tool_rounds)
            .field("parallel_tools", &self.parallel_tools)
            .field("system_prompt", &self.system_prompt)
            .finish()
    }
}

impl ChatConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ChatError> {
        toml::from_str(raw)
            .map_err(|e| ChatError::Configuration(format!("invalid config file: {e}")))
    }

    /// Read a TOML config file. Missing keys keep their defaults.
    pub fn from_toml_file(path: &Path) -> Result<Self, ChatError> {
        let raw = fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
            .map_err(|e| ChatError::Configuration(format!("{}: {e}", path.display())))
    }

    /// `~/.toolchat/config.toml`.
    pub fn default_path() -> PathBuf {
        directories::UserDirs::new()
            .map(|dirs| dirs.home_dir().join(".toolchat"))
            .unwrap_or_else(|| PathBuf::from(".toolchat"))
            .join("config.toml")
    }

    /// Full resolution: defaults, then the config file (the given path, or
    /// the default path if it exists), then `.env` and environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ChatError> {
        let mut config = match path {
            Some(path) => Self::from_toml_file(path)?,
            None => {
                let default = Self::default_path();
                if default.is_file() {
                    Self::from_toml_file(&default)?
                } else {
                    Self::default()
                }
            }
        };
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Defaults overlaid with the environment only.
    pub fn from_env() -> Result<Self, ChatError> {
        let _ = dotenvy::dotenv();
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ChatError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("TOOLCHAT_BASE_URL") {
            self.base_url = url;
        }
        if let Some(key) = lookup("TOOLCHAT_API_KEY") {
            self.api_key = key;
        }
        if let Some(model) = lookup("TOOLCHAT_MODEL") {
            self.model = model;
        }
        if let Some(raw) = lookup("TOOLCHAT_TEMPERATURE") {
            self.temperature = Some(parse_env("TOOLCHAT_TEMPERATURE", &raw)?);
        }
        if let Some(raw) = lookup("TOOLCHAT_MAX_TOKENS") {
            self.max_tokens = Some(parse_env("TOOLCHAT_MAX_TOKENS", &raw)?);
        }
        if let Some(raw) = lookup("TOOLCHAT_STREAM") {
            self.stream = parse_env("TOOLCHAT_STREAM", &raw)?;
        }
        if let Some(raw) = lookup("TOOLCHAT_TIMEOUT_MS") {
            self.request_timeout_ms = parse_env("TOOLCHAT_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = lookup("TOOLCHAT_MAX_TOOL_ROUNDS") {
            self.max_tool_rounds = parse_env("TOOLCHAT_MAX_TOOL_ROUNDS", &raw)?;
        }
        Ok(())
    }

    /// Request options for the configured model. The tool catalog is left
    /// empty for the orchestrator to fill.
    pub fn completion_options(&self) -> CompletionOptions {
        CompletionOptions::builder()
            .model(self.model.clone())
            .maybe_temperature(self.temperature)
            .maybe_max_tokens(self.max_tokens)
            .stream(self.stream)
            .build()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn parse_env<T>(key: &str, raw: &str) -> Result<T, ChatError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| ChatError::Configuration(format!("{key}={raw:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_target_a_local_server() {
        let config = ChatConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.api_key, "EMPTY");
        assert_eq!(config.temperature, Some(0.2));
        assert_eq!(config.max_tokens, Some(500));
        assert_eq!(config.max_tool_rounds, 1);
        assert!(config.stream);
    }

    #[test]
    fn toml_file_overrides_only_present_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "model = \"tiny\"\nstream = false\nmax_tool_rounds = 3").unwrap();

        let config = ChatConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.model, "tiny");
        assert!(!config.stream);
        assert_eq!(config.max_tool_rounds, 3);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn malformed_toml_is_a_configuration_error() {
        let err = ChatConfig::from_toml_str("model = ").unwrap_err();
        assert!(matches!(err, ChatError::Configuration(_)));
    }

    #[test]
    fn environment_beats_file_values() {
        let mut config = ChatConfig::from_toml_str("model = \"from-file\"").unwrap();
        config
            .apply_overrides(env(&[
                ("TOOLCHAT_MODEL", "from-env"),
                ("TOOLCHAT_TEMPERATURE", "0.7"),
                ("TOOLCHAT_STREAM", "false"),
            ]))
            .unwrap();
        assert_eq!(config.model, "from-env");
        assert_eq!(config.temperature, Some(0.7));
        assert!(!config.stream);
    }

    #[test]
    fn bad_numeric_env_value_is_rejected() {
        let mut config = ChatConfig::default();
        let err = config
            .apply_overrides(env(&[("TOOLCHAT_MAX_TOKENS", "lots")]))
            .unwrap_err();
        assert!(matches!(err, ChatError::Configuration(msg) if msg.contains("TOOLCHAT_MAX_TOKENS")));
    }

    #[test]
    fn completion_options_follow_config() {
        let config = ChatConfig {
            model: "m".into(),
            max_tokens: None,
            ..ChatConfig::default()
        };
        let options = config.completion_options();
        assert_eq!(options.model, "m");
        assert_eq!(options.temperature, Some(0.2));
        assert_eq!(options.max_tokens, None);
        assert!(options.tools.is_empty());
    }
}

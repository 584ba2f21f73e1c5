//! CLI entry point for toolchat.

pub mod transcript;
pub mod weather;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::ChatConfig;

/// toolchat CLI
#[derive(Parser, Debug)]
#[command(name = "toolchat", version, about = "Tool-calling chat against an OpenAI-compatible server")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run prompts as successive turns of one conversation
    Chat(ChatArgs),
}

/// Arguments for the `chat` subcommand.
#[derive(Parser, Debug)]
pub struct ChatArgs {
    /// Model name (defaults to the configured model)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Server base URL, e.g. http://127.0.0.1:8000/v1
    #[arg(long)]
    pub base_url: Option<String>,

    /// System prompt
    #[arg(short, long)]
    pub system: Option<String>,

    /// Temperature (0.0 - 2.0)
    #[arg(short, long)]
    pub temperature: Option<f64>,

    /// Max tokens
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Ask for a single buffered response instead of a stream
    #[arg(long)]
    pub no_stream: bool,

    /// Config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Prompts, one turn each
    #[arg(required = true)]
    pub prompts: Vec<String>,
}

impl ChatArgs {
    /// Command-line flags win over file and environment settings.
    pub fn apply_to(&self, config: &mut ChatConfig) {
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
        }
        if let Some(system) = &self.system {
            config.system_prompt = Some(system.clone());
        }
        if let Some(t) = self.temperature {
            config.temperature = Some(t);
        }
        if let Some(max) = self.max_tokens {
            config.max_tokens = Some(max);
        }
        if self.no_stream {
            config.stream = false;
        }
    }
}

impl Cli {
    /// Parse CLI arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

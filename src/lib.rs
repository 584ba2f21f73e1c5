//! toolchat: streaming chat-completion turns with tool calling.
//!
//! Talks to any OpenAI-compatible `/chat/completions` endpoint. Streamed
//! response fragments are folded into one assistant message, requested tool
//! calls are run against a registry, and the model is asked once more with
//! the tool results in the history.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use toolchat::prelude::*;
//!
//! # async fn example() -> toolchat::error::Result<()> {
//! let config = ChatConfig::from_env()?;
//! let service = Arc::new(OpenAiCompatibleService::from_config(&config));
//! let orchestrator = TurnOrchestrator::from_config(service, Arc::new(ToolRegistry::new()), &config);
//!
//! let mut conversation = ConversationState::new();
//! let outcome = orchestrator.run_turn(&mut conversation, "Hello!").await?;
//! println!("{}", outcome.text());
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod config;
pub mod conversation;
pub mod error;
pub mod orchestrator;
pub mod prelude;
pub mod provider;
pub mod tools;
pub mod types;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;

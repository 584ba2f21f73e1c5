//! Tool system for function calling.

pub mod arguments;
pub mod error;
pub mod registry;
pub mod tool;
pub mod types;

pub use arguments::ToolArguments;
pub use error::ToolError;
pub use registry::ToolRegistry;
pub use tool::{FnTool, Tool, ToolContext};
pub use types::ToolParameters;

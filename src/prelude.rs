//! Convenience re-exports for common use.

pub use crate::aggregate::{aggregate, FragmentAggregator};
pub use crate::config::ChatConfig;
pub use crate::conversation::{ConversationState, SharedConversation};
pub use crate::error::{ChatError, Result};
pub use crate::orchestrator::{TurnEvent, TurnOrchestrator, TurnOutcome, TurnStatus};
pub use crate::provider::{CompletionService, OpenAiCompatibleService};
pub use crate::tools::{FnTool, Tool, ToolArguments, ToolError, ToolParameters, ToolRegistry};
pub use crate::types::{
    AssistantMessage, CompletionOptions, FinishReason, Message, ResponseFragment, Role,
    ToolCallDelta, ToolCallRequest, ToolChoice, ToolMessage, ToolSpec,
};

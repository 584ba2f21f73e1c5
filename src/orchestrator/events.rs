//! Turn event stream types.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::types::{TurnId, TurnOutcome};
use crate::types::{AssistantMessage, ToolMessage};

/// Events emitted while a turn runs, in the order they happen.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    TurnStarted {
        turn_id: TurnId,
    },
    /// A piece of assistant text as it streams in.
    ContentDelta {
        text: String,
    },
    /// The assistant message just appended to the conversation.
    AssistantMessage {
        message: AssistantMessage,
    },
    ToolCallsPending {
        count: usize,
    },
    ToolResult {
        message: ToolMessage,
        is_error: bool,
    },
    TurnFinished {
        outcome: TurnOutcome,
    },
}

/// Callback receiving turn events synchronously.
pub type TurnEventSink = Arc<dyn Fn(TurnEvent) + Send + Sync>;

pub(crate) struct TurnEventEmitter {
    sink: Option<TurnEventSink>,
}

impl TurnEventEmitter {
    pub(crate) fn new(sink: Option<TurnEventSink>) -> Self {
        Self { sink }
    }

    pub(crate) fn emit(&self, event: TurnEvent) {
        let Some(sink) = &self.sink else { return; };
        (sink)(event);
    }
}

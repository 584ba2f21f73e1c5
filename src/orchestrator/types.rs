//! Core turn types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{AssistantMessage, ToolMessage};

/// Unique turn identifier.
pub type TurnId = Uuid;

/// How a turn ended.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    Completed,
    TransportFailed,
    Canceled,
}

/// Where a turn currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TurnPhase {
    AwaitFirstResponse,
    ExecutingTools,
    AwaitFollowUp,
    Done,
}

/// Summary of one turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnOutcome {
    pub turn_id: TurnId,
    pub status: TurnStatus,
    /// Last assistant message appended by the turn. For a transport failure
    /// this is the synthetic error message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_message: Option<AssistantMessage>,
    /// Completion-service round trips made.
    pub service_calls: usize,
    /// Messages appended to the conversation, including the user message.
    pub appended: usize,
    /// Tool messages appended, in the order they were recorded.
    #[serde(default)]
    pub tool_results: Vec<ToolMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub finished_at: DateTime<Utc>,
}

impl TurnOutcome {
    pub(crate) fn new(turn_id: TurnId) -> Self {
        Self {
            turn_id,
            status: TurnStatus::Completed,
            final_message: None,
            service_calls: 0,
            appended: 0,
            tool_results: Vec::new(),
            error: None,
            finished_at: Utc::now(),
        }
    }

    pub(crate) fn finish(mut self, status: TurnStatus, error: Option<String>) -> Self {
        self.status = status;
        self.error = error;
        self.finished_at = Utc::now();
        self
    }

    /// Final assistant text, or "" when the model only requested tools.
    pub fn text(&self) -> &str {
        self.final_message
            .as_ref()
            .map(AssistantMessage::text_or_empty)
            .unwrap_or("")
    }

    pub fn is_completed(&self) -> bool {
        self.status == TurnStatus::Completed
    }
}

//! Conversation message history.

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use crate::error::ChatError;
use crate::types::{Message, ToolMessage};

/// Append-only, causally ordered message log.
///
/// Appending a tool message is checked: it must answer a tool call of the
/// nearest preceding assistant message (with only tool messages in between),
/// and each call is answered at most once.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    messages: Vec<Message>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a conversation with a system prompt.
    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(prompt)],
        }
    }

    /// Add a user message.
    pub fn add_user_message(&mut self, text: impl Into<String>) {
        self.messages.push(Message::user(text));
    }

    /// Add any message, enforcing tool-result correlation.
    pub fn add_message(&mut self, message: Message) -> Result<(), ChatError> {
        if let Message::Tool(ref tool) = message {
            self.check_tool_answer(tool)?;
        }
        self.messages.push(message);
        Ok(())
    }

    fn check_tool_answer(&self, tool: &ToolMessage) -> Result<(), ChatError> {
        let mut answered = Vec::new();
        for message in self.messages.iter().rev() {
            match message {
                Message::Tool(prior) => answered.push(prior.tool_call_id.as_str()),
                Message::Assistant(assistant) => {
                    if assistant.tool_call(&tool.tool_call_id).is_none() {
                        return Err(ChatError::InvalidState(format!(
                            "tool result '{}' does not match any tool call of the preceding assistant message",
                            tool.tool_call_id
                        )));
                    }
                    if answered.contains(&tool.tool_call_id.as_str()) {
                        return Err(ChatError::InvalidState(format!(
                            "tool call '{}' already has a result",
                            tool.tool_call_id
                        )));
                    }
                    return Ok(());
                }
                _ => break,
            }
        }
        Err(ChatError::InvalidState(format!(
            "tool result '{}' has no preceding assistant message",
            tool.tool_call_id
        )))
    }

    /// Get all messages.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Messages appended since the log had `len` entries.
    pub fn since(&self, len: usize) -> &[Message] {
        &self.messages[len.min(self.messages.len())..]
    }

    /// Get the last N messages.
    pub fn last_n(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// A conversation shared between tasks; at most one turn holds it at a time.
#[derive(Debug, Clone, Default)]
pub struct SharedConversation {
    inner: Arc<Mutex<ConversationState>>,
}

impl SharedConversation {
    pub fn new(state: ConversationState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    /// Wait for exclusive access.
    pub async fn lock(&self) -> MutexGuard<'_, ConversationState> {
        self.inner.lock().await
    }

    /// Take exclusive access, or fail if a turn is already in flight.
    pub fn try_lock(&self) -> Result<MutexGuard<'_, ConversationState>, ChatError> {
        self.inner.try_lock().map_err(|_| ChatError::TurnInProgress)
    }

    /// Copy of the current history.
    pub async fn snapshot(&self) -> Vec<Message> {
        self.inner.lock().await.messages().to_vec()
    }
}

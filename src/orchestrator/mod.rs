//! Turn orchestration: user message in, finalized assistant message out.
//!
//! A turn appends the user message, calls the completion service, appends
//! the aggregated assistant message and, if that message requests tools,
//! resolves every call and asks the service once more. With
//! `max_tool_rounds > 1` the tool/follow-up cycle repeats until the model
//! stops requesting tools or the cap is reached.

pub mod events;
mod tool_phase;
pub mod types;

pub use events::{TurnEvent, TurnEventSink};
pub use types::{TurnId, TurnOutcome, TurnStatus};

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::aggregate::aggregate_stream;
use crate::config::ChatConfig;
use crate::conversation::{ConversationState, SharedConversation};
use crate::error::ChatError;
use crate::provider::{CompletionRequest, CompletionService};
use crate::tools::ToolRegistry;
use crate::types::{AssistantMessage, CompletionOptions, Message};
use crate::util::timeout::with_timeout;

use events::TurnEventEmitter;
use tool_phase::execute_tool_calls;
use types::TurnPhase;

/// Drives turns against a completion service and a tool registry.
#[derive(Clone)]
pub struct TurnOrchestrator {
    service: Arc<dyn CompletionService>,
    tools: Arc<ToolRegistry>,
    options: CompletionOptions,
    max_tool_rounds: usize,
    parallel_tools: bool,
    request_timeout: Option<Duration>,
    event_sink: Option<TurnEventSink>,
}

impl TurnOrchestrator {
    /// An empty tool catalog in `options` is filled from the registry.
    pub fn new(
        service: Arc<dyn CompletionService>,
        tools: Arc<ToolRegistry>,
        mut options: CompletionOptions,
    ) -> Self {
        if options.tools.is_empty() {
            options.tools = tools.specs();
        }
        Self {
            service,
            tools,
            options,
            max_tool_rounds: 1,
            parallel_tools: false,
            request_timeout: None,
            event_sink: None,
        }
    }

    pub fn from_config(
        service: Arc<dyn CompletionService>,
        tools: Arc<ToolRegistry>,
        config: &ChatConfig,
    ) -> Self {
        Self::new(service, tools, config.completion_options())
            .with_max_tool_rounds(config.max_tool_rounds)
            .with_parallel_tools(config.parallel_tools)
            .with_request_timeout(config.request_timeout())
    }

    /// Number of tool/follow-up cycles allowed per turn (at least 1).
    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds.max(1);
        self
    }

    pub fn with_parallel_tools(mut self, parallel: bool) -> Self {
        self.parallel_tools = parallel;
        self
    }

    /// Deadline for each completion call, covering the whole stream.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn with_event_sink(mut self, sink: TurnEventSink) -> Self {
        self.event_sink = Some(sink);
        self
    }

    pub fn options(&self) -> &CompletionOptions {
        &self.options
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn service_name(&self) -> &str {
        self.service.name()
    }

    /// Run one turn.
    ///
    /// Transport failures append a synthetic assistant message describing
    /// the failure, then return the error.
    pub async fn run_turn(
        &self,
        state: &mut ConversationState,
        user_text: impl Into<String>,
    ) -> Result<TurnOutcome, ChatError> {
        self.run_turn_with_cancel(state, user_text, CancellationToken::new())
            .await
    }

    /// Run a turn on a shared conversation, waiting for any turn in flight.
    pub async fn run_shared_turn(
        &self,
        conversation: &SharedConversation,
        user_text: impl Into<String>,
    ) -> Result<TurnOutcome, ChatError> {
        let mut state = conversation.lock().await;
        self.run_turn(&mut state, user_text).await
    }

    /// Run a turn on a shared conversation, or fail with
    /// [`ChatError::TurnInProgress`] if another turn holds it.
    pub async fn try_run_shared_turn(
        &self,
        conversation: &SharedConversation,
        user_text: impl Into<String>,
    ) -> Result<TurnOutcome, ChatError> {
        let mut state = conversation.try_lock()?;
        self.run_turn(&mut state, user_text).await
    }

    /// Run one turn that stops at the next suspension point once `cancel`
    /// fires. Messages appended before that point are kept.
    pub async fn run_turn_with_cancel(
        &self,
        state: &mut ConversationState,
        user_text: impl Into<String>,
        cancel: CancellationToken,
    ) -> Result<TurnOutcome, ChatError> {
        self.drive_turn(state, user_text.into(), &self.options, cancel)
            .await
    }

    /// Run one turn with `options` in place of the orchestrator's own, for
    /// example to request a JSON schema for this turn only. An empty tool
    /// catalog is filled from the registry.
    pub async fn run_turn_with_options(
        &self,
        state: &mut ConversationState,
        user_text: impl Into<String>,
        mut options: CompletionOptions,
    ) -> Result<TurnOutcome, ChatError> {
        if options.tools.is_empty() {
            options.tools = self.tools.specs();
        }
        self.drive_turn(state, user_text.into(), &options, CancellationToken::new())
            .await
    }

    async fn drive_turn(
        &self,
        state: &mut ConversationState,
        user_text: String,
        options: &CompletionOptions,
        cancel: CancellationToken,
    ) -> Result<TurnOutcome, ChatError> {
        let turn_id = Uuid::new_v4();
        let emitter = TurnEventEmitter::new(self.event_sink.clone());
        let start_len = state.len();
        let mut outcome = TurnOutcome::new(turn_id);
        emitter.emit(TurnEvent::TurnStarted { turn_id });

        state.add_user_message(user_text);

        let mut phase = TurnPhase::AwaitFirstResponse;
        let mut round = 0usize;
        loop {
            let request = CompletionRequest {
                messages: state.messages().to_vec(),
                options: options.clone(),
            };
            outcome.service_calls += 1;
            debug!(
                %turn_id,
                round,
                service = self.service.name(),
                messages = request.messages.len(),
                "calling completion service"
            );

            let assistant = match self.complete(&request, &emitter, &cancel).await {
                Ok(message) => message,
                Err(ChatError::Canceled) => {
                    outcome.appended = state.len() - start_len;
                    return Err(self.canceled(&emitter, outcome));
                }
                Err(err) => {
                    error!(%turn_id, round, error = %err, "completion call failed");
                    let synthetic = AssistantMessage::text(transport_failure_text(phase, &err));
                    state.add_message(Message::Assistant(synthetic.clone()))?;
                    emitter.emit(TurnEvent::AssistantMessage {
                        message: synthetic.clone(),
                    });
                    outcome.final_message = Some(synthetic);
                    outcome.appended = state.len() - start_len;
                    let outcome =
                        outcome.finish(TurnStatus::TransportFailed, Some(err.to_string()));
                    emitter.emit(TurnEvent::TurnFinished { outcome });
                    return Err(err);
                }
            };

            state.add_message(Message::Assistant(assistant.clone()))?;
            emitter.emit(TurnEvent::AssistantMessage {
                message: assistant.clone(),
            });
            let calls = assistant.tool_calls.clone();
            outcome.final_message = Some(assistant);

            if calls.is_empty() {
                break;
            }
            if round >= self.max_tool_rounds {
                warn!(
                    %turn_id,
                    rounds = self.max_tool_rounds,
                    pending = calls.len(),
                    "tool round limit reached; leaving tool calls unresolved"
                );
                break;
            }

            phase = TurnPhase::ExecutingTools;
            debug!(%turn_id, round, count = calls.len(), ?phase, "resolving tool calls");
            emitter.emit(TurnEvent::ToolCallsPending { count: calls.len() });

            let results = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    outcome.appended = state.len() - start_len;
                    return Err(self.canceled(&emitter, outcome));
                }
                results = execute_tool_calls(&self.tools, &calls, self.parallel_tools, &cancel) => results,
            };

            for result in results {
                state.add_message(Message::Tool(result.message.clone()))?;
                emitter.emit(TurnEvent::ToolResult {
                    message: result.message.clone(),
                    is_error: result.is_error,
                });
                outcome.tool_results.push(result.message);
            }

            round += 1;
            phase = TurnPhase::AwaitFollowUp;
        }

        phase = TurnPhase::Done;
        outcome.appended = state.len() - start_len;
        let outcome = outcome.finish(TurnStatus::Completed, None);
        info!(
            %turn_id,
            ?phase,
            service_calls = outcome.service_calls,
            appended = outcome.appended,
            tool_results = outcome.tool_results.len(),
            "turn finished"
        );
        emitter.emit(TurnEvent::TurnFinished {
            outcome: outcome.clone(),
        });
        Ok(outcome)
    }

    /// One completion round trip: send, then aggregate the fragments.
    async fn complete(
        &self,
        request: &CompletionRequest,
        emitter: &TurnEventEmitter,
        cancel: &CancellationToken,
    ) -> Result<AssistantMessage, ChatError> {
        let call = async {
            let stream = self.service.send(request).await?;
            aggregate_stream(stream, |fragment| {
                if let Some(text) = fragment.content_delta.as_deref() {
                    if !text.is_empty() {
                        emitter.emit(TurnEvent::ContentDelta {
                            text: text.to_string(),
                        });
                    }
                }
            })
            .await
        };
        let call = async {
            match self.request_timeout {
                Some(timeout) => with_timeout(timeout, call).await,
                None => call.await,
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ChatError::Canceled),
            result = call => result,
        }
    }

    fn canceled(&self, emitter: &TurnEventEmitter, outcome: TurnOutcome) -> ChatError {
        info!(turn_id = %outcome.turn_id, appended = outcome.appended, "turn canceled");
        let outcome = outcome.finish(TurnStatus::Canceled, Some(ChatError::Canceled.to_string()));
        emitter.emit(TurnEvent::TurnFinished { outcome });
        ChatError::Canceled
    }
}

impl std::fmt::Debug for TurnOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnOrchestrator")
            .field("service", &self.service.name())
            .field("tools", &self.tools)
            .field("model", &self.options.model)
            .field("max_tool_rounds", &self.max_tool_rounds)
            .field("parallel_tools", &self.parallel_tools)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

fn transport_failure_text(phase: TurnPhase, err: &ChatError) -> String {
    match phase {
        TurnPhase::AwaitFirstResponse => format!("API Error: Could not get response. {err}"),
        _ => format!("API Error: Could not get response after tool call. {err}"),
    }
}

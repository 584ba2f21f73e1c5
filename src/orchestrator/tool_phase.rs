//! Resolving the tool calls of one assistant message.

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::tools::registry::render_result;
use crate::tools::{ToolArguments, ToolContext, ToolError, ToolRegistry};
use crate::types::{ToolCallRequest, ToolMessage};

/// A tool message plus whether it carries an error payload.
#[derive(Debug, Clone)]
pub(crate) struct ToolCallOutcome {
    pub message: ToolMessage,
    pub is_error: bool,
}

/// Resolve every call, returning one outcome per call in the input order.
///
/// Failures never short-circuit the batch.
pub(crate) async fn execute_tool_calls(
    registry: &ToolRegistry,
    calls: &[ToolCallRequest],
    parallel: bool,
    cancel: &CancellationToken,
) -> Vec<ToolCallOutcome> {
    if parallel && calls.len() > 1 {
        debug!(count = calls.len(), "executing tool calls concurrently");
        // join_all yields results in input order, whatever the completion order.
        join_all(calls.iter().map(|call| execute_one(registry, call, cancel))).await
    } else {
        let mut outcomes = Vec::with_capacity(calls.len());
        for call in calls {
            outcomes.push(execute_one(registry, call, cancel).await);
        }
        outcomes
    }
}

async fn execute_one(
    registry: &ToolRegistry,
    call: &ToolCallRequest,
    cancel: &CancellationToken,
) -> ToolCallOutcome {
    let result = match ToolArguments::parse(&call.arguments) {
        Ok(args) => {
            let ctx = ToolContext {
                tool_call_id: call.id.clone(),
                cancel: cancel.child_token(),
            };
            registry.invoke(&call.name, &args, &ctx).await
        }
        Err(err) => {
            warn!(
                tool = %call.name,
                tool_call_id = %call.id,
                error = %err,
                "malformed tool arguments; tool not invoked"
            );
            Err(err)
        }
    };

    let (content, is_error) = match result {
        Ok(value) => (render_result(&value), false),
        Err(err) => (error_content(&err), true),
    };

    ToolCallOutcome {
        message: ToolMessage {
            tool_call_id: call.id.clone(),
            name: call.name.clone(),
            content,
        },
        is_error,
    }
}

fn error_content(err: &ToolError) -> String {
    err.to_payload().to_string()
}

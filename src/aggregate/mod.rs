//! Reassembly of streamed response fragments into one assistant message.
//!
//! Tool call deltas are keyed by their `index`. Deltas for different indices
//! may interleave, but pieces for one index arrive in order, so the arguments
//! of each call are rebuilt by plain concatenation. The scratch slots are
//! unordered while accumulating and are materialized in ascending index order
//! when the message is finalized.

use std::collections::HashMap;

use futures::StreamExt;
use tracing::{debug, warn};

use crate::error::ChatError;
use crate::provider::FragmentStream;
use crate::types::{AssistantMessage, FinishReason, ResponseFragment, ToolCallDelta, ToolCallRequest};

/// Accumulates the fragments of one model turn.
///
/// Feed fragments with [`push`](Self::push) until it returns `true` (a
/// terminal fragment was seen) or the source runs dry, then call
/// [`finish`](Self::finish).
#[derive(Debug, Default)]
pub struct FragmentAggregator {
    /// `None` until the first content delta; distinct from `Some("")`.
    content: Option<String>,
    pending: HashMap<u32, PendingToolCall>,
    finish_reason: Option<FinishReason>,
    fragments_seen: usize,
}

#[derive(Debug, Default)]
struct PendingToolCall {
    id: Option<String>,
    name: String,
    arguments: String,
}

impl PendingToolCall {
    fn apply(&mut self, delta: ToolCallDelta) {
        if let Some(id) = delta.id.filter(|id| !id.is_empty()) {
            // First id wins once one is set.
            if self.id.is_none() {
                self.id = Some(id);
            }
        }
        if let Some(name) = delta.name {
            self.name.push_str(&name);
        }
        if let Some(piece) = delta.arguments {
            self.arguments.push_str(&piece);
        }
    }
}

impl FragmentAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulate one fragment.
    ///
    /// Returns `true` once a terminal fragment has been observed. Fragments
    /// pushed after that are ignored, so repeated finish signals are harmless.
    pub fn push(&mut self, fragment: ResponseFragment) -> bool {
        if self.is_finished() {
            return true;
        }
        self.fragments_seen += 1;

        if let Some(delta) = fragment.content_delta {
            self.content.get_or_insert_with(String::new).push_str(&delta);
        }
        for delta in fragment.tool_calls {
            self.pending.entry(delta.index).or_default().apply(delta);
        }
        if let Some(reason) = fragment.finish_reason {
            self.finish_reason = Some(reason);
        }
        self.is_finished()
    }

    pub fn is_finished(&self) -> bool {
        self.finish_reason.is_some()
    }

    /// The finish reason, if a terminal fragment was seen.
    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.finish_reason
    }

    /// Build the final message.
    ///
    /// Tool calls are ordered by index. Slots that never received both an id
    /// and a name are dropped with a warning rather than failing the turn.
    pub fn finish(self) -> AssistantMessage {
        let mut slots: Vec<(u32, PendingToolCall)> = self.pending.into_iter().collect();
        slots.sort_unstable_by_key(|(index, _)| *index);

        let mut tool_calls: Vec<ToolCallRequest> = Vec::with_capacity(slots.len());
        for (index, slot) in slots {
            match slot.id {
                // Ids must be unique within one message; the lowest index keeps it.
                Some(id) if tool_calls.iter().any(|call| call.id == id) => {
                    warn!(
                        index,
                        id = %id,
                        name = %slot.name,
                        "discarding tool call with duplicate id"
                    );
                }
                Some(id) if !slot.name.is_empty() => tool_calls.push(ToolCallRequest {
                    id,
                    name: slot.name,
                    arguments: slot.arguments,
                }),
                id => {
                    warn!(
                        index,
                        id = ?id,
                        name = %slot.name,
                        arguments = %slot.arguments,
                        "discarding incomplete tool call"
                    );
                }
            }
        }

        let content = match self.content {
            Some(text) => Some(text),
            None if tool_calls.is_empty() => Some(String::new()),
            None => None,
        };

        debug!(
            fragments = self.fragments_seen,
            finish_reason = ?self.finish_reason,
            content_len = content.as_ref().map_or(0, String::len),
            tool_calls = tool_calls.len(),
            "aggregated assistant message"
        );

        AssistantMessage {
            content,
            tool_calls,
        }
    }
}

/// Aggregate an already-materialized fragment sequence.
///
/// Consumption stops at the first terminal fragment.
pub fn aggregate<I>(fragments: I) -> AssistantMessage
where
    I: IntoIterator<Item = ResponseFragment>,
{
    let mut aggregator = FragmentAggregator::new();
    for fragment in fragments {
        if aggregator.push(fragment) {
            break;
        }
    }
    aggregator.finish()
}

/// Pull fragments from a service stream until it finishes.
///
/// `on_fragment` sees every consumed fragment before it is accumulated (the
/// orchestrator uses it to echo content deltas). The stream is not polled
/// again after a terminal fragment. An error item aborts aggregation.
pub async fn aggregate_stream<F>(
    mut stream: FragmentStream,
    mut on_fragment: F,
) -> Result<AssistantMessage, ChatError>
where
    F: FnMut(&ResponseFragment),
{
    let mut aggregator = FragmentAggregator::new();
    while let Some(fragment) = stream.next().await {
        let fragment = fragment?;
        on_fragment(&fragment);
        if aggregator.push(fragment) {
            break;
        }
    }
    Ok(aggregator.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(index: u32, piece: &str) -> ResponseFragment {
        ResponseFragment::tool_call(ToolCallDelta::new(index).arguments(piece))
    }

    #[test]
    fn empty_sequence_yields_empty_content_sentinel() {
        let msg = aggregate(Vec::new());
        assert_eq!(msg.content.as_deref(), Some(""));
        assert!(msg.tool_calls.is_empty());
    }

    #[test]
    fn tool_calls_without_text_leave_content_absent() {
        let msg = aggregate(vec![
            ResponseFragment::tool_call(ToolCallDelta::new(0).id("c1").name("ping").arguments("{}")),
            ResponseFragment::finish(FinishReason::ToolCalls),
        ]);
        assert_eq!(msg.content, None);
        assert_eq!(msg.tool_calls.len(), 1);
    }

    #[test]
    fn empty_content_delta_is_a_real_utterance() {
        let msg = aggregate(vec![
            ResponseFragment::content(""),
            ResponseFragment::tool_call(ToolCallDelta::new(0).id("c1").name("ping")),
        ]);
        assert_eq!(msg.content.as_deref(), Some(""));
        assert_eq!(msg.tool_calls.len(), 1);
    }

    #[test]
    fn later_id_fills_unset_slot_but_never_replaces() {
        let mut agg = FragmentAggregator::new();
        agg.push(args(0, "{"));
        agg.push(ResponseFragment::tool_call(ToolCallDelta::new(0).id("")));
        agg.push(ResponseFragment::tool_call(ToolCallDelta::new(0).id("late").name("f")));
        agg.push(ResponseFragment::tool_call(ToolCallDelta::new(0).id("other").arguments("}")));
        let msg = agg.finish();
        assert_eq!(msg.tool_calls[0].id, "late");
        assert_eq!(msg.tool_calls[0].arguments, "{}");
    }

    #[test]
    fn name_pieces_are_concatenated() {
        let msg = aggregate(vec![
            ResponseFragment::tool_call(ToolCallDelta::new(0).id("c1").name("get_")),
            ResponseFragment::tool_call(ToolCallDelta::new(0).name("weather")),
        ]);
        assert_eq!(msg.tool_calls[0].name, "get_weather");
    }

    #[test]
    fn push_after_finish_is_ignored() {
        let mut agg = FragmentAggregator::new();
        assert!(!agg.push(ResponseFragment::content("a")));
        assert!(agg.push(ResponseFragment::content("b").with_finish(FinishReason::Stop)));
        assert!(agg.push(ResponseFragment::content("c").with_finish(FinishReason::Length)));
        assert_eq!(agg.finish_reason(), Some(FinishReason::Stop));
        assert_eq!(agg.finish().content.as_deref(), Some("ab"));
    }

    #[test]
    fn slots_are_ordered_by_index_not_arrival() {
        let msg = aggregate(vec![
            ResponseFragment::tool_call(ToolCallDelta::new(7).id("c7").name("b")),
            ResponseFragment::tool_call(ToolCallDelta::new(2).id("c2").name("a")),
            ResponseFragment::finish(FinishReason::ToolCalls),
        ]);
        let ids: Vec<_> = msg.tool_calls.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["c2", "c7"]);
    }
}

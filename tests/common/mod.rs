//! Shared test helpers and a scripted completion service.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream;

use toolchat::error::ChatError;
use toolchat::provider::{CompletionRequest, CompletionService, FragmentStream};
use toolchat::types::*;

/// One canned reply.
pub enum Script {
    /// Stream these fragments, in order.
    Fragments(Vec<ResponseFragment>),
    /// Fail before any fragment is produced.
    Fail(ChatError),
    /// Stream these fragments, then yield an error.
    FailMidStream(Vec<ResponseFragment>, ChatError),
    /// Never produce anything.
    Hang,
}

/// A completion service that replays queued scripts and records requests.
pub struct ScriptedService {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<CompletionRequest>>,
    calls: AtomicUsize,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn queue(&self, script: Script) {
        self.scripts.lock().unwrap().push_back(script);
    }

    /// Queue a streamed text reply, delivered in small chunks.
    pub fn queue_text(&self, text: &str) {
        self.queue(Script::Fragments(text_fragments(text)));
    }

    /// Queue a reply requesting the given `(id, name, arguments)` calls.
    pub fn queue_tool_calls(&self, calls: &[(&str, &str, &str)]) {
        self.queue(Script::Fragments(tool_call_fragments(calls)));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for ScriptedService {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn send(&self, request: &CompletionRequest) -> Result<FragmentStream, ChatError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Script::Fragments(text_fragments("Mock response")));

        match script {
            Script::Fragments(fragments) => {
                let items: Vec<Result<ResponseFragment, ChatError>> =
                    fragments.into_iter().map(Ok).collect();
                Ok(Box::pin(stream::iter(items)))
            }
            Script::Fail(err) => Err(err),
            Script::FailMidStream(fragments, err) => {
                let items: Vec<Result<ResponseFragment, ChatError>> = fragments
                    .into_iter()
                    .map(Ok)
                    .chain(std::iter::once(Err(err)))
                    .collect();
                Ok(Box::pin(stream::iter(items)))
            }
            Script::Hang => Ok(Box::pin(stream::pending::<Result<ResponseFragment, ChatError>>())),
        }
    }
}

/// Text split into 5-char content deltas followed by a stop fragment.
pub fn text_fragments(text: &str) -> Vec<ResponseFragment> {
    let chars: Vec<char> = text.chars().collect();
    let mut fragments: Vec<ResponseFragment> = chars
        .chunks(5)
        .map(|chunk| ResponseFragment::content(chunk.iter().collect::<String>()))
        .collect();
    fragments.push(ResponseFragment::finish(FinishReason::Stop));
    fragments
}

/// Tool calls streamed the way OpenAI-compatible servers do: the first delta
/// for an index carries id and name, arguments follow in two pieces.
pub fn tool_call_fragments(calls: &[(&str, &str, &str)]) -> Vec<ResponseFragment> {
    let mut fragments = Vec::new();
    for (index, (id, name, args)) in calls.iter().enumerate() {
        let index = index as u32;
        let split = args.len() / 2;
        let split = (0..=split).rev().find(|i| args.is_char_boundary(*i)).unwrap_or(0);
        fragments.push(ResponseFragment::tool_call(
            ToolCallDelta::new(index).id(*id).name(*name),
        ));
        fragments.push(ResponseFragment::tool_call(
            ToolCallDelta::new(index).arguments(&args[..split]),
        ));
        fragments.push(ResponseFragment::tool_call(
            ToolCallDelta::new(index).arguments(&args[split..]),
        ));
    }
    fragments.push(ResponseFragment::finish(FinishReason::ToolCalls));
    fragments
}

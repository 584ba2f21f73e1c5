//! Completion service trait and the OpenAI-compatible HTTP implementation.

pub mod http;
pub mod openai;

pub use openai::OpenAiCompatibleService;

use async_trait::async_trait;
use futures::stream::{self, BoxStream};

use crate::error::ChatError;
use crate::types::{CompletionOptions, Message, ResponseFragment};

/// Lazy, finite, non-restartable sequence of fragments for one model turn.
pub type FragmentStream = BoxStream<'static, Result<ResponseFragment, ChatError>>;

/// A request sent to a completion service.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Full conversation history, oldest first.
    pub messages: Vec<Message>,
    pub options: CompletionOptions,
}

/// The remote model, seen as something that turns a history into fragments.
///
/// Buffered (non-streaming) implementations return a stream holding a single
/// terminal fragment; see [`single_fragment`].
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Service name used in logs (e.g., "openai-compatible").
    fn name(&self) -> &str;

    /// Send the history and start receiving the assistant's reply.
    ///
    /// Errors returned here, or yielded by the stream, are transport failures.
    async fn send(&self, request: &CompletionRequest) -> Result<FragmentStream, ChatError>;
}

/// Wrap a complete response as a one-item fragment stream.
pub fn single_fragment(fragment: ResponseFragment) -> FragmentStream {
    Box::pin(stream::iter(vec![Ok(fragment)]))
}

//! OpenAI-compatible Chat Completions service (vLLM, llama.cpp, OpenAI, ...).

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::{ChatConfig, DEFAULT_BASE_URL};
use crate::error::ChatError;
use crate::types::*;

use super::http::{bearer_headers, parse_sse_line, shared_client, status_to_error, SseLine};
use super::{single_fragment, CompletionRequest, CompletionService, FragmentStream};

/// Talks to `{base_url}/chat/completions`.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleService {
    api_key: String,
    base_url: String,
}

impl OpenAiCompatibleService {
    pub fn new(base_url: Option<String>, api_key: impl Into<String>) -> Self {
        let base_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &ChatConfig) -> Self {
        Self::new(Some(config.base_url.clone()), config.api_key.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl CompletionService for OpenAiCompatibleService {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    async fn send(&self, request: &CompletionRequest) -> Result<FragmentStream, ChatError> {
        let stream = request.options.stream;
        let body = build_request_body(request);
        let url = format!("{}/chat/completions", self.base_url);

        debug!(
            model = %request.options.model,
            messages = request.messages.len(),
            tools = request.options.tools.len(),
            stream,
            "chat completion request"
        );

        let resp = shared_client()
            .post(&url)
            .headers(bearer_headers(&self.api_key, stream))
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status.as_u16(), &body_text));
        }

        if stream {
            return Ok(sse_fragments(resp.bytes_stream()));
        }

        let raw = resp.text().await?;
        let data: OpenAiChatResponse = serde_json::from_str(&raw)?;
        Ok(single_fragment(response_to_fragment(data)?))
    }
}

/// Serialize a request into the Chat Completions JSON body.
pub fn build_request_body(request: &CompletionRequest) -> Value {
    let options = &request.options;
    let mut body = Map::new();
    body.insert("model".into(), options.model.clone().into());
    body.insert(
        "messages".into(),
        request.messages.iter().map(message_to_openai).collect::<Vec<_>>().into(),
    );
    body.insert("stream".into(), options.stream.into());

    if let Some(temp) = options.temperature {
        body.insert("temperature".into(), temp.into());
    }
    if let Some(max) = options.max_tokens {
        body.insert("max_tokens".into(), max.into());
    }

    if !options.tools.is_empty() {
        let tool_defs: Vec<Value> = options
            .tools
            .iter()
            .map(|t| {
                serde_json::json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    }
                })
            })
            .collect();
        body.insert("tools".into(), tool_defs.into());
        body.insert("tool_choice".into(), options.tool_choice.to_wire());
    }

    if let Some(extra) = &options.extra_body {
        for (key, value) in extra {
            body.insert(key.clone(), value.clone());
        }
    }

    Value::Object(body)
}

fn message_to_openai(msg: &Message) -> Value {
    match msg {
        Message::System { content } => serde_json::json!({ "role": "system", "content": content }),
        Message::User { content } => serde_json::json!({ "role": "user", "content": content }),
        Message::Assistant(assistant) => {
            let mut obj = Map::new();
            obj.insert("role".into(), "assistant".into());
            obj.insert(
                "content".into(),
                assistant.content.clone().map_or(Value::Null, Value::String),
            );
            if assistant.has_tool_calls() {
                let calls: Vec<Value> = assistant
                    .tool_calls
                    .iter()
                    .map(|tc| {
                        serde_json::json!({
                            "id": tc.id,
                            "type": "function",
                            "function": {
                                "name": tc.name,
                                "arguments": tc.arguments,
                            }
                        })
                    })
                    .collect();
                obj.insert("tool_calls".into(), calls.into());
            }
            Value::Object(obj)
        }
        Message::Tool(tool) => serde_json::json!({
            "role": "tool",
            "tool_call_id": tool.tool_call_id,
            "name": tool.name,
            "content": tool.content,
        }),
    }
}

/// Decode an SSE body into fragments.
///
/// Bytes are buffered until a full line is available so multi-byte
/// characters split across network chunks survive intact.
fn sse_fragments<S, B>(byte_stream: S) -> FragmentStream
where
    S: Stream<Item = Result<B, reqwest::Error>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut buffer: Vec<u8> = Vec::new();
        let mut done = false;
        futures::pin_mut!(byte_stream);

        while !done {
            let Some(chunk_result) = byte_stream.next().await else { break; };
            let chunk = match chunk_result {
                Ok(c) => c,
                Err(e) => {
                    yield Err(ChatError::Network(e));
                    return;
                }
            };
            buffer.extend_from_slice(chunk.as_ref());

            while let Some(line_end) = buffer.iter().position(|b| *b == b'\n') {
                let line_bytes: Vec<u8> = buffer.drain(..=line_end).collect();
                let line = String::from_utf8_lossy(&line_bytes);
                match parse_sse_line(line.trim()) {
                    SseLine::Skip => {}
                    SseLine::Done => {
                        done = true;
                        break;
                    }
                    SseLine::Data(data) => match parse_stream_chunk(data) {
                        Ok(Some(fragment)) => { yield Ok(fragment); }
                        Ok(None) => {}
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    },
                }
            }
        }

        // A final event without a trailing newline.
        if !done && !buffer.is_empty() {
            let line = String::from_utf8_lossy(&buffer).into_owned();
            if let SseLine::Data(data) = parse_sse_line(line.trim()) {
                match parse_stream_chunk(data) {
                    Ok(Some(fragment)) => { yield Ok(fragment); }
                    Ok(None) => {}
                    Err(e) => { yield Err(e); }
                }
            }
        }
    };

    Box::pin(stream)
}

fn parse_stream_chunk(data: &str) -> Result<Option<ResponseFragment>, ChatError> {
    // A chunk that does not decode would leave a gap in the concatenated
    // content or arguments, so it ends the stream.
    let chunk: OpenAiStreamChunk = serde_json::from_str(data)?;
    if let Some(error) = chunk.error {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(ChatError::Stream(message));
    }
    let Some(choice) = chunk.choices.into_iter().next() else {
        return Ok(None);
    };

    let tool_calls = choice
        .delta
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(pos, tc)| {
            let function = tc.function.unwrap_or_default();
            ToolCallDelta {
                index: tc.index.unwrap_or(pos as u32),
                id: tc.id,
                name: function.name,
                arguments: function.arguments,
            }
        })
        .collect();

    Ok(Some(ResponseFragment {
        content_delta: choice.delta.content,
        tool_calls,
        finish_reason: choice.finish_reason.as_deref().map(parse_finish_reason),
    }))
}

fn response_to_fragment(data: OpenAiChatResponse) -> Result<ResponseFragment, ChatError> {
    let choice = data
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ChatError::api(200, "No choices in chat completion response"))?;

    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(pos, tc)| ToolCallDelta {
            index: pos as u32,
            id: Some(tc.id),
            name: Some(tc.function.name),
            arguments: Some(tc.function.arguments),
        })
        .collect();

    Ok(ResponseFragment {
        content_delta: choice.message.content,
        tool_calls,
        finish_reason: Some(
            choice
                .finish_reason
                .as_deref()
                .map_or(FinishReason::Stop, parse_finish_reason),
        ),
    })
}

/// Any non-null finish reason ends the turn; unknown values count as `Stop`.
fn parse_finish_reason(s: &str) -> FinishReason {
    match s {
        "length" => FinishReason::Length,
        "tool_calls" | "function_call" => FinishReason::ToolCalls,
        "content_filter" => FinishReason::ContentFilter,
        "error" => FinishReason::Error,
        _ => FinishReason::Stop,
    }
}

// OpenAI API response types (internal)

#[derive(Deserialize)]
struct OpenAiChatResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAiToolCall>>,
}

#[derive(Deserialize)]
struct OpenAiToolCall {
    id: String,
    function: OpenAiFunction,
}

#[derive(Deserialize)]
struct OpenAiFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Deserialize)]
struct OpenAiStreamChunk {
    #[serde(default)]
    choices: Vec<OpenAiStreamChoice>,
    error: Option<Value>,
}

#[derive(Deserialize)]
struct OpenAiStreamChoice {
    #[serde(default)]
    delta: OpenAiStreamDelta,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Default)]
struct OpenAiStreamDelta {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAiStreamToolCall>>,
}

#[derive(Deserialize)]
struct OpenAiStreamToolCall {
    index: Option<u32>,
    id: Option<String>,
    function: Option<OpenAiStreamFunction>,
}

#[derive(Deserialize, Default)]
struct OpenAiStreamFunction {
    name: Option<String>,
    arguments: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_chunk_maps_tool_call_deltas() {
        let data = r#"{"choices":[{"delta":{"tool_calls":[{"index":1,"id":"c1","function":{"name":"f","arguments":"{\"a\""}}]},"finish_reason":null}]}"#;
        let fragment = parse_stream_chunk(data).unwrap().unwrap();
        assert_eq!(
            fragment.tool_calls,
            vec![ToolCallDelta::new(1).id("c1").name("f").arguments("{\"a\"")]
        );
        assert!(!fragment.is_terminal());
    }

    #[test]
    fn undecodable_chunk_is_an_error() {
        let err = parse_stream_chunk(r#"{"choices":[{"delta":{"content":"Wa"#).unwrap_err();
        assert!(matches!(err, ChatError::Serialization(_)));
        assert!(err.is_transport());
    }

    #[test]
    fn usage_only_chunk_is_skipped() {
        let data = r#"{"choices":[],"usage":{"prompt_tokens":1}}"#;
        assert!(parse_stream_chunk(data).unwrap().is_none());
    }

    #[test]
    fn error_chunk_becomes_stream_error() {
        let data = r#"{"error":{"message":"model overloaded"}}"#;
        let err = parse_stream_chunk(data).unwrap_err();
        assert_eq!(err.to_string(), "Stream error: model overloaded");
    }

    #[test]
    fn assistant_without_content_serializes_null() {
        let msg = Message::Assistant(AssistantMessage {
            content: None,
            tool_calls: vec![ToolCallRequest::new("c1", "f", "{}")],
        });
        let wire = message_to_openai(&msg);
        assert!(wire["content"].is_null());
        assert_eq!(wire["tool_calls"][0]["function"]["arguments"], "{}");
    }
}

//! Plain-text conversation transcript.

use crate::types::Message;

/// Render every message as `role: body`, each followed by a blank line.
pub fn render_transcript(messages: &[Message]) -> String {
    let mut out = String::new();
    for message in messages {
        out.push_str(&message.role().to_string());
        out.push_str(": ");
        out.push_str(&render_body(message));
        out.push_str("\n\n");
    }
    out
}

fn render_body(message: &Message) -> String {
    match message {
        Message::System { content } | Message::User { content } => content.clone(),
        Message::Assistant(assistant) => {
            let mut parts = Vec::new();
            if let Some(content) = &assistant.content {
                parts.push(content.clone());
            }
            if assistant.has_tool_calls() {
                if assistant.content.as_deref().is_some_and(|c| !c.is_empty()) {
                    parts.push("\n---\n".to_string());
                }
                let calls: Vec<String> = assistant
                    .tool_calls
                    .iter()
                    .enumerate()
                    .map(|(i, call)| {
                        format!(
                            "Tool Call {}: {}(args={}) ID: {}",
                            i + 1,
                            call.name,
                            call.arguments,
                            call.id
                        )
                    })
                    .collect();
                parts.push(calls.join("\n  "));
            }
            if parts.is_empty() {
                "[No output from assistant]".to_string()
            } else {
                parts.concat()
            }
        }
        Message::Tool(tool) => format!(
            "(name: {}, tool_call_id: {}): {}",
            tool.name, tool.tool_call_id, tool.content
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AssistantMessage, ToolCallRequest};
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_tool_exchange() {
        let messages = vec![
            Message::user("Weather in Warsaw?"),
            Message::Assistant(AssistantMessage {
                content: None,
                tool_calls: vec![
                    ToolCallRequest::new("c1", "get_current_weather", r#"{"location":"Warsaw"}"#),
                    ToolCallRequest::new("c2", "get_current_weather", r#"{"location":"Oslo"}"#),
                ],
            }),
            Message::tool("c1", "get_current_weather", "sunny"),
        ];
        let expected = "user: Weather in Warsaw?\n\n\
assistant: Tool Call 1: get_current_weather(args={\"location\":\"Warsaw\"}) ID: c1\n  \
Tool Call 2: get_current_weather(args={\"location\":\"Oslo\"}) ID: c2\n\n\
tool: (name: get_current_weather, tool_call_id: c1): sunny\n\n";
        assert_eq!(render_transcript(&messages), expected);
    }

    #[test]
    fn empty_assistant_is_marked() {
        let messages = vec![Message::Assistant(AssistantMessage::default())];
        assert_eq!(render_transcript(&messages), "assistant: [No output from assistant]\n\n");
    }

    #[test]
    fn text_and_calls_are_separated() {
        let message = Message::Assistant(AssistantMessage {
            content: Some("Checking.".into()),
            tool_calls: vec![ToolCallRequest::new("c1", "f", "{}")],
        });
        assert_eq!(
            render_transcript(&[message]),
            "assistant: Checking.\n---\nTool Call 1: f(args={}) ID: c1\n\n"
        );
    }
}

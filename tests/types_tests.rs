//! Tests for message, fragment and option types.

use pretty_assertions::assert_eq;
use serde_json::json;

use toolchat::types::*;

#[test]
fn message_constructors_set_roles() {
    assert_eq!(Message::system("s").role(), Role::System);
    assert_eq!(Message::user("u").role(), Role::User);
    assert_eq!(Message::assistant("a").role(), Role::Assistant);
    assert_eq!(Message::tool("c1", "f", "r").role(), Role::Tool);
}

#[test]
fn tool_message_serializes_with_correlation_id() {
    let value = serde_json::to_value(Message::tool("c1", "get_weather", "sunny")).unwrap();
    assert_eq!(
        value,
        json!({"role": "tool", "tool_call_id": "c1", "name": "get_weather", "content": "sunny"})
    );
}

#[test]
fn message_serde_roundtrip_keeps_absent_content() {
    let original = Message::Assistant(AssistantMessage {
        content: None,
        tool_calls: vec![ToolCallRequest::new("c1", "f", "{}")],
    });
    let json = serde_json::to_string(&original).unwrap();
    let back: Message = serde_json::from_str(&json).unwrap();
    assert_eq!(back, original);
    assert_eq!(back.content(), None);
}

#[test]
fn assistant_text_or_empty() {
    let msg = AssistantMessage::text("hi");
    assert_eq!(msg.text_or_empty(), "hi");
    assert!(!msg.has_tool_calls());
    assert_eq!(AssistantMessage::default().text_or_empty(), "");
    assert!(AssistantMessage::default().is_empty());
}

#[test]
fn role_parses_from_lowercase() {
    assert_eq!("tool".parse::<Role>().unwrap(), Role::Tool);
    assert_eq!(Role::Assistant.to_string(), "assistant");
}

#[test]
fn finish_reason_display() {
    assert_eq!(FinishReason::ToolCalls.to_string(), "tool_calls");
    assert_eq!(FinishReason::Stop.to_string(), "stop");
}

#[test]
fn terminal_fragment_detection() {
    assert!(!ResponseFragment::content("x").is_terminal());
    assert!(ResponseFragment::content("x")
        .with_finish(FinishReason::Stop)
        .is_terminal());
}

#[test]
fn completion_options_builder_defaults() {
    let options = CompletionOptions::builder().model("m").build();
    assert_eq!(options.model, "m");
    assert!(options.stream);
    assert!(options.tools.is_empty());
    assert_eq!(options.tool_choice, ToolChoice::Auto);
}

#[test]
fn tool_choice_wire_forms() {
    assert_eq!(ToolChoice::Auto.to_wire(), json!("auto"));
    assert_eq!(ToolChoice::None.to_wire(), json!("none"));
    assert_eq!(ToolChoice::Required.to_wire(), json!("required"));
    assert_eq!(
        ToolChoice::Function("get_weather".into()).to_wire(),
        json!({"type": "function", "function": {"name": "get_weather"}})
    );
}

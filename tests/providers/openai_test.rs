//! OpenAI-compatible provider wire format and stream parsing tests.

use rolebot::providers::openai::{build_request, parse_stream_line};
use rolebot::providers::stream::LineOutcome;
use rolebot::providers::{ChatRequest, Message, ProviderError};

fn simple_request() -> ChatRequest {
    ChatRequest {
        messages: vec![
            Message::system("You are helpful."),
            Message::user("Hello"),
            Message::assistant("Hi!"),
        ],
        temperature: Some(0.7),
        max_tokens: Some(256),
    }
}

#[test]
fn build_request_streams_and_maps_roles() {
    let req = build_request("qwen-turbo", &simple_request());
    assert_eq!(req.model, "qwen-turbo");
    assert!(req.stream);
    assert_eq!(req.max_tokens, 256);
    assert_eq!(req.temperature, Some(0.7));
    let roles: Vec<&str> = req.messages.iter().map(|m| m.role.as_str()).collect();
    assert_eq!(roles, vec!["system", "user", "assistant"]);
    assert_eq!(req.messages[1].content, "Hello");
}

#[test]
fn build_request_serializes_expected_json() {
    let mut request = simple_request();
    request.temperature = None;
    request.max_tokens = None;
    let value = serde_json::to_value(build_request("m", &request)).expect("serialize");
    assert_eq!(value["stream"], serde_json::json!(true));
    assert_eq!(value["max_tokens"], serde_json::json!(2048));
    assert!(value.get("temperature").is_none());
}

#[test]
fn data_line_yields_delta_content() {
    let line = r#"data: {"choices":[{"delta":{"content":"你好"},"finish_reason":null}]}"#;
    assert_eq!(
        parse_stream_line(line).expect("parse"),
        LineOutcome::Text("你好".to_owned())
    );
}

#[test]
fn done_marker_ends_stream() {
    assert_eq!(
        parse_stream_line("data: [DONE]").expect("parse"),
        LineOutcome::Done
    );
}

#[test]
fn keep_alives_and_empty_deltas_are_skipped() {
    for line in [
        "",
        ": keep-alive",
        "event: message",
        "data:",
        r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#,
        r#"data: {"choices":[{"delta":{},"finish_reason":"stop"}]}"#,
        r#"data: {"choices":[]}"#,
    ] {
        assert_eq!(
            parse_stream_line(line).expect("parse"),
            LineOutcome::Skip,
            "{line}"
        );
    }
}

#[test]
fn in_stream_error_object_is_surfaced() {
    let err = parse_stream_line(r#"data: {"error":{"message":"quota exceeded"}}"#)
        .expect_err("error payload");
    assert!(matches!(err, ProviderError::Upstream(ref m) if m == "quota exceeded"));
}

#[test]
fn malformed_payload_is_a_parse_error() {
    let err = parse_stream_line("data: {not json").expect_err("malformed");
    assert!(matches!(err, ProviderError::Parse(_)));
}

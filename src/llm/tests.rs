use super::*;

#[test]
fn test_new_openai_client() {
    let client =
        OpenAiClient::new("test_key", "https://api.openai.com/v1/chat/completions", "gpt-3.5-turbo");
    assert!(client.is_ok());
}

#[test]
fn test_new_openai_client_invalid_key() {
    let client = OpenAiClient::new("bad\nkey", "https://example.com", "model");
    assert!(matches!(client, Err(LlmError::InvalidHeader(_))));
}

#[test]
fn test_transient_statuses() {
    assert!(is_transient_status(StatusCode::TOO_MANY_REQUESTS));
    assert!(is_transient_status(StatusCode::BAD_GATEWAY));
    assert!(!is_transient_status(StatusCode::UNAUTHORIZED));
    assert!(!is_transient_status(StatusCode::BAD_REQUEST));
}

#[test]
fn test_request_serialization() {
    let messages = vec![ChatMessage::user("Hello")];
    let request = CompletionRequest { model: "gpt", messages: &messages, max_tokens: 500 };

    let json = serde_json::to_value(&request).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "model": "gpt",
            "messages": [{"role": "user", "content": "Hello"}],
            "max_tokens": 500
        })
    );
}

#[test]
fn test_response_first_choice() {
    let body = r#"{
        "id": "chatcmpl-1",
        "choices": [
            {"index": 0, "message": {"role": "assistant", "content": "Hi there"}, "finish_reason": "stop"},
            {"index": 1, "message": {"role": "assistant", "content": "Other"}, "finish_reason": "stop"}
        ]
    }"#;
    let response: CompletionResponse = serde_json::from_str(body).unwrap();
    assert_eq!(response.into_text().as_deref(), Some("Hi there"));

    let empty: CompletionResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
    assert_eq!(empty.into_text(), None);
}

#[test]
fn test_trim_history_keeps_latest() {
    let mut history: Vec<ChatMessage> =
        (0..14).map(|i| ChatMessage::user(format!("message {i}"))).collect();

    trim_history(&mut history);

    assert_eq!(history.len(), CHAT_HISTORY_LIMIT);
    assert_eq!(history[0].content, "message 4");
    assert_eq!(history[9].content, "message 13");
}

#[test]
fn test_trim_history_short_is_untouched() {
    let mut history = vec![ChatMessage::user("a"), ChatMessage::assistant("b")];
    trim_history(&mut history);
    assert_eq!(history.len(), 2);
}

//! Request and response shapes for the hosted language model.

use gogodo::assistant::{Assistant, ExtractDateTimeInput};
use gogodo::config::LlmConfig;
use gogodo::llm::{GeminiClient, LlmClient, LlmError, LlmRequest};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> LlmConfig {
    LlmConfig {
        api_key: "gemini-key".to_string(),
        endpoint: format!("{}/v1beta", server.uri()),
        ..LlmConfig::default()
    }
}

fn reply(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }]
    })
}

fn request(json: bool) -> LlmRequest {
    LlmRequest {
        system: "You are terse.".to_string(),
        user: "hello".to_string(),
        model: "gemini-2.0-flash".to_string(),
        temperature: 0.2,
        json,
    }
}

#[tokio::test]
async fn generate_content_carries_prompt_system_and_json_mode() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
        .and(query_param("key", "gemini-key"))
        .and(body_partial_json(json!({
            "contents": [{"role": "user", "parts": [{"text": "hello"}]}],
            "systemInstruction": {"parts": [{"text": "You are terse."}]},
            "generationConfig": {"responseMimeType": "application/json"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply("{\"answer\": \"hi\"}")))
        .expect(1)
        .mount(&server)
        .await;

    let client = GeminiClient::new(&config(&server)).unwrap();
    let text = client.complete(request(true)).await.unwrap();
    assert_eq!(text, "{\"answer\": \"hi\"}");
}

#[tokio::test]
async fn api_errors_keep_the_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"code": 429, "message": "Resource has been exhausted", "status": "RESOURCE_EXHAUSTED"}
        })))
        .mount(&server)
        .await;

    let client = GeminiClient::new(&config(&server)).unwrap();
    match client.complete(request(false)).await {
        Err(LlmError::Response(message)) => assert!(message.contains("Resource has been exhausted")),
        other => panic!("expected a response error, got {:?}", other),
    }
}

#[tokio::test]
async fn empty_candidates_are_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
        .mount(&server)
        .await;

    let client = GeminiClient::new(&config(&server)).unwrap();
    assert!(matches!(client.complete(request(false)).await, Err(LlmError::Response(_))));
}

#[tokio::test]
async fn missing_key_fails_without_a_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply("unused")))
        .expect(0)
        .mount(&server)
        .await;

    let config = LlmConfig {
        api_key: String::new(),
        ..config(&server)
    };
    let client = GeminiClient::new(&config).unwrap();
    assert!(matches!(client.complete(request(false)).await, Err(LlmError::NotConfigured)));
}

#[tokio::test]
async fn extraction_reads_fenced_json_replies() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply(
            "```json\n{\"dueDate\": \"2024-06-02T17:00:00\", \"dueTime\": null}\n```",
        )))
        .mount(&server)
        .await;

    let config = config(&server);
    let client = Arc::new(GeminiClient::new(&config).unwrap());
    let assistant = Assistant::new(client, &config);
    let extracted = assistant
        .extract_date_time(&ExtractDateTimeInput {
            task_description: "remind me tomorrow at 5pm".to_string(),
            current_date: "2024-06-01".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(extracted.due_date.as_deref(), Some("2024-06-02"));
    assert_eq!(extracted.due_time.as_deref(), Some("17:00"));
    assert!(!extracted.completed);
}

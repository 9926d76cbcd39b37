//! OpenAI-compatible generator against a mockito server.

use mockito::{Matcher, Server};
use serde_json::json;
use std::time::Duration;
use where_next::cache::CacheKeyBuilder;
use where_next::generator::{GenerationError, OpenAiGenerator, OpenAiSettings, SuggestionGenerator};
use where_next::transport::TransportError;

fn completion(content: &str) -> String {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [
            {"index": 0, "message": {"role": "assistant", "content": content}, "finish_reason": "stop"}
        ]
    })
    .to_string()
}

fn generator(base_url: &str) -> OpenAiGenerator {
    OpenAiGenerator::new(
        &OpenAiSettings::new("sk-test")
            .with_base_url(base_url)
            .with_timeout(Duration::from_secs(5)),
    )
    .unwrap()
}

fn params() -> where_next::cache::NormalizedSuggestionParams {
    CacheKeyBuilder::new().normalize(&json!({"from": "Toronto", "budget": 3000, "vibes": ["food"]}))
}

#[tokio::test]
async fn parses_plain_array_reply() {
    let mut server = Server::new_async().await;
    let content = json!([
        {"destination": "Montreal, Quebec", "country": "Canada", "estimatedTotal": 1800, "vibes": ["food"]},
        {"destination": "New Orleans, Louisiana", "estimatedTotal": 2600}
    ])
    .to_string();
    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer sk-test")
        .match_header("x-request-id", "req-1")
        .match_body(Matcher::PartialJson(json!({"model": "gpt-4o-mini"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion(&content))
        .create_async()
        .await;

    let records = generator(&server.url())
        .generate(&params(), "req-1")
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].destination, "Montreal, Quebec");
    assert_eq!(records[1].estimated_total, 2600);
}

#[tokio::test]
async fn parses_fenced_reply() {
    let mut server = Server::new_async().await;
    let content = "Here you go:\n```json\n[{\"destination\": \"Halifax\", \"estimatedTotal\": 1400}]\n```";
    server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion(content))
        .create_async()
        .await;

    let records = generator(&server.url())
        .generate(&params(), "req-2")
        .await
        .unwrap();
    assert_eq!(records[0].destination, "Halifax");
}

#[tokio::test]
async fn server_error_is_transport_failure() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(500)
        .with_body("upstream exploded")
        .create_async()
        .await;

    let err = generator(&server.url())
        .generate(&params(), "req-3")
        .await
        .unwrap_err();
    match err {
        GenerationError::Transport(TransportError::Status { status, message }) => {
            assert_eq!(status, 500);
            assert!(message.contains("upstream exploded"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn non_array_reply_is_malformed() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion("{\"destination\": \"Halifax\"}"))
        .create_async()
        .await;

    let err = generator(&server.url())
        .generate(&params(), "req-4")
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::Malformed(_)));
}

#[tokio::test]
async fn empty_array_reply_is_rejected() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion("[]"))
        .create_async()
        .await;

    let err = generator(&server.url())
        .generate(&params(), "req-5")
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::Empty));
}

#[tokio::test]
async fn missing_content_is_malformed() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"choices": []}).to_string())
        .create_async()
        .await;

    let err = generator(&server.url())
        .generate(&params(), "req-6")
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::Malformed(_)));
}

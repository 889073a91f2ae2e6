//! HTTP contract of the OpenAI providers against a mocked server.

use pajak_rag::openai::{OpenAIChatModel, OpenAIEmbeddingProvider};
use pajak_rag::{ChatModel, EmbeddingProvider, RagError};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn embed_batch_restores_input_order() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "text-embedding-ada-002",
            "input": ["pajak", "cukai"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "index": 1, "embedding": [0.0, 1.0] },
                { "index": 0, "embedding": [1.0, 0.0] }
            ]
        })))
        .mount(&server)
        .await;

    let provider = OpenAIEmbeddingProvider::new("sk-test").unwrap().with_base_url(server.uri());
    let embeddings = provider.embed_batch(&["pajak", "cukai"]).await.unwrap();
    assert_eq!(embeddings, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
}

#[tokio::test]
async fn embedding_count_mismatch_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "index": 0, "embedding": [1.0] }]
        })))
        .mount(&server)
        .await;

    let provider = OpenAIEmbeddingProvider::new("sk-test").unwrap().with_base_url(server.uri());
    let err = provider.embed_batch(&["a", "b"]).await.unwrap_err();
    assert!(matches!(err, RagError::EmbeddingError { .. }));
}

#[tokio::test]
async fn api_error_message_is_surfaced() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "message": "Incorrect API key provided" }
        })))
        .mount(&server)
        .await;

    let provider = OpenAIEmbeddingProvider::new("sk-bad").unwrap().with_base_url(server.uri());
    let err = provider.embed("pajak").await.unwrap_err();
    assert!(err.to_string().contains("Incorrect API key provided"));
}

#[tokio::test]
async fn chat_sends_single_user_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({
            "model": "gpt-3.5-turbo",
            "messages": [{ "role": "user", "content": "Apa itu pajak?" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "Pajak adalah kontribusi wajib." } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let model = OpenAIChatModel::new("sk-test").unwrap().with_base_url(server.uri());
    let reply = model.complete("Apa itu pajak?").await.unwrap();
    assert_eq!(reply, "Pajak adalah kontribusi wajib.");
}

#[tokio::test]
async fn chat_failure_is_a_model_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let model = OpenAIChatModel::new("sk-test").unwrap().with_base_url(server.uri());
    assert!(matches!(model.complete("x").await, Err(RagError::ModelError { .. })));
}

#[test]
fn empty_api_key_is_rejected() {
    assert!(OpenAIEmbeddingProvider::new("").is_err());
    assert!(OpenAIChatModel::new("").is_err());
}

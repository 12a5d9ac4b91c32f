// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /embed/single tests

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use fabstir_embedding_server::{
    api::{create_app, AppState, EmbedResponse, ErrorResponse, SingleEmbedResponse},
    config::{EmbeddingBackend, ServiceConfig},
    lifecycle,
};
use tower::ServiceExt;

async fn ready_state(api_key: Option<&str>) -> AppState {
    let config = ServiceConfig {
        backend: EmbeddingBackend::Mock,
        api_key: api_key.map(str::to_string),
        ..Default::default()
    };
    let state = AppState::new(&config);
    lifecycle::start(&state, &config).await.unwrap();
    state
}

async fn send(state: AppState, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = create_app(state).oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

fn single_query(text: &str) -> Request<Body> {
    let encoded: String = text
        .bytes()
        .map(|b| match b {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' => (b as char).to_string(),
            _ => format!("%{:02X}", b),
        })
        .collect();
    Request::builder()
        .method("POST")
        .uri(format!("/embed/single?text={}", encoded))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_query_text_matches_batch_endpoint() {
    let state = ready_state(None).await;
    let text = "pleural effusion";

    let (status, bytes) = send(state.clone(), single_query(text)).await;
    assert_eq!(status, StatusCode::OK);
    let single: SingleEmbedResponse = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(single.dimension, 768);
    assert_eq!(single.embedding.len(), 768);

    let batch_request = Request::builder()
        .method("POST")
        .uri("/embed")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::json!({ "texts": [text] }).to_string()))
        .unwrap();
    let (status, bytes) = send(state, batch_request).await;
    assert_eq!(status, StatusCode::OK);
    let batch: EmbedResponse = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(single.embedding, batch.embeddings[0]);
}

#[tokio::test]
async fn test_json_body_accepted() {
    let state = ready_state(None).await;

    let request = Request::builder()
        .method("POST")
        .uri("/embed/single")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"text": "atelectasis"}"#))
        .unwrap();
    let (status, bytes) = send(state.clone(), request).await;
    assert_eq!(status, StatusCode::OK);
    let from_body: SingleEmbedResponse = serde_json::from_slice(&bytes).unwrap();

    let (_, bytes) = send(state, single_query("atelectasis")).await;
    let from_query: SingleEmbedResponse = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(from_body.embedding, from_query.embedding);
}

#[tokio::test]
async fn test_missing_text_is_422() {
    let state = ready_state(None).await;

    let request = Request::builder()
        .method("POST")
        .uri("/embed/single")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(state, request).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_malformed_query_gets_json_error() {
    let state = ready_state(None).await;

    let request = Request::builder()
        .method("POST")
        .uri("/embed/single?text=a&text=b")
        .body(Body::empty())
        .unwrap();
    let (status, bytes) = send(state, request).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let error: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(error.error_type, "validation_error");
    assert!(error.request_id.is_some());
}

#[tokio::test]
async fn test_truncation_applies() {
    let state = ready_state(None).await;

    let long = "b".repeat(5000);
    let prefix = "b".repeat(2000);

    let (_, bytes) = send(state.clone(), single_query(&long)).await;
    let long_vec: SingleEmbedResponse = serde_json::from_slice(&bytes).unwrap();
    let (_, bytes) = send(state, single_query(&prefix)).await;
    let prefix_vec: SingleEmbedResponse = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(long_vec.embedding, prefix_vec.embedding);
}

#[tokio::test]
async fn test_auth_and_readiness() {
    let state = ready_state(Some("secret")).await;
    let (status, _) = send(state.clone(), single_query("x")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .method("POST")
        .uri("/embed/single?text=x")
        .header("X-API-Key", "secret")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(state, request).await;
    assert_eq!(status, StatusCode::OK);

    let loading = AppState::for_test("m", None);
    let (status, _) = send(loading, single_query("x")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

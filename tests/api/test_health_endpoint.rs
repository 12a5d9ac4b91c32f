// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! GET /health tests

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use fabstir_embedding_server::{
    api::{create_app, AppState, HealthResponse},
    config::{EmbeddingBackend, ServiceConfig},
    lifecycle,
};
use tower::ServiceExt;

async fn health(state: AppState) -> HealthResponse {
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = create_app(state).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_lifecycle() {
    let config = ServiceConfig {
        backend: EmbeddingBackend::Mock,
        api_key: Some("secret".to_string()),
        ..Default::default()
    };
    let state = AppState::new(&config);

    // No auth needed, and reports loading before the model is in place
    let before = health(state.clone()).await;
    assert_eq!(before.status, "loading");
    assert_eq!(before.model, "NeuML/pubmedbert-base-embeddings");
    assert_eq!(before.dimension, 768);

    lifecycle::start(&state, &config).await.unwrap();
    let ready = health(state.clone()).await;
    assert_eq!(ready.status, "ok");
    assert_eq!(ready.device, "cpu");
    assert_eq!(ready.gpu_name, None);

    lifecycle::shutdown(&state).await;
    let after = health(state).await;
    assert_eq!(after.status, "loading");
}

#[tokio::test]
async fn test_cors_is_permissive() {
    let state = AppState::for_test("m", None);
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/embed")
        .header("Origin", "http://localhost:3000")
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "x-api-key,content-type")
        .body(Body::empty())
        .unwrap();

    let response = create_app(state).oneshot(request).await.unwrap();
    assert!(response.status().is_success());
    assert!(response
        .headers()
        .contains_key("access-control-allow-origin"));
}

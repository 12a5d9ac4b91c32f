// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /embed and POST /embed/single handlers
//!
//! Checks run in a fixed order: body validation, API key, model readiness.
//! Inference only starts once all three pass.

use crate::api::auth::verify_api_key;
use crate::api::embed::{EmbedRequest, EmbedResponse, SingleEmbedResponse, SingleTextParams};
use crate::api::http_server::AppState;
use crate::api::ApiError;
use crate::embeddings::ModelHandle;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::{HeaderMap, StatusCode},
    Json,
};
use std::time::Instant;
use tracing::{debug, info};

/// POST /embed handler
///
/// # Request Body
/// ```json
/// { "texts": ["text1", "text2"] }
/// ```
///
/// # Response Body
/// ```json
/// { "embeddings": [[...768 floats...], ...], "dimension": 768, "count": 2, "time_ms": 8.41 }
/// ```
///
/// # Errors
/// - 422: body malformed or `texts` outside 1..=100
/// - 413: body larger than the router's limit
/// - 401: API key configured and `X-API-Key` missing or wrong
/// - 503: model still loading
/// - 500: inference failed
pub async fn embed_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<EmbedRequest>, JsonRejection>,
) -> Result<Json<EmbedResponse>, ApiError> {
    let Json(request) = payload.map_err(body_rejection)?;
    request.validate()?;

    let handle = authorize_and_acquire(&state, &headers).await?;

    let start = Instant::now();
    let count = request.texts.len();
    let embeddings = handle.embed(request.texts).await.map_err(inference_error)?;

    let response = EmbedResponse::new(embeddings, handle.dimension(), start.elapsed());
    info!(
        count,
        time_ms = response.time_ms,
        device = %handle.device(),
        "embedded batch"
    );

    Ok(Json(response))
}

/// POST /embed/single handler
///
/// `text` is read from the query string (`?text=...`) or a JSON body
/// `{"text": "..."}`. Same truncation, auth and readiness rules as
/// `/embed`; no timing metadata.
pub async fn embed_single_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<SingleTextParams>, QueryRejection>,
    body: Option<Json<SingleTextParams>>,
) -> Result<Json<SingleEmbedResponse>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::validation("query", e.body_text()))?;
    let text = SingleTextParams::resolve(query, body.map(|Json(b)| b))?;

    let handle = authorize_and_acquire(&state, &headers).await?;

    let embedding = handle.embed_one(text).await.map_err(inference_error)?;
    debug!(device = %handle.device(), "embedded single text");

    Ok(Json(SingleEmbedResponse {
        embedding,
        dimension: handle.dimension(),
    }))
}

/// Oversized bodies keep their 413; everything else is a malformed body.
fn body_rejection(rejection: JsonRejection) -> ApiError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(rejection.body_text())
    } else {
        ApiError::validation("body", rejection.body_text())
    }
}

fn inference_error(e: anyhow::Error) -> ApiError {
    ApiError::InternalError(format!("Embedding generation failed: {:#}", e))
}

async fn authorize_and_acquire(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<ModelHandle, ApiError> {
    verify_api_key(headers, state.api_key())?;

    state
        .model()
        .await
        .ok_or_else(|| ApiError::ServiceUnavailable("Model not loaded".to_string()))
}

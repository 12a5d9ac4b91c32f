// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! GET /health

use crate::api::http_server::AppState;
use crate::embeddings::{ComputeDevice, EMBEDDING_DIMENSION};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    /// "ok" once the model is loaded, "loading" before
    pub status: String,
    pub model: String,
    pub dimension: usize,
    pub device: String,
    /// CUDA device name, when running on one
    pub gpu_name: Option<String>,
}

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let response = match state.model().await {
        Some(handle) => HealthResponse {
            status: "ok".to_string(),
            model: state.model_name().to_string(),
            dimension: handle.dimension(),
            device: handle.device().to_string(),
            gpu_name: handle.accelerator_name().map(str::to_string),
        },
        None => HealthResponse {
            status: "loading".to_string(),
            model: state.model_name().to_string(),
            dimension: EMBEDDING_DIMENSION,
            device: ComputeDevice::Cpu.to_string(),
            gpu_name: None,
        },
    };
    Json(response)
}

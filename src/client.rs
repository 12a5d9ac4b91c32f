// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! HTTP client for a running embedding server
//!
//! Used by `embed-cli` and by services that want vectors without talking
//! to the model directly.

use crate::api::auth::API_KEY_HEADER;
use crate::api::{
    EmbedRequest, EmbedResponse, ErrorResponse, HealthResponse, SingleEmbedResponse,
};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server returned {status}: {message}")]
    Server { status: StatusCode, message: String },

    #[error("Model is still loading")]
    NotReady,
}

pub struct EmbeddingClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl EmbeddingClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        let response = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        parse(response).await
    }

    pub async fn embed(&self, texts: Vec<String>) -> Result<EmbedResponse, ClientError> {
        let response = self
            .authorized(self.http.post(format!("{}/embed", self.base_url)))
            .json(&EmbedRequest { texts })
            .send()
            .await?;
        parse(response).await
    }

    pub async fn embed_single(&self, text: &str) -> Result<SingleEmbedResponse, ClientError> {
        let response = self
            .authorized(self.http.post(format!("{}/embed/single", self.base_url)))
            .query(&[("text", text)])
            .send()
            .await?;
        parse(response).await
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header(API_KEY_HEADER, key),
            None => request,
        }
    }
}

async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }
    if status == StatusCode::SERVICE_UNAVAILABLE {
        return Err(ClientError::NotReady);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| e.message)
        .unwrap_or(body);
    Err(ClientError::Server { status, message })
}

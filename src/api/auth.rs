// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Optional shared-key check on the `X-API-Key` header

use crate::api::ApiError;
use axum::http::HeaderMap;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Passes when no key is configured or the header matches it exactly.
pub fn verify_api_key(headers: &HeaderMap, expected: Option<&str>) -> Result<(), ApiError> {
    let Some(expected) = expected else {
        return Ok(());
    };

    let supplied = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    match supplied {
        Some(key) if key == expected => Ok(()),
        _ => Err(ApiError::Unauthorized("Invalid API key".to_string())),
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Request bodies for POST /embed and POST /embed/single

use crate::api::ApiError;
use crate::embeddings::MAX_BATCH_TEXTS;
use serde::{Deserialize, Serialize};

/// Request body for POST /embed
///
/// # Example
/// ```json
/// { "texts": ["Hello world", "Another text"] }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedRequest {
    /// Text strings to embed (1-100 items). Long texts are truncated, not rejected.
    pub texts: Vec<String>,
}

impl EmbedRequest {
    /// Checks the batch size is within 1..=100.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.texts.is_empty() {
            return Err(ApiError::validation(
                "texts",
                "texts array must contain at least 1 item",
            ));
        }

        if self.texts.len() > MAX_BATCH_TEXTS {
            return Err(ApiError::validation(
                "texts",
                format!(
                    "texts array cannot contain more than {} items (got {})",
                    MAX_BATCH_TEXTS,
                    self.texts.len()
                ),
            ));
        }

        Ok(())
    }
}

/// `text` for POST /embed/single, from the query string or a JSON body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SingleTextParams {
    pub text: Option<String>,
}

impl SingleTextParams {
    /// Query value first, then body; missing in both is a validation error.
    pub fn resolve(
        query: SingleTextParams,
        body: Option<SingleTextParams>,
    ) -> Result<String, ApiError> {
        query
            .text
            .or_else(|| body.and_then(|b| b.text))
            .ok_or_else(|| ApiError::validation("text", "field required"))
    }
}

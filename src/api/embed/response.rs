// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Response bodies for the embedding endpoints

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Response body for POST /embed
///
/// # Example
/// ```json
/// {
///   "embeddings": [[0.01, -0.02, ...]],
///   "dimension": 768,
///   "count": 1,
///   "time_ms": 12.34
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedResponse {
    /// One unit-norm vector per input text, in input order
    pub embeddings: Vec<Vec<f32>>,

    pub dimension: usize,

    /// Number of texts processed
    pub count: usize,

    /// Wall-clock processing time in milliseconds, 2 decimals
    pub time_ms: f64,
}

impl EmbedResponse {
    pub fn new(embeddings: Vec<Vec<f32>>, dimension: usize, elapsed: Duration) -> Self {
        let count = embeddings.len();
        Self {
            embeddings,
            dimension,
            count,
            time_ms: round_ms(elapsed),
        }
    }
}

/// Response body for POST /embed/single
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingleEmbedResponse {
    pub embedding: Vec<f32>,
    pub dimension: usize,
}

/// Milliseconds rounded to 2 decimal places
pub fn round_ms(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 1000.0 * 100.0).round() / 100.0
}

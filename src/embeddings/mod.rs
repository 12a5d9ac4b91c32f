// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Sentence embedding core
//!
//! Holds the `TextEncoder` seam that the HTTP layer talks to, the
//! process-wide `ModelHandle`, and the small vector utilities shared by
//! every backend (truncation, L2 normalization, cosine similarity).

pub mod device;
pub mod mock_model;
pub mod model_files;
pub mod onnx_model;

pub use device::{select_device, ComputeDevice, DeviceProbe, OrtDeviceProbe};
pub use mock_model::MockEmbeddingModel;
pub use model_files::{resolve_model_files, ModelFiles, ModelSource};
pub use onnx_model::{OnnxEmbeddingModel, OnnxModelOptions};

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::debug;

/// Default pretrained model served by this node
pub const DEFAULT_MODEL_NAME: &str = "NeuML/pubmedbert-base-embeddings";

/// Output dimension of pubmedbert-base-embeddings
pub const EMBEDDING_DIMENSION: usize = 768;

/// Maximum number of texts accepted in one batch
pub const MAX_BATCH_TEXTS: usize = 100;

/// Texts longer than this (in characters) are cut before tokenization
pub const MAX_TEXT_CHARS: usize = 2000;

/// BERT position limit
pub const MAX_SEQUENCE_TOKENS: usize = 512;

/// A model that turns text into raw (not yet normalized) sentence vectors.
///
/// Implementations are blocking: callers run them on the blocking pool.
#[cfg_attr(test, mockall::automock)]
pub trait TextEncoder: Send + Sync {
    /// Length of every vector returned by `encode`
    fn dimension(&self) -> usize;

    /// Encodes `texts` in one batch, returning one vector per text in order.
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// The loaded model together with the device it runs on.
///
/// Cheap to clone; every clone shares the same encoder.
#[derive(Clone)]
pub struct ModelHandle {
    encoder: Arc<dyn TextEncoder>,
    device: ComputeDevice,
    accelerator_name: Option<String>,
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("device", &self.device)
            .field("accelerator_name", &self.accelerator_name)
            .field("dimension", &self.encoder.dimension())
            .finish_non_exhaustive()
    }
}

impl ModelHandle {
    pub fn new(encoder: Arc<dyn TextEncoder>, device: ComputeDevice) -> Self {
        Self {
            encoder,
            device,
            accelerator_name: None,
        }
    }

    pub fn with_accelerator_name(mut self, name: Option<String>) -> Self {
        self.accelerator_name = name;
        self
    }

    pub fn device(&self) -> ComputeDevice {
        self.device
    }

    pub fn accelerator_name(&self) -> Option<&str> {
        self.accelerator_name.as_deref()
    }

    pub fn dimension(&self) -> usize {
        self.encoder.dimension()
    }

    /// Truncates, encodes and L2-normalizes a batch.
    ///
    /// Inference runs on the blocking pool so the async workers stay free.
    /// Either every text gets a vector or the whole call fails.
    pub async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let truncated: Vec<String> = texts
            .iter()
            .map(|t| truncate_chars(t).to_string())
            .collect();
        let encoder = self.encoder.clone();
        let expected_count = truncated.len();

        let mut vectors = tokio::task::spawn_blocking(move || encoder.encode(&truncated))
            .await
            .context("Embedding task panicked")??;

        if vectors.len() != expected_count {
            anyhow::bail!(
                "Model returned {} vectors for {} texts",
                vectors.len(),
                expected_count
            );
        }

        let dimension = self.dimension();
        for (i, vector) in vectors.iter_mut().enumerate() {
            if vector.len() != dimension {
                anyhow::bail!(
                    "Unexpected embedding dimension at index {}: {} (expected {})",
                    i,
                    vector.len(),
                    dimension
                );
            }
            l2_normalize(vector);
        }

        debug!(count = vectors.len(), dimension, "encoded batch");
        Ok(vectors)
    }

    /// Single-text convenience over [`ModelHandle::embed`].
    pub async fn embed_one(&self, text: String) -> Result<Vec<f32>> {
        self.embed(vec![text])
            .await?
            .pop()
            .context("Model returned no vector")
    }
}

/// Returns at most the first `MAX_TEXT_CHARS` characters of `text`.
///
/// Counts Unicode scalar values, so multi-byte text is never split
/// inside a character.
pub fn truncate_chars(text: &str) -> &str {
    match text.char_indices().nth(MAX_TEXT_CHARS) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Scales `vector` in place to unit Euclidean norm. Zero vectors are left as is.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

/// Cosine similarity of two vectors of equal length.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        anyhow::bail!(
            "Vectors must have the same dimension ({} vs {})",
            a.len(),
            b.len()
        );
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    Ok(dot / (norm_a * norm_b))
}

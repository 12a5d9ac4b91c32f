// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! ONNX Embedding Model Wrapper
//!
//! This module provides a wrapper around ONNX Runtime for running
//! the pubmedbert-base-embeddings sentence transformer.
//!
//! Features:
//! - ONNX model loading from disk
//! - CUDA / CoreML acceleration with automatic CPU fallback
//! - BERT tokenization with truncation to 512 tokens
//! - Batch embedding generation with padding
//! - Mean pooling over token embeddings
//! - 768-dimensional output vectors (normalized by `ModelHandle`)

use crate::embeddings::{ComputeDevice, ModelFiles, TextEncoder, MAX_SEQUENCE_TOKENS};
use anyhow::{Context, Result};
use ndarray::{Array2, Axis};
use ort::execution_providers::{
    CPUExecutionProvider, CUDAExecutionProvider, ExecutionProviderDispatch,
};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{info, warn};

/// Options for building the ONNX session
#[derive(Debug, Clone)]
pub struct OnnxModelOptions {
    /// Device to try first; CPU is the fallback
    pub device: ComputeDevice,
    /// ONNX Runtime intra-op threads
    pub intra_threads: usize,
    /// Hidden size the graph must produce
    pub expected_dimension: usize,
}

/// ONNX-based BERT sentence embedding model
///
/// # Model Details
/// - Input: Text strings (truncated to 512 tokens)
/// - Output: token embeddings `[batch, seq_len, hidden]`, mean pooled
///   with the attention mask into one `hidden`-sized vector per text
///
/// # Thread Safety
/// `ort::Session::run` needs `&mut self`, so the session sits behind a
/// `Mutex`; concurrent batches serialize on it.
#[derive(Clone)]
pub struct OnnxEmbeddingModel {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
    model_name: String,
    dimension: usize,
    device: ComputeDevice,
}

impl std::fmt::Debug for OnnxEmbeddingModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEmbeddingModel")
            .field("model_name", &self.model_name)
            .field("dimension", &self.dimension)
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}

/// Token tensors for one padded batch
struct BatchInputs {
    input_ids: Array2<i64>,
    attention_mask: Array2<i64>,
    token_type_ids: Array2<i64>,
}

impl OnnxEmbeddingModel {
    /// Loads the model and tokenizer and checks the output shape.
    ///
    /// # Errors
    /// Returns error if:
    /// - Model or tokenizer file not found or invalid
    /// - ONNX Runtime initialization fails on every device
    /// - Model hidden size differs from `expected_dimension`
    ///
    /// # Example
    /// ```ignore
    /// let model = OnnxEmbeddingModel::new("NeuML/pubmedbert-base-embeddings", &files, options)?;
    /// ```
    pub fn new(
        model_name: impl Into<String>,
        files: &ModelFiles,
        options: OnnxModelOptions,
    ) -> Result<Self> {
        let model_name = model_name.into();
        let model_path = files.model_path.as_path();
        let tokenizer_path = files.tokenizer_path.as_path();

        if !model_path.exists() {
            anyhow::bail!("ONNX model file not found: {}", model_path.display());
        }
        if !tokenizer_path.exists() {
            anyhow::bail!("Tokenizer file not found: {}", tokenizer_path.display());
        }

        info!(
            "Initializing ONNX embedding model {} on {}",
            model_name, options.device
        );

        let (mut session, device) = match options.device {
            ComputeDevice::Cpu => (
                build_session(model_path, cpu_provider(), options.intra_threads)?,
                ComputeDevice::Cpu,
            ),
            accelerator => {
                let provider = accelerator_provider(accelerator)?;
                match build_session(model_path, provider, options.intra_threads) {
                    Ok(s) => {
                        info!("{} execution provider initialized", accelerator);
                        (s, accelerator)
                    }
                    Err(e) => {
                        warn!("{} execution provider failed: {:#}", accelerator, e);
                        warn!("Falling back to CPU execution provider");
                        (
                            build_session(model_path, cpu_provider(), options.intra_threads)?,
                            ComputeDevice::Cpu,
                        )
                    }
                }
            }
        };

        let mut tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQUENCE_TOKENS,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("Failed to configure tokenizer truncation: {}", e))?;
        // Padding is done per batch in `prepare_batch`
        tokenizer.with_padding(None);

        // Validation run; outputs must be dropped before the session moves
        {
            let inputs = prepare_batch(&tokenizer, &["validation test".to_string()])?;
            let hidden = {
                let outputs = session.run(ort::inputs![
                    "input_ids" => Value::from_array(inputs.input_ids)?,
                    "attention_mask" => Value::from_array(inputs.attention_mask)?,
                    "token_type_ids" => Value::from_array(inputs.token_type_ids)?
                ])?;
                let output_tensor = outputs[0]
                    .try_extract_array::<f32>()
                    .context("Failed to extract output tensor")?;
                let shape = output_tensor.shape().to_vec();
                if shape.len() != 3 {
                    anyhow::bail!(
                        "Model outputs unexpected shape: {:?} (expected [batch, seq_len, hidden])",
                        shape
                    );
                }
                shape[2]
            };

            if hidden != options.expected_dimension {
                anyhow::bail!(
                    "Model hidden size is {} (expected {})",
                    hidden,
                    options.expected_dimension
                );
            }
        }

        info!("ONNX embedding model loaded ({} dimensions)", options.expected_dimension);

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            model_name,
            dimension: options.expected_dimension,
            device,
        })
    }

    /// Device the session actually runs on (after any fallback)
    pub fn device(&self) -> ComputeDevice {
        self.device
    }

    fn run_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let inputs = prepare_batch(&self.tokenizer, texts)?;
        let attention_mask = inputs.attention_mask.clone();

        let mut session_guard = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("ONNX session lock poisoned"))?;
        let outputs = session_guard.run(ort::inputs![
            "input_ids" => Value::from_array(inputs.input_ids)?,
            "attention_mask" => Value::from_array(inputs.attention_mask)?,
            "token_type_ids" => Value::from_array(inputs.token_type_ids)?
        ])?;

        // Index 0 rather than a name: exports differ in output naming
        let output_array = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch_idx in 0..texts.len() {
            let item = output_array.index_axis(Axis(0), batch_idx); // [seq_len, hidden]
            let item_mask = attention_mask.index_axis(Axis(0), batch_idx);
            let seq_len = item.shape()[0];
            let hidden_dim = item.shape()[1];

            let mut pooled = vec![0.0f32; hidden_dim];
            let mut sum_mask = 0.0f32;
            for i in 0..seq_len {
                let mask_value = item_mask[i] as f32;
                sum_mask += mask_value;
                for (j, slot) in pooled.iter_mut().enumerate() {
                    *slot += item[[i, j]] * mask_value;
                }
            }
            for val in &mut pooled {
                *val /= sum_mask.max(1e-9);
            }

            embeddings.push(pooled);
        }

        Ok(embeddings)
    }
}

impl TextEncoder for OnnxEmbeddingModel {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        self.run_batch(texts)
    }
}

fn cpu_provider() -> ExecutionProviderDispatch {
    CPUExecutionProvider::default().build()
}

fn accelerator_provider(device: ComputeDevice) -> Result<ExecutionProviderDispatch> {
    match device {
        ComputeDevice::Cuda => Ok(CUDAExecutionProvider::default().build().error_on_failure()),
        #[cfg(target_os = "macos")]
        ComputeDevice::CoreMl => Ok(ort::execution_providers::CoreMLExecutionProvider::default()
            .build()
            .error_on_failure()),
        #[cfg(not(target_os = "macos"))]
        ComputeDevice::CoreMl => anyhow::bail!("CoreML is only available on macOS"),
        ComputeDevice::Cpu => Ok(cpu_provider()),
    }
}

fn build_session(
    model_path: &Path,
    provider: ExecutionProviderDispatch,
    intra_threads: usize,
) -> Result<Session> {
    Session::builder()
        .context("Failed to create session builder")?
        .with_execution_providers([provider])
        .context("Failed to set execution provider")?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .context("Failed to set optimization level")?
        .with_intra_threads(intra_threads)
        .context("Failed to set intra threads")?
        .commit_from_file(model_path)
        .with_context(|| format!("Failed to load ONNX model from {}", model_path.display()))
}

/// Tokenizes `texts` and right-pads every sequence to the longest one.
fn prepare_batch(tokenizer: &Tokenizer, texts: &[String]) -> Result<BatchInputs> {
    let encodings = texts
        .iter()
        .map(|text| {
            tokenizer
                .encode(text.as_str(), true)
                .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))
        })
        .collect::<Result<Vec<_>>>()?;

    let max_len = encodings
        .iter()
        .map(|enc| enc.get_ids().len())
        .max()
        .unwrap_or(0)
        .max(1);

    let mut input_ids = Vec::with_capacity(texts.len() * max_len);
    let mut attention_mask = Vec::with_capacity(texts.len() * max_len);

    for encoding in &encodings {
        let ids = encoding.get_ids();
        let mask = encoding.get_attention_mask();
        let padding_needed = max_len - ids.len();

        input_ids.extend(ids.iter().map(|&id| id as i64));
        input_ids.extend(std::iter::repeat(0i64).take(padding_needed));
        attention_mask.extend(mask.iter().map(|&m| m as i64));
        attention_mask.extend(std::iter::repeat(0i64).take(padding_needed));
    }

    let shape = (texts.len(), max_len);
    Ok(BatchInputs {
        input_ids: Array2::from_shape_vec(shape, input_ids)
            .context("Failed to create batch input_ids array")?,
        attention_mask: Array2::from_shape_vec(shape, attention_mask)
            .context("Failed to create batch attention_mask array")?,
        token_type_ids: Array2::zeros(shape),
    })
}

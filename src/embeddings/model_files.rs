// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Locates the ONNX graph and tokenizer for the configured model.
//!
//! Local paths win; anything not given locally is fetched from the
//! Hugging Face Hub (and cached by hf-hub).

use anyhow::{Context, Result};
use hf_hub::api::sync::ApiBuilder;
use std::path::{Path, PathBuf};
use tracing::info;

pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// Files needed to build an `OnnxEmbeddingModel`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFiles {
    pub model_path: PathBuf,
    pub tokenizer_path: PathBuf,
}

/// Where to find the model
#[derive(Debug, Clone, Default)]
pub struct ModelSource {
    /// Hub repository id, e.g. "NeuML/pubmedbert-base-embeddings"
    pub repo_id: String,
    /// ONNX file inside the repository
    pub onnx_file: String,
    pub model_path: Option<PathBuf>,
    pub tokenizer_path: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
}

/// Resolves both files, downloading from the Hub when needed.
///
/// Blocking: hf-hub's sync API does network and disk IO.
pub fn resolve_model_files(source: &ModelSource) -> Result<ModelFiles> {
    if let (Some(model), Some(tokenizer)) = (&source.model_path, &source.tokenizer_path) {
        ensure_exists(model, "ONNX model file")?;
        ensure_exists(tokenizer, "Tokenizer file")?;
        return Ok(ModelFiles {
            model_path: model.clone(),
            tokenizer_path: tokenizer.clone(),
        });
    }

    let mut builder = ApiBuilder::new().with_progress(false);
    if let Some(cache_dir) = &source.cache_dir {
        builder = builder.with_cache_dir(cache_dir.clone());
    }
    let api = builder.build().context("Failed to initialise Hugging Face Hub client")?;
    let repo = api.model(source.repo_id.clone());

    let model_path = match &source.model_path {
        Some(path) => {
            ensure_exists(path, "ONNX model file")?;
            path.clone()
        }
        None => {
            info!("Fetching {} from {}", source.onnx_file, source.repo_id);
            repo.get(&source.onnx_file).with_context(|| {
                format!(
                    "Failed to download {} from {}",
                    source.onnx_file, source.repo_id
                )
            })?
        }
    };

    let tokenizer_path = match &source.tokenizer_path {
        Some(path) => {
            ensure_exists(path, "Tokenizer file")?;
            path.clone()
        }
        None => {
            info!("Fetching {} from {}", TOKENIZER_FILE, source.repo_id);
            repo.get(TOKENIZER_FILE).with_context(|| {
                format!("Failed to download {} from {}", TOKENIZER_FILE, source.repo_id)
            })?
        }
    };

    Ok(ModelFiles {
        model_path,
        tokenizer_path,
    })
}

fn ensure_exists(path: &Path, what: &str) -> Result<()> {
    if !path.is_file() {
        anyhow::bail!("{} not found: {}", what, path.display());
    }
    Ok(())
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Service configuration
//!
//! Every option can come from a flag or an environment variable (flags win).
//! `main` loads a `.env` file before parsing.

use crate::embeddings::{ModelSource, DEFAULT_MODEL_NAME};
use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Which encoder implementation backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EmbeddingBackend {
    /// ONNX Runtime with the pretrained model
    Onnx,
    /// Deterministic hash-seeded vectors, no model files needed
    Mock,
}

/// Fabstir Embedding Server
#[derive(Parser, Debug, Clone)]
#[command(name = "fabstir-embedding-server")]
#[command(version = crate::version::VERSION_NUMBER)]
#[command(about = "Serves sentence embeddings over HTTP", long_about = None)]
pub struct ServiceConfig {
    /// Address to listen on
    #[arg(long, env = "EMBEDDING_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "EMBEDDING_PORT", default_value_t = 8001)]
    pub port: u16,

    /// Model identifier (Hugging Face Hub repository)
    #[arg(long, env = "EMBEDDING_MODEL", default_value = DEFAULT_MODEL_NAME)]
    pub model: String,

    /// Local ONNX model file; skips the Hub download
    #[arg(long, env = "EMBEDDING_MODEL_PATH")]
    pub model_path: Option<PathBuf>,

    /// Local tokenizer.json; skips the Hub download
    #[arg(long, env = "EMBEDDING_TOKENIZER_PATH")]
    pub tokenizer_path: Option<PathBuf>,

    /// ONNX file inside the Hub repository
    #[arg(long, env = "EMBEDDING_ONNX_FILE", default_value = "onnx/model.onnx")]
    pub onnx_file: String,

    /// Hub download cache directory
    #[arg(long, env = "EMBEDDING_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Opt in to CUDA ("1" or "true"; anything else is off)
    #[arg(
        long,
        env = "USE_GPU",
        default_value = "0",
        value_parser = parse_flag,
        action = clap::ArgAction::Set
    )]
    pub use_gpu: bool,

    /// Required X-API-Key value; empty disables the check
    #[arg(long, env = "EMBEDDING_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Encoder backend
    #[arg(long, env = "EMBEDDING_BACKEND", value_enum, default_value_t = EmbeddingBackend::Onnx)]
    pub backend: EmbeddingBackend,

    /// ONNX Runtime intra-op threads
    #[arg(long, env = "EMBEDDING_INTRA_THREADS", default_value_t = 4)]
    pub intra_threads: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8001,
            model: DEFAULT_MODEL_NAME.to_string(),
            model_path: None,
            tokenizer_path: None,
            onnx_file: "onnx/model.onnx".to_string(),
            cache_dir: None,
            use_gpu: false,
            api_key: None,
            backend: EmbeddingBackend::Onnx,
            intra_threads: 4,
        }
    }
}

impl ServiceConfig {
    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse()
            .map_err(|e| anyhow::anyhow!("Invalid listen address {}: {}", addr, e))
    }

    /// Configured API key, treating an empty string as unset.
    ///
    /// Any other value, whitespace included, is compared byte for byte.
    pub fn effective_api_key(&self) -> Option<String> {
        self.api_key.clone().filter(|k| !k.is_empty())
    }

    pub fn model_source(&self) -> ModelSource {
        ModelSource {
            repo_id: self.model.clone(),
            onnx_file: self.onnx_file.clone(),
            model_path: self.model_path.clone(),
            tokenizer_path: self.tokenizer_path.clone(),
            cache_dir: self.cache_dir.clone(),
        }
    }
}

/// Only "1" (or "true") opts in; any other value means off.
fn parse_flag(value: &str) -> Result<bool, String> {
    Ok(value == "1" || value.eq_ignore_ascii_case("true"))
}

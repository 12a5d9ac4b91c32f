// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Model lifecycle: device selection and load at startup, release at shutdown.
//!
//! The service moves `Starting -> Ready` when the model is installed and
//! `-> Stopped` on shutdown. A failed load is fatal; `main` exits non-zero.

use crate::api::http_server::AppState;
use crate::config::{EmbeddingBackend, ServiceConfig};
use crate::embeddings::{
    device::cuda_device_name, resolve_model_files, select_device, ComputeDevice, DeviceProbe,
    MockEmbeddingModel, ModelHandle, OnnxEmbeddingModel, OnnxModelOptions, OrtDeviceProbe,
    EMBEDDING_DIMENSION,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Coarse service phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServicePhase {
    Starting,
    Ready,
    Stopped,
}

/// Builds the model described by `config`.
///
/// Blocking work (Hub download, session build) runs on the blocking pool.
pub async fn load_model(config: &ServiceConfig) -> Result<ModelHandle> {
    load_model_with_probe(config, OrtDeviceProbe).await
}

pub async fn load_model_with_probe<P>(config: &ServiceConfig, probe: P) -> Result<ModelHandle>
where
    P: DeviceProbe + Send + 'static,
{
    let start = Instant::now();
    info!("Loading model: {} (backend {:?})", config.model, config.backend);

    let handle = match config.backend {
        EmbeddingBackend::Mock => {
            let model = MockEmbeddingModel::new(EMBEDDING_DIMENSION)?;
            ModelHandle::new(Arc::new(model), ComputeDevice::Cpu)
        }
        EmbeddingBackend::Onnx => {
            let use_gpu = config.use_gpu;
            let source = config.model_source();
            let model_name = config.model.clone();
            let intra_threads = config.intra_threads;

            let model = tokio::task::spawn_blocking(move || -> Result<OnnxEmbeddingModel> {
                let device = select_device(use_gpu, &probe);
                let files = resolve_model_files(&source)?;
                OnnxEmbeddingModel::new(
                    model_name,
                    &files,
                    OnnxModelOptions {
                        device,
                        intra_threads,
                        expected_dimension: EMBEDDING_DIMENSION,
                    },
                )
            })
            .await
            .context("Model loading task panicked")??;

            let device = model.device();
            let accelerator_name = if device == ComputeDevice::Cuda {
                cuda_device_name().await
            } else {
                None
            };
            if let Some(name) = &accelerator_name {
                info!("Using GPU: {}", name);
            }
            ModelHandle::new(Arc::new(model), device).with_accelerator_name(accelerator_name)
        }
    };

    info!(
        "Model loaded in {:.2}s on {} ({} dimensions)",
        start.elapsed().as_secs_f64(),
        handle.device(),
        handle.dimension()
    );
    Ok(handle)
}

/// Loads the model and installs it into `state`, marking the service ready.
pub async fn start(state: &AppState, config: &ServiceConfig) -> Result<()> {
    let handle = load_model(config)
        .await
        .with_context(|| format!("Failed to load embedding model {}", config.model))?;
    state.install_model(handle).await;
    Ok(())
}

/// Releases the model. Requests arriving afterwards see the service as not ready.
pub async fn shutdown(state: &AppState) {
    info!("Shutting down...");
    state.release_model().await;
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Compute device selection for the embedding model
//!
//! Priority: CUDA (only when the operator opted in with `USE_GPU`), then the
//! platform-integrated accelerator (CoreML on macOS), then CPU.

use ort::execution_providers::{CUDAExecutionProvider, ExecutionProvider};
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

/// Device an ONNX session runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComputeDevice {
    Cpu,
    Cuda,
    CoreMl,
}

impl ComputeDevice {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComputeDevice::Cpu => "cpu",
            ComputeDevice::Cuda => "cuda",
            ComputeDevice::CoreMl => "coreml",
        }
    }
}

impl fmt::Display for ComputeDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reports which accelerators the host can actually use
pub trait DeviceProbe {
    fn cuda_available(&self) -> bool;
    fn platform_accelerator_available(&self) -> bool;
}

/// Probe backed by the ONNX Runtime execution provider registry
#[derive(Debug, Default, Clone, Copy)]
pub struct OrtDeviceProbe;

impl DeviceProbe for OrtDeviceProbe {
    fn cuda_available(&self) -> bool {
        match CUDAExecutionProvider::default().is_available() {
            Ok(available) => available,
            Err(e) => {
                debug!("CUDA availability check failed: {}", e);
                false
            }
        }
    }

    #[cfg(target_os = "macos")]
    fn platform_accelerator_available(&self) -> bool {
        use ort::execution_providers::CoreMLExecutionProvider;

        match CoreMLExecutionProvider::default().is_available() {
            Ok(available) => available,
            Err(e) => {
                debug!("CoreML availability check failed: {}", e);
                false
            }
        }
    }

    #[cfg(not(target_os = "macos"))]
    fn platform_accelerator_available(&self) -> bool {
        false
    }
}

/// Picks the device the model will be loaded onto.
pub fn select_device(use_gpu: bool, probe: &impl DeviceProbe) -> ComputeDevice {
    if use_gpu && probe.cuda_available() {
        info!("Using CUDA execution provider");
        ComputeDevice::Cuda
    } else if probe.platform_accelerator_available() {
        info!("Using CoreML execution provider");
        ComputeDevice::CoreMl
    } else {
        if use_gpu {
            info!("USE_GPU set but CUDA is not available, using CPU");
        } else {
            info!("Using CPU execution provider");
        }
        ComputeDevice::Cpu
    }
}

/// Name of the first CUDA device, as reported by `nvidia-smi`.
///
/// Returns `None` when the tool is missing or prints nothing.
pub async fn cuda_device_name() -> Option<String> {
    let output = tokio::process::Command::new("nvidia-smi")
        .args(["--query-gpu=name", "--format=csv,noheader"])
        .output()
        .await
        .ok()?;

    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod client;
pub mod config;
pub mod embeddings;
pub mod lifecycle;
pub mod version;

pub use api::{create_app, AppState};
pub use client::{ClientError, EmbeddingClient};
pub use config::{EmbeddingBackend, ServiceConfig};
pub use embeddings::{ComputeDevice, ModelHandle, TextEncoder};

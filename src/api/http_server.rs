// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use super::{embed_handler, embed_single_handler, health_handler};
use crate::config::ServiceConfig;
use crate::embeddings::ModelHandle;
use crate::lifecycle::ServicePhase;

/// State shared by every handler.
///
/// The model slot is empty until the lifecycle loader installs a handle,
/// and emptied again on shutdown.
#[derive(Clone)]
pub struct AppState {
    model: Arc<RwLock<Option<ModelHandle>>>,
    phase: Arc<RwLock<ServicePhase>>,
    model_name: Arc<str>,
    api_key: Option<Arc<str>>,
}

impl AppState {
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            model: Arc::new(RwLock::new(None)),
            phase: Arc::new(RwLock::new(ServicePhase::Starting)),
            model_name: Arc::from(config.model.as_str()),
            api_key: config.effective_api_key().map(Arc::from),
        }
    }

    pub fn for_test(model_name: &str, api_key: Option<String>) -> Self {
        let config = ServiceConfig {
            model: model_name.to_string(),
            api_key,
            ..Default::default()
        };
        Self::new(&config)
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// Clone of the loaded model, or `None` while loading / after shutdown
    pub async fn model(&self) -> Option<ModelHandle> {
        self.model.read().await.clone()
    }

    pub async fn phase(&self) -> ServicePhase {
        *self.phase.read().await
    }

    pub async fn install_model(&self, handle: ModelHandle) {
        let device = handle.device();
        *self.model.write().await = Some(handle);
        info!("Model {} ready on {}", self.model_name, device);
        self.set_phase(ServicePhase::Ready).await;
    }

    pub async fn release_model(&self) {
        self.model.write().await.take();
        info!("Model {} released", self.model_name);
        self.set_phase(ServicePhase::Stopped).await;
    }

    async fn set_phase(&self, next: ServicePhase) {
        let previous = std::mem::replace(&mut *self.phase.write().await, next);
        info!(from = ?previous, to = ?next, "Service phase changed");
    }
}

/// Request body cap. Texts are truncated after parsing, so the cap only has
/// to stop runaway uploads, not enforce the per-text limit.
pub const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/embed", post(embed_handler))
        .route("/embed/single", post(embed_single_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves `state` on `listener` until `shutdown` resolves, then drains
/// in-flight requests.
pub async fn serve<F>(
    listener: tokio::net::TcpListener,
    state: AppState,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!("Embedding server listening on {}", addr);
    }
    axum::serve(listener, create_app(state))
        .with_graceful_shutdown(shutdown)
        .await
}

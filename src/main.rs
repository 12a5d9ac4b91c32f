// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use clap::Parser;
use fabstir_embedding_server::{
    api::{serve, AppState},
    lifecycle, version, ServiceConfig,
};
use std::env;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let config = ServiceConfig::parse();
    info!("{}", version::get_version_string());

    let addr = config.listen_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    let state = AppState::new(&config);
    if state.api_key().is_some() {
        info!("API key authentication enabled");
    }

    // Flips to true on Ctrl-C / SIGTERM, or when model loading fails
    let (stop_tx, stop_rx) = watch::channel(false);

    let signal_tx = stop_tx.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received");
        let _ = signal_tx.send(true);
    });

    let server = tokio::spawn(serve(listener, state.clone(), wait_for_stop(stop_rx.clone())));

    // The listener is already up; requests see 503 until this completes
    let load_result = tokio::select! {
        result = lifecycle::start(&state, &config) => result,
        _ = wait_for_stop(stop_rx) => Ok(()),
    };
    if load_result.is_err() {
        let _ = stop_tx.send(true);
    }

    server.await.context("HTTP server task panicked")??;
    lifecycle::shutdown(&state).await;

    if let Err(e) = load_result {
        error!("Fatal: {:#}", e);
        error!("Cannot serve without the model; fix the configuration and restart");
        std::process::exit(1);
    }

    Ok(())
}

async fn wait_for_stop(mut stop_rx: watch::Receiver<bool>) {
    let _ = stop_rx.wait_for(|stop| *stop).await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

//! Formgate server - single-endpoint form submission handler.
//!
//! Receives form submissions over HTTP, runs them through the dispatcher and
//! hands accepted ones to the configured success actions.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use formgate::web::router;
use formgate::{AppState, Config, Dispatcher, FormId};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("form_server_starting");

    // Load configuration
    let config = Config::from_env();
    info!(
        port = config.port,
        cors_allow_origin = %config.cors_allow_origin,
        min_submit_elapsed_ms = config.min_submit_elapsed_ms,
        honeypot_field = %config.honeypot_field,
        timestamp_field = %config.timestamp_field,
        webhook_configured = config.webhook_url.is_some(),
        webhook_signing_configured = config.webhook_signing_key.is_some(),
        queue_configured = config.cloudamqp_url.is_some(),
        "config_loaded"
    );

    let dispatcher = Dispatcher::from_config(&config).context("Failed to build dispatcher")?;
    info!(
        forms = %dispatcher.registry().known_ids(),
        form_count = FormId::ALL.len(),
        "form_registry_ready"
    );

    let state = AppState::new(dispatcher);
    let app = router(state.clone());

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "form_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Close queue connections
    state.dispatcher.registry().actions().close().await;

    info!("form_server_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "ctrl_c_handler_failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "sigterm_handler_failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("form_server_shutting_down");
}

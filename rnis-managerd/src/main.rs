mod api;
mod config;
mod controller;
mod env_manager;
mod error;
mod http;
mod registration;
mod service;
mod subscriptions;
mod workers;

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use anyhow::{Context, Result};
use crate::config::Config;
use crate::controller::{ControllerClient, ControllerCredentials};
use crate::env_manager::EnvHandle;
use crate::http::HttpClient;
use crate::registration::RegistrationLoop;
use crate::subscriptions::callback::CallbackDispatcher;
use crate::subscriptions::lifecycle::SubscriptionController;
use crate::workers::WorkerContext;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("rnis_managerd=info"))
        )
        .init();

    tracing::info!("Starting rnis-managerd");

    // Load config, built-in defaults when no path is given
    let config = match std::env::args().nth(1) {
        Some(config_path) => {
            let config = Config::load(&config_path)
                .with_context(|| format!("Failed to load config from {}", config_path))?;
            tracing::info!("Loaded config from {}", config_path);
            config
        }
        None => {
            tracing::info!("No config file given, using defaults");
            Config::default()
        }
    };

    let service_id = config
        .manager
        .service_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    tracing::info!("Service instance id {}", service_id);

    let http = HttpClient::new();
    let credentials = ControllerCredentials::from_config(&config.controller)
        .context("Invalid controller credentials")?;
    let controller = ControllerClient::new(http.clone(), credentials);
    tracing::info!(
        "Controller at {}:{}",
        config.controller.host,
        config.controller.port
    );

    // Cancellation token shared by the server and every service loop
    let cancel = CancellationToken::new();

    let worker_ctx = WorkerContext {
        controller,
        dispatcher: CallbackDispatcher::new(http.clone()),
        public_uri: config.api.public_uri.clone(),
        every: config.subscriptions.every(),
    };
    let env = EnvHandle::spawn(workers::factories(worker_ctx), cancel.clone());

    // The manager's own heartbeat runs as a service in the environment
    let registration = Arc::new(RegistrationLoop::new(
        service_id,
        config.registry.url.clone(),
        config.manager.every(),
        http,
    ));
    let app_state = api::routes::AppState {
        subscriptions: SubscriptionController::new(env.clone()),
        registration: registration.subscribe(),
        mec_service: Arc::new(registration.mec_service()),
    };
    env.attach(registration.clone())
        .await
        .context("Failed to start registration loop")?;

    let app = api::routes::router(app_state);

    // Bind HTTP server
    let listener = tokio::net::TcpListener::bind(&config.api.listen)
        .await
        .with_context(|| format!("Failed to bind to {}", config.api.listen))?;

    tracing::info!("API listening on {}", config.api.listen);

    // Run server with graceful shutdown
    let server_cancel = cancel.clone();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_cancel.cancelled().await })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutdown signal received");

    // Trigger cancellation
    cancel.cancel();

    let _ = server_handle.await;

    // Stop remaining services, subscriptions included
    if let Err(e) = env.shutdown().await {
        tracing::error!("Failed to shutdown environment: {}", e);
    }

    tracing::info!("Registration state at shutdown: {:?}", registration.state());
    tracing::info!("Shutdown complete");
    Ok(())
}

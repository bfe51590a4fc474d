// SPDX-License-Identifier: MIT

//! Eventgate API Server
//!
//! Server-side layer of the event-ticketing platform: session handling,
//! role reconciliation against the identity provider, and resilient
//! proxying to the ticketing backend.

use eventgate::{
    config::Config,
    services::{BackendClient, CallPolicy, HttpIdentityProvider, ProfileReconciler},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Eventgate API");

    // Backend client with the configured retry policy
    let policy = CallPolicy {
        timeout: config.backend_timeout,
        max_retries: config.backend_max_retries,
        ..CallPolicy::default()
    };
    let backend = BackendClient::new(config.backend_api_url.clone(), policy);
    tracing::info!(url = %config.backend_api_url, "Backend client initialized");

    // Identity provider client
    let identity: Arc<dyn eventgate::services::IdentityProvider> = Arc::new(
        HttpIdentityProvider::new(
            config.identity_api_url.clone(),
            config.identity_server_secret.clone(),
        ),
    );
    tracing::info!(url = %config.identity_api_url, "Identity provider client initialized");

    // Profile reconciler ties the two together
    let reconciler = ProfileReconciler::new(backend.clone(), identity.clone());

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        backend,
        identity,
        reconciler,
    });

    // Build router
    let app = eventgate::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("eventgate=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}

//! HTTP server for the Promptgate relay
//!
//! Routes:
//! - `POST /generate` - prompt relay with reply normalization
//! - `POST /models` - generation-capable model listing
//! - `GET /health` - liveness probe
//! - anything else - static files from the configured directory
//!
//! The Basic auth gate wraps every route, static files included.

use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::{GateError, Result};
use crate::provider::GenerativeProvider;

use super::auth::{BasicAuth, require_basic_auth};
use super::handlers::{generate_handler, health_handler, models_handler};

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Full configuration
    pub config: Config,
    /// Generative-language backend
    pub provider: Arc<dyn GenerativeProvider>,
    /// Server-side API key; overrides keys sent by clients
    pub server_credential: Option<String>,
    /// Basic auth gate
    pub auth: BasicAuth,
}

/// The relay server
pub struct GateServer {
    state: Arc<AppState>,
}

impl GateServer {
    pub fn new(
        config: Config,
        provider: Arc<dyn GenerativeProvider>,
        server_credential: Option<String>,
        auth: BasicAuth,
    ) -> Self {
        Self {
            state: Arc::new(AppState {
                config,
                provider,
                server_credential,
                auth,
            }),
        }
    }

    /// Start the server and listen for requests
    pub async fn serve(&self) -> Result<()> {
        let server_config = &self.state.config.server;
        let addr: SocketAddr = server_config
            .listen_addr
            .parse()
            .map_err(|e| GateError::Config(format!("Invalid listen address: {e}")))?;

        tracing::info!("Starting relay server on {addr}");
        tracing::info!("Serving static files from {}", server_config.static_dir.display());
        tracing::info!("Provider: {}", self.state.provider.name());
        if self.state.server_credential.is_some() {
            tracing::info!("Server-side API key configured; client keys are ignored");
        } else {
            tracing::info!("No server-side API key; clients must send apiKey");
        }
        match &self.state.auth {
            BasicAuth::Disabled => tracing::info!("Basic auth: disabled"),
            BasicAuth::Required { .. } => tracing::info!("Basic auth: enabled"),
            BasicAuth::Misconfigured => tracing::warn!(
                "Basic auth: only one of username/password is set, all requests will be refused"
            ),
        }

        let app = create_router(self.state.clone());

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| GateError::Server(format!("Failed to bind to {addr}: {e}")))?;

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| GateError::Server(format!("Server error: {e}")))?;

        tracing::info!("Relay server shut down gracefully");
        Ok(())
    }
}

/// Create the router with all routes configured
pub fn create_router(state: Arc<AppState>) -> Router {
    let static_files = ServeDir::new(&state.config.server.static_dir);

    Router::new()
        .route("/health", get(health_handler))
        .route("/generate", post(generate_handler))
        .route("/models", post(models_handler))
        .fallback_service(static_files)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_basic_auth,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
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
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        },
    }
}

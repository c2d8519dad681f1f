//! Web layer module
//!
//! Thin axum handlers in front of the gateway service.
//!
//! - **Handlers**: `/stream` plus health endpoints
//! - **Responses**: mapping of gateway outcomes onto HTTP
//! - **Extractors**: request context for logging
//! - **Middleware**: request logging

use anyhow::Result;
use axum::{Router, middleware::from_fn, routing::get};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::{
    auth::{AuthContextProvider, BearerTokenProvider},
    config::Config,
    errors::AppResult,
    gateway::{HttpManifestFetcher, StreamGateway},
};

pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod responses;

pub use extractors::RequestContext;
pub use responses::{ApiResponse, HealthResponse};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub gateway: StreamGateway,
    pub auth_provider: Arc<dyn AuthContextProvider>,
    pub start_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    /// Wire the production collaborators described by `config`
    pub fn new(config: Config) -> AppResult<Self> {
        let fetcher = HttpManifestFetcher::new(&config.upstream)?;
        let gateway = StreamGateway::new(config.upstream.media_service_url()?, Arc::new(fetcher));
        let auth_provider = BearerTokenProvider::new(config.auth.session_cookie());

        Ok(Self::with_components(config, gateway, Arc::new(auth_provider)))
    }

    pub fn with_components(
        config: Config,
        gateway: StreamGateway,
        auth_provider: Arc<dyn AuthContextProvider>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            gateway,
            auth_provider,
            start_time: chrono::Utc::now(),
        }
    }
}

/// Build the router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/live", get(handlers::health::liveness_check))
        .route("/stream", get(handlers::stream::stream_manifest))
        .layer(
            ServiceBuilder::new()
                .layer(from_fn(middleware::request_logging_middleware))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Web server configuration and setup
pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(state: AppState) -> Result<Self> {
        let addr: SocketAddr =
            format!("{}:{}", state.config.web.host, state.config.web.port).parse()?;
        let app = create_app(state);

        Ok(Self { app, addr })
    }

    /// Bind, report the bind outcome on `ready_signal`, then serve until
    /// SIGINT/SIGTERM.
    pub async fn serve_with_signal(
        self,
        ready_signal: tokio::sync::oneshot::Sender<Result<()>>,
    ) -> Result<()> {
        match tokio::net::TcpListener::bind(&self.addr).await {
            Ok(listener) => {
                let _ = ready_signal.send(Ok(()));

                axum::serve(listener, self.app)
                    .with_graceful_shutdown(shutdown_signal())
                    .await?;
                Ok(())
            }
            Err(bind_error) => {
                let bind_err_msg = format!("Failed to bind to {}: {}", self.addr, bind_error);
                let _ = ready_signal.send(Err(anyhow::anyhow!("{}", bind_err_msg)));
                Err(anyhow::anyhow!("{}", bind_err_msg))
            }
        }
    }

    /// Get the host address
    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    /// Get the port number
    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {
                        tracing::info!("Received SIGTERM, shutting down gracefully");
                    }
                    _ = sigint.recv() => {
                        tracing::info!("Received SIGINT (Ctrl+C), shutting down gracefully");
                    }
                }
            }
            _ => {
                tracing::warn!("Failed to install signal handlers, falling back to Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl+C, shutting down gracefully");
        }
    }
}

//! HTTP server: the contact endpoint and health check.

mod client_ip;
mod contact;
mod state;

pub use client_ip::{client_identifier, UNKNOWN_CLIENT};
pub use contact::{
    format_reset_time, method_not_allowed, submit_contact, too_many_requests, X_RATELIMIT_LIMIT,
    X_RATELIMIT_REMAINING, X_RATELIMIT_RESET,
};
pub use state::AppState;

use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::error::{GlyphgateError, Result};

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/contact", post(submit_contact).get(method_not_allowed))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// HTTP server for the contact service.
pub struct HttpServer {
    /// Address to bind to
    addr: SocketAddr,
    /// Handler state
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new(addr: SocketAddr, state: AppState) -> Self {
        Self { addr, state }
    }

    /// Start the HTTP server with graceful shutdown.
    ///
    /// The server will shut down when the provided signal resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        info!(addr = %local_addr, "Starting HTTP server for contact service");

        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(signal)
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP server failed");
                GlyphgateError::Io(e)
            })
    }
}

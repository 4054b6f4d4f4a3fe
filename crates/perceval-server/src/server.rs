//! Leaderboard HTTP server lifecycle.
//!
//! [`start_server`] binds a TCP port and serves the router until the
//! shutdown signal flips.

use std::net::SocketAddr;
use std::sync::Arc;

use perceval_core::submission::SubmissionLog;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

use crate::router::build_router;
use crate::state::AppState;

/// Listen address of the leaderboard server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The host address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// The TCP port to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::from("0.0.0.0"),
            port: 5000,
        }
    }
}

impl ServerConfig {
    /// Parse the configured host and port into a socket address.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address is malformed.
    pub fn socket_addr(&self) -> Result<SocketAddr, ServerError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ServerError::Bind(format!("invalid address: {e}")))
    }
}

/// Bind the configured address.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if the address is malformed or taken.
pub async fn bind(config: &ServerConfig) -> Result<TcpListener, ServerError> {
    let addr = config.socket_addr()?;
    TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind(format!("bind failed on {addr}: {e}")))
}

/// Serve the leaderboard on an already bound listener until `shutdown`
/// turns `true` or its sender is dropped.
///
/// # Errors
///
/// Returns [`ServerError::Serve`] on a fatal I/O error.
pub async fn serve<L: SubmissionLog>(
    listener: TcpListener,
    state: Arc<AppState<L>>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), ServerError> {
    let router = build_router(state);
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "Leaderboard server listening");
    }

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            // An error means the sender is gone, which also ends serving.
            let _ = shutdown.wait_for(|stop| *stop).await;
        })
        .await
        .map_err(|e| ServerError::Serve(format!("serve error: {e}")))?;

    info!("Leaderboard server stopped");
    Ok(())
}

/// Bind and serve in one call.
///
/// # Errors
///
/// Returns an error if binding or serving fails.
pub async fn start_server<L: SubmissionLog>(
    config: &ServerConfig,
    state: Arc<AppState<L>>,
    shutdown: watch::Receiver<bool>,
) -> Result<(), ServerError> {
    let listener = bind(config).await?;
    serve(listener, state, shutdown).await
}

/// Errors that can occur when starting or running the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to the network address.
    #[error("bind error: {0}")]
    Bind(String),

    /// The server encountered a fatal error while serving.
    #[error("serve error: {0}")]
    Serve(String),
}

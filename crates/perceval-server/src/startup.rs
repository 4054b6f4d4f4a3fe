//! Background startup helper for the engine binary.
//!
//! [`spawn_server`] binds eagerly, so a port conflict fails startup
//! instead of surfacing later from a background task, then serves on a
//! Tokio task alongside the tick loop.

use std::net::SocketAddr;
use std::sync::Arc;

use perceval_core::submission::SubmissionLog;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::server::{self, ServerConfig, ServerError};
use crate::state::AppState;

/// A server running on a background task.
#[derive(Debug)]
pub struct SpawnedServer {
    /// The address actually bound (useful with port 0).
    pub addr: SocketAddr,
    /// Task serving requests until shutdown.
    pub handle: JoinHandle<()>,
}

/// Bind `config` and serve the leaderboard on a background task.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if the address cannot be bound.
pub async fn spawn_server<L: SubmissionLog>(
    config: &ServerConfig,
    state: Arc<AppState<L>>,
    shutdown: watch::Receiver<bool>,
) -> Result<SpawnedServer, ServerError> {
    let listener = server::bind(config).await?;
    let addr = listener
        .local_addr()
        .map_err(|e| ServerError::Bind(format!("no local address: {e}")))?;

    let handle = tokio::spawn(async move {
        if let Err(e) = server::serve(listener, state, shutdown).await {
            tracing::error!(error = %e, "Leaderboard server exited with error");
        }
    });

    tracing::info!(%addr, "Leaderboard server spawned on background task");
    Ok(SpawnedServer { addr, handle })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use perceval_core::clock::ManualTimeSource;
    use perceval_core::competition::CompetitionHandle;
    use perceval_core::config::PercevalConfig;
    use perceval_core::submission::MemorySubmissionLog;

    use super::*;

    #[tokio::test]
    async fn serves_until_shutdown() {
        let time = Arc::new(ManualTimeSource::default());
        let competition = CompetitionHandle::from_config(
            &PercevalConfig::default(),
            time,
            Arc::new(MemorySubmissionLog::default()),
        )
        .unwrap();
        let state = Arc::new(AppState::new(competition));
        let (tx, rx) = watch::channel(false);
        let config = ServerConfig {
            host: "127.0.0.1".to_owned(),
            port: 0,
        };

        let spawned = spawn_server(&config, state, rx).await.unwrap();
        assert_ne!(spawned.addr.port(), 0);

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), spawned.handle)
            .await
            .unwrap()
            .unwrap();
    }
}

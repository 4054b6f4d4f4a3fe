//! Competition server binary for Perceval.
//!
//! Wires the competition core to its submission log, the leaderboard
//! server, and the periodic tasks, then runs until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `PERCEVAL_CONFIG` (default `perceval-config.yaml`)
//!    and apply environment overrides to a runtime copy
//! 3. Open the submission log (`PostgreSQL` when a database URL is set,
//!    in memory otherwise)
//! 4. Build the competition handle on the system clock
//! 5. Start the leaderboard server on a background task
//! 6. Start the roster saver on a background task
//! 7. Run the tick loop until shutdown

mod broadcast_callback;
mod error;
mod roster_saver;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use perceval_core::clock::SystemTimeSource;
use perceval_core::competition::CompetitionHandle;
use perceval_core::config::PercevalConfig;
use perceval_core::runner;
use perceval_core::submission::{MemorySubmissionLog, SubmissionLog};
use perceval_db::{Database, PoolSettings};
use perceval_server::{AppState, ServerConfig};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::broadcast_callback::BroadcastCallback;
use crate::error::EngineError;
use crate::roster_saver::{RosterSaver, run_roster_saver};

/// Configuration file used when `PERCEVAL_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "perceval-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if any initialization step or the tick loop fails.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("perceval-engine starting");

    let path = std::env::var("PERCEVAL_CONFIG")
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let document = load_document(&path)?;
    let config = document.with_env_overrides();
    info!(
        rounds = config.rounds_config.rounds.len(),
        groups = config.group_configs.len(),
        seed = config.rounds_config.seed,
        tick_interval_ms = config.server.tick_interval_ms,
        "Configuration loaded"
    );
    let saver = RosterSaver::new(document, path);

    let (tx, rx) = watch::channel(false);
    spawn_signal_handler(tx);

    match PoolSettings::from_server(&config.server) {
        Some(settings) => {
            let database = Database::open(&settings).await.map_err(EngineError::from)?;
            let log = database.submission_log(config.rounds_config.seed);
            info!("Submission log: PostgreSQL");
            let result = run(config, saver, Arc::new(log), rx).await;
            database.close().await;
            result?;
        }
        None => {
            info!("Submission log: in memory (submissions are lost on exit)");
            run(config, saver, Arc::new(MemorySubmissionLog::new()), rx).await?;
        }
    }

    info!("perceval-engine shutdown complete");
    Ok(())
}

/// Run the competition on `log` until `shutdown` flips.
///
/// `config` is the runtime view, environment overrides included; `saver`
/// holds the document as written on disk.
async fn run<L: SubmissionLog>(
    config: PercevalConfig,
    saver: RosterSaver,
    log: Arc<L>,
    shutdown: watch::Receiver<bool>,
) -> Result<(), EngineError> {
    let handle = CompetitionHandle::from_config(&config, Arc::new(SystemTimeSource::new()), log)?;

    let state = Arc::new(
        AppState::new(handle.clone())
            .with_disqualify_outside_window(config.server.disqualify_outside_window),
    );
    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };
    let server =
        perceval_server::spawn_server(&server_config, Arc::clone(&state), shutdown.clone())
            .await?;
    info!(addr = %server.addr, "Leaderboard server started");

    let tick_interval = Duration::from_millis(config.server.tick_interval_ms);
    let save_interval = Duration::from_millis(config.server.save_interval_ms);
    let saver = tokio::spawn(run_roster_saver(
        saver,
        handle.clone(),
        save_interval,
        shutdown.clone(),
    ));

    let mut callback = BroadcastCallback::new(state);
    let ticks = runner::run_ticker(&handle, &mut callback, tick_interval, shutdown).await?;
    info!(ticks, "Tick loop stopped");

    if let Err(e) = saver.await {
        warn!(error = %e, "Roster saver task failed");
    }
    if let Err(e) = server.handle.await {
        warn!(error = %e, "Leaderboard server task failed");
    }
    Ok(())
}

/// Load the configuration document as written, falling back to defaults
/// when the file does not exist.
fn load_document(path: &Path) -> Result<PercevalConfig, EngineError> {
    if path.exists() {
        Ok(PercevalConfig::from_file(path)?)
    } else {
        info!(path = %path.display(), "Config file not found, using defaults");
        Ok(PercevalConfig::default())
    }
}

/// Flip the shutdown channel on `Ctrl-C`.
fn spawn_signal_handler(tx: watch::Sender<bool>) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received");
                let _ = tx.send(true);
            }
            Err(e) => {
                warn!(error = %e, "Cannot listen for Ctrl-C, running until killed");
                // Dropping the sender would stop every task.
                std::future::pending::<()>().await;
            }
        }
    });
}

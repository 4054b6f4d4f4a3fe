//! Periodic tick loop.
//!
//! [`run_ticker`] drives [`CompetitionHandle::tick`] at a fixed interval
//! and hands every outcome to a [`TickCallback`]. Missed ticks are skipped
//! rather than bursted: the position is recomputed from absolute clock time
//! on every tick, so catching up would only repeat work.
//!
//! The loop ends when the shutdown channel flips to `true` (or its sender
//! is dropped). A state inconsistency ends it with an error; log failures
//! are logged and retried on the next tick.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::competition::{CompetitionError, CompetitionHandle, TickOutcome};
use crate::rounds::{RoundError, Transition};
use crate::submission::SubmissionLog;

/// Smallest accepted tick interval.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Errors that stop the tick loop.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The round state became inconsistent.
    #[error("round state error: {source}")]
    Round {
        /// The underlying state error.
        #[from]
        source: RoundError,
    },
}

/// Callback invoked after each successful tick.
///
/// Implementations typically push the public status to subscribers.
pub trait TickCallback: Send {
    /// Called after a tick completes successfully.
    fn on_tick(&mut self, outcome: &TickOutcome);
}

/// A no-op tick callback for testing.
pub struct NoOpCallback;

impl TickCallback for NoOpCallback {
    fn on_tick(&mut self, _outcome: &TickOutcome) {}
}

/// Run the tick loop until shutdown is requested.
///
/// Returns the number of successful ticks.
///
/// # Errors
///
/// Returns [`RunnerError::Round`] if the round state becomes inconsistent.
pub async fn run_ticker<L: SubmissionLog>(
    handle: &CompetitionHandle<L>,
    callback: &mut dyn TickCallback,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> Result<u64, RunnerError> {
    let mut ticker = tokio::time::interval(interval.max(MIN_INTERVAL));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut ticks: u64 = 0;

    info!(interval_ms = interval.as_millis(), "Ticker starting");

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            _ = ticker.tick() => {}
        }

        match handle.tick().await {
            Ok(outcome) => {
                ticks = ticks.saturating_add(1);
                log_transition(&outcome);
                callback.on_tick(&outcome);
            }
            Err(CompetitionError::Round { source }) => {
                error!(error = %source, "Round state inconsistency, stopping ticker");
                return Err(RunnerError::Round { source });
            }
            Err(err) => {
                warn!(error = %err, "Tick failed, retrying on next interval");
            }
        }
    }

    info!(ticks, "Ticker stopped");
    Ok(ticks)
}

fn log_transition(outcome: &TickOutcome) {
    let position = outcome.resolution.position;
    match outcome.resolution.transition {
        Some(Transition::RoundAdvanced { from, to }) => {
            info!(from, to, lap = position.lap, "Tick crossed a round boundary");
        }
        Some(Transition::Finished) => {
            info!(round = position.round, lap = position.lap, "Tick finished the competition");
        }
        Some(Transition::Restarted) => info!("Tick restarted the competition"),
        None => {}
    }
}

//! Periodic persistence of roster edits.
//!
//! Admin routes mutate the roster in memory and raise a "needs save" flag.
//! [`run_roster_saver`] checks the flag on its own slower interval and
//! writes the whole configuration document back to disk. A failed write
//! puts the flag back so the next pass retries.
//!
//! The saver keeps its own copy of the document as loaded, before any
//! environment override, and only ever replaces its roster.

use std::path::PathBuf;
use std::time::Duration;

use perceval_core::competition::CompetitionHandle;
use perceval_core::config::PercevalConfig;
use perceval_core::submission::SubmissionLog;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

/// Where and how the roster is written.
#[derive(Debug, Clone)]
pub struct RosterSaver {
    document: PercevalConfig,
    path: PathBuf,
}

impl RosterSaver {
    /// Save rosters into `document` and write it to `path`.
    ///
    /// `document` must be the configuration as read from disk, not the
    /// runtime copy carrying environment overrides.
    pub const fn new(document: PercevalConfig, path: PathBuf) -> Self {
        Self { document, path }
    }

    /// Write the roster if it changed since the last save.
    ///
    /// Returns whether a write happened.
    pub async fn save_if_dirty<L: SubmissionLog>(
        &mut self,
        handle: &CompetitionHandle<L>,
    ) -> bool {
        let Some(groups) = handle.take_dirty_roster().await else {
            return false;
        };
        let count = groups.len();
        self.document.group_configs = groups;
        match self.document.save_to(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), groups = count, "Roster saved");
                true
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Roster save failed, will retry");
                handle.mark_roster_dirty().await;
                false
            }
        }
    }
}

/// Run the save loop until shutdown, then flush one last time.
pub async fn run_roster_saver<L: SubmissionLog>(
    mut saver: RosterSaver,
    handle: CompetitionHandle<L>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                saver.save_if_dirty(&handle).await;
            }
        }
    }

    saver.save_if_dirty(&handle).await;
}

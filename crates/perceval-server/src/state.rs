//! Shared application state for the leaderboard API server.
//!
//! [`AppState`] holds the competition handle, the broadcast channel for
//! leaderboard snapshots, the page templates, and the request policy.

use std::sync::Arc;

use minijinja::Environment;
use perceval_core::competition::CompetitionHandle;
use perceval_core::submission::SubmissionLog;
use perceval_types::LeaderboardStatus;
use tokio::sync::broadcast;

use crate::pages;

/// Capacity of the broadcast channel for leaderboard snapshots.
///
/// A subscriber that falls behind by more than this many messages
/// receives a [`broadcast::error::RecvError::Lagged`] and skips to the
/// newest snapshot.
const BROADCAST_CAPACITY: usize = 256;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
pub struct AppState<L> {
    /// The running competition.
    pub competition: CompetitionHandle<L>,
    /// Broadcast sender for public leaderboard snapshots.
    pub tx: broadcast::Sender<LeaderboardStatus>,
    /// Page templates.
    pub pages: Environment<'static>,
    /// Store guesses made outside the cue window as disqualified.
    pub disqualify_outside_window: bool,
}

impl<L: SubmissionLog> AppState<L> {
    /// Create the application state around a competition.
    pub fn new(competition: CompetitionHandle<L>) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            competition,
            tx,
            pages: pages::environment(),
            disqualify_outside_window: false,
        }
    }

    /// Set the outside-window submission policy.
    #[must_use]
    pub const fn with_disqualify_outside_window(mut self, enabled: bool) -> Self {
        self.disqualify_outside_window = enabled;
        self
    }

    /// Subscribe to the leaderboard broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<LeaderboardStatus> {
        self.tx.subscribe()
    }

    /// Publish a leaderboard snapshot to all connected clients.
    ///
    /// Returns the number of receivers that got the message; 0 when no
    /// client is connected, which is not an error.
    pub fn broadcast(&self, status: &LeaderboardStatus) -> usize {
        self.tx.send(status.clone()).unwrap_or(0)
    }
}

/// Convenience alias for the state as held by the router.
pub type SharedState<L> = Arc<AppState<L>>;

//! Tick callback that pushes the public leaderboard to `WebSocket` clients.

use std::sync::Arc;

use perceval_core::competition::TickOutcome;
use perceval_core::runner::TickCallback;
use perceval_core::submission::SubmissionLog;
use perceval_server::AppState;
use tracing::debug;

/// Callback that bridges the tick loop to the leaderboard server.
pub struct BroadcastCallback<L> {
    state: Arc<AppState<L>>,
}

impl<L> BroadcastCallback<L> {
    /// Create a callback publishing through `state`.
    pub const fn new(state: Arc<AppState<L>>) -> Self {
        Self { state }
    }
}

impl<L: SubmissionLog> TickCallback for BroadcastCallback<L> {
    fn on_tick(&mut self, outcome: &TickOutcome) {
        let receivers = self.state.broadcast(&outcome.status);
        debug!(
            round = outcome.status.current_round,
            lap = outcome.status.current_lap,
            receivers,
            "Leaderboard broadcast sent"
        );
    }
}

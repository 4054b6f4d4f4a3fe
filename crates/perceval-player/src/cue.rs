//! Cue output.
//!
//! Audio devices are out of reach of this client. [`CuePlayer`] is the
//! seam where a real output would plug in; [`LoggingCuePlayer`] records
//! the cue in the log instead.

use perceval_types::Guess;
use tracing::info;

/// Something that can play the cue of a category.
pub trait CuePlayer: Send {
    /// Start playing the cue for `guess`. Must not block for the cue's
    /// duration.
    fn play(&mut self, guess: Guess);
}

/// Cue player that only logs.
#[derive(Debug, Default)]
pub struct LoggingCuePlayer {
    played: u64,
}

impl LoggingCuePlayer {
    /// Number of cues played so far.
    pub const fn played(&self) -> u64 {
        self.played
    }
}

impl CuePlayer for LoggingCuePlayer {
    fn play(&mut self, guess: Guess) {
        self.played = self.played.saturating_add(1);
        info!(category = %guess, count = self.played, "Playing cue now");
    }
}

//! Leaderboard and submission payloads.
//!
//! These structs are the shapes exchanged with polling clients and stored
//! in the submission log. Scores use [`Decimal`] so that half-point
//! penalties never accumulate floating-point drift; they are serialized as
//! plain JSON numbers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::Guess;
use crate::ids::GroupKey;

/// A group's effective answer for one lap, as rendered on the leaderboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Answer {
    /// The effective guess for the lap (or a meta-value).
    pub guess: Guess,
    /// Whether the lap counted as correct.
    pub correct: bool,
    /// Whether clients must hide this entry (lap not yet played).
    pub hide: bool,
}

/// One leaderboard row: a group and its per-lap answers for the current round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LeaderboardRow {
    /// Display name of the group.
    pub name: String,
    /// One entry per lap of the current round.
    pub answers: Vec<Answer>,
    /// Cumulative score for the current round.
    #[serde(with = "rust_decimal::serde::float")]
    #[ts(type = "number")]
    pub score: Decimal,
}

/// Full competition status returned to polling clients and pushed to
/// leaderboard subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(deny_unknown_fields)]
#[ts(export, export_to = "bindings/")]
pub struct LeaderboardStatus {
    /// Correct category of the current lap. Only present for admin callers.
    pub current_correct_guess: Option<Guess>,
    /// Zero-based index of the current round.
    pub current_round: usize,
    /// Zero-based index of the current lap within the round.
    pub current_lap: usize,
    /// Total number of rounds.
    pub number_of_rounds: usize,
    /// Number of laps in the current round.
    pub number_of_laps: usize,
    /// Whether the competition clock is paused.
    pub paused: bool,
    /// Seconds until the next lap starts (0 once finished).
    pub time_before_next_lap: f64,
    /// Seconds until the cue plays in the current lap. Negative once the
    /// cue start has passed; `-1` once the competition is finished.
    pub time_before_playing: f64,
    /// Whether guesses made right now fall inside the cue window.
    pub accepts_submissions: bool,
    /// Whether the last lap of the last round has elapsed.
    pub finished: bool,
    /// One row per registered group, in roster order.
    pub leaderboard: Vec<LeaderboardRow>,
}

/// Response to a group existence check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GroupCheck {
    /// Whether the group holds administrative rights.
    pub admin: bool,
}

/// A submission about to be appended to the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSubmission {
    /// Key of the submitting group.
    pub key: GroupKey,
    /// Round the submission was made in.
    pub round: usize,
    /// Lap the submission was made in.
    pub lap: usize,
    /// The guessed category.
    pub guess: Guess,
    /// Whether the submission disqualifies the slot.
    pub disqualified: bool,
}

/// A submission as stored in the log. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Submission {
    /// Insertion sequence number, used to break timestamp ties.
    #[ts(type = "number")]
    pub sequence: u64,
    /// When the submission was appended.
    pub timestamp: DateTime<Utc>,
    /// Key of the submitting group.
    pub key: GroupKey,
    /// Round the submission was made in.
    pub round: usize,
    /// Lap the submission was made in.
    pub lap: usize,
    /// The guessed category.
    pub guess: Guess,
    /// Whether the submission disqualifies the slot.
    pub disqualified: bool,
}

impl Submission {
    /// Ordering key: oldest timestamp first, ties broken by insertion order.
    pub const fn order_key(&self) -> (DateTime<Utc>, u64) {
        (self.timestamp, self.sequence)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn score_serializes_as_number() {
        let row = LeaderboardRow {
            name: "team".to_owned(),
            answers: vec![Answer {
                guess: Guess::Nothing,
                correct: false,
                hide: true,
            }],
            score: Decimal::new(-5, 1),
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["score"], serde_json::json!(-0.5));
        assert_eq!(json["answers"][0]["guess"], "none");
        assert_eq!(json["answers"][0]["hide"], true);
    }

    #[test]
    fn hidden_correct_guess_serializes_as_null() {
        let status = LeaderboardStatus {
            current_correct_guess: None,
            current_round: 0,
            current_lap: 0,
            number_of_rounds: 1,
            number_of_laps: 3,
            paused: true,
            time_before_next_lap: 10.0,
            time_before_playing: 2.5,
            accepts_submissions: false,
            finished: false,
            leaderboard: Vec::new(),
        };
        let json = serde_json::to_value(&status).unwrap();
        assert!(json["current_correct_guess"].is_null());
        let back: LeaderboardStatus = serde_json::from_value(json).unwrap();
        assert_eq!(back, status);
    }
}

//! Scoring engine.
//!
//! [`score_round`] is a pure function from a [`RoundSnapshot`], the roster,
//! and the submissions of the current round to one [`LeaderboardRow`] per
//! group, in roster order.
//!
//! Rules, per `(group, lap)` slot:
//!
//! - The oldest submission of the slot is the effective guess. Later
//!   submissions never override it.
//! - A slot holding any disqualified submission renders as
//!   [`Guess::Disqualified`] and costs half a point.
//! - In a presence-only round any submitted category renders as
//!   [`Guess::Received`] and is correct.
//! - Otherwise a slot is correct when the effective guess equals the lap's
//!   answer, which earns one point.
//! - Laps after the current lap are flagged hidden.

use std::collections::BTreeMap;

use perceval_types::{Answer, Guess, LeaderboardRow, Submission};
use rust_decimal::Decimal;

use crate::config::GroupConfig;
use crate::rounds::RoundSnapshot;

/// Points for a correct lap.
const CORRECT_POINTS: Decimal = Decimal::ONE;

/// Points for a disqualified lap (minus one half).
const DISQUALIFIED_POINTS: Decimal = Decimal::from_parts(5, 0, 0, true, 1);

/// The effective content of one `(group, lap)` slot.
#[derive(Debug, Clone, Copy)]
struct Slot<'a> {
    first: &'a Submission,
    disqualified: bool,
}

/// Compute the leaderboard of the snapshot's round.
///
/// Submissions from other rounds are ignored, as are submissions from keys
/// that are not in `groups`.
pub fn score_round(
    snapshot: &RoundSnapshot,
    groups: &[GroupConfig],
    submissions: &[Submission],
) -> Vec<LeaderboardRow> {
    let round = snapshot.position.round;
    let mut slots: BTreeMap<(&str, usize), Slot<'_>> = BTreeMap::new();

    for submission in submissions.iter().filter(|s| s.round == round) {
        slots
            .entry((submission.key.as_str(), submission.lap))
            .and_modify(|slot| {
                if submission.order_key() < slot.first.order_key() {
                    slot.first = submission;
                }
                slot.disqualified |= submission.disqualified;
            })
            .or_insert(Slot {
                first: submission,
                disqualified: submission.disqualified,
            });
    }

    groups
        .iter()
        .map(|group| {
            let mut score = Decimal::ZERO;
            let answers = (0..snapshot.number_of_laps)
                .map(|lap| {
                    let (answer, points) = score_slot(
                        slots.get(&(group.key.as_str(), lap)),
                        snapshot.answers.get(lap).copied(),
                        snapshot.presence_only,
                    );
                    score = score.saturating_add(points);
                    Answer {
                        hide: lap > snapshot.position.lap,
                        ..answer
                    }
                })
                .collect();
            LeaderboardRow {
                name: group.name.clone(),
                answers,
                score,
            }
        })
        .collect()
}

/// Render one slot and the points it contributes.
fn score_slot(
    slot: Option<&Slot<'_>>,
    truth: Option<Guess>,
    presence_only: bool,
) -> (Answer, Decimal) {
    let Some(slot) = slot else {
        return (miss(Guess::Nothing), Decimal::ZERO);
    };

    if slot.disqualified {
        return (miss(Guess::Disqualified), DISQUALIFIED_POINTS);
    }

    let guess = slot.first.guess;
    if presence_only {
        if guess == Guess::Nothing {
            return (miss(Guess::Nothing), Decimal::ZERO);
        }
        return (hit(Guess::Received), CORRECT_POINTS);
    }

    if truth == Some(guess) {
        (hit(guess), CORRECT_POINTS)
    } else {
        (miss(guess), Decimal::ZERO)
    }
}

const fn hit(guess: Guess) -> Answer {
    Answer {
        guess,
        correct: true,
        hide: false,
    }
}

const fn miss(guess: Guess) -> Answer {
    Answer {
        guess,
        correct: false,
        hide: false,
    }
}

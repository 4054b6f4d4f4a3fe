//! Seeded answer schedule.
//!
//! For every lap of every round the schedule fixes the category to play and
//! the offset, from the lap start, at which the cue starts. All answers are
//! drawn first (round by round, lap by lap), then all offsets in the same
//! order, so the schedule is a pure function of the seeded generator state.
//!
//! Offsets are drawn uniformly in `[pre_delay, pre_delay + (lap - overhead))`,
//! which guarantees that the cue plus the latency margin and the post delay
//! always fit before the lap ends.

use std::time::Duration;

use perceval_types::Guess;
use rand::Rng;
use rand::rngs::StdRng;

use crate::timing::CompetitionSpec;

/// The cue planned for one lap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LapPlan {
    /// Category played during the lap.
    pub answer: Guess,
    /// Offset of the cue start from the lap start.
    pub offset: Duration,
}

/// Per-round, per-lap plans for a whole competition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    rounds: Vec<Vec<LapPlan>>,
}

impl Schedule {
    /// Draw a fresh schedule for `spec` from `rng`.
    pub fn generate(spec: &CompetitionSpec, rng: &mut StdRng) -> Self {
        let guessable = Guess::GUESSABLE.len();

        let answers: Vec<Vec<Guess>> = spec
            .rounds()
            .iter()
            .map(|round| {
                (0..round.lap_count())
                    .map(|_| Guess::guessable_from_index(rng.random_range(0..guessable)))
                    .collect()
            })
            .collect();

        let timing = spec.timing();
        let rounds = spec
            .rounds()
            .iter()
            .zip(answers)
            .map(|(round, answers)| {
                let spread = round.lap_duration().saturating_sub(timing.overhead());
                answers
                    .into_iter()
                    .map(|answer| LapPlan {
                        answer,
                        offset: timing
                            .pre_delay
                            .saturating_add(spread.mul_f64(rng.random::<f64>())),
                    })
                    .collect()
            })
            .collect();

        Self { rounds }
    }

    /// Plan of `lap` in `round`, if both exist.
    pub fn lap(&self, round: usize, lap: usize) -> Option<LapPlan> {
        self.rounds.get(round)?.get(lap).copied()
    }

    /// All lap plans of `round`.
    pub fn round(&self, round: usize) -> Option<&[LapPlan]> {
        self.rounds.get(round).map(Vec::as_slice)
    }

    /// Answers of `round`, in lap order.
    pub fn answers(&self, round: usize) -> Option<Vec<Guess>> {
        self.round(round)
            .map(|plans| plans.iter().map(|plan| plan.answer).collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::timing::{CompetitionFlags, RoundSpec, Timing};

    fn spec() -> CompetitionSpec {
        CompetitionSpec::new(
            vec![
                RoundSpec::new(4, Duration::from_secs(13), true),
                RoundSpec::new(20, Duration::from_secs(13), false),
                RoundSpec::new(6, Duration::from_secs(9), false),
            ],
            Timing {
                latency_margin: Duration::from_secs(1),
                pre_delay: Duration::from_secs(2),
                post_delay: Duration::from_secs(1),
                cue_duration: Duration::from_secs(5),
            },
            CompetitionFlags::default(),
            1234,
        )
        .unwrap()
    }

    #[test]
    fn same_seed_same_schedule() {
        let spec = spec();
        let a = Schedule::generate(&spec, &mut StdRng::seed_from_u64(spec.seed()));
        let b = Schedule::generate(&spec, &mut StdRng::seed_from_u64(spec.seed()));
        assert_eq!(a, b);
    }

    #[test]
    fn consecutive_draws_differ() {
        let spec = spec();
        let mut rng = StdRng::seed_from_u64(spec.seed());
        let first = Schedule::generate(&spec, &mut rng);
        let second = Schedule::generate(&spec, &mut rng);
        assert_ne!(first, second);
    }

    #[test]
    fn shape_matches_rounds() {
        let spec = spec();
        let schedule = Schedule::generate(&spec, &mut StdRng::seed_from_u64(1));
        for (index, round) in spec.rounds().iter().enumerate() {
            assert_eq!(schedule.round(index).unwrap().len(), round.lap_count());
        }
        assert!(schedule.round(3).is_none());
        assert!(schedule.lap(1, 20).is_none());
    }

    #[test]
    fn answers_are_guessable_and_offsets_fit() {
        let spec = spec();
        let timing = *spec.timing();
        let schedule = Schedule::generate(&spec, &mut StdRng::seed_from_u64(99));
        for (index, round) in spec.rounds().iter().enumerate() {
            for plan in schedule.round(index).unwrap() {
                assert!(plan.answer.is_guessable());
                assert!(plan.offset >= timing.pre_delay);
                let cue_end = plan.offset + timing.submission_window() + timing.post_delay;
                assert!(cue_end <= round.lap_duration());
            }
        }
    }

    #[test]
    fn tight_laps_play_at_pre_delay() {
        let spec = spec();
        let schedule = Schedule::generate(&spec, &mut StdRng::seed_from_u64(5));
        for plan in schedule.round(2).unwrap() {
            assert_eq!(plan.offset, Duration::from_secs(2));
        }
    }
}

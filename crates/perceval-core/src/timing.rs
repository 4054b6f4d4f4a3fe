//! Validated timing model of a competition.
//!
//! [`CompetitionSpec`] is the construction-time-checked form of the
//! `rounds_config` section of the configuration document. Once built, every
//! round is guaranteed to leave room for a cue inside each lap:
//!
//! ```text
//! lap_duration >= latency_margin + pre_delay + post_delay + cue_duration
//! ```
//!
//! Equality is allowed: the play-offset range then degenerates to the
//! single point `pre_delay`.

use std::time::Duration;

/// Errors detected while building a [`CompetitionSpec`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimingError {
    /// The competition has no rounds.
    #[error("at least one round must be configured")]
    NoRounds,

    /// A round has zero laps.
    #[error("round {round} must have at least one lap")]
    NoLaps {
        /// Zero-based round index.
        round: usize,
    },

    /// A duration is zero, negative, or not a finite number of seconds.
    #[error("{field} must be a positive finite number of seconds, got {value}")]
    InvalidDuration {
        /// Name of the offending field.
        field: &'static str,
        /// Raw configured value, rendered for diagnostics.
        value: String,
    },

    /// A lap is too short to fit the cue and its surrounding delays.
    #[error(
        "lap duration of round {round} is not long enough: {lap_duration:?} is shorter than {overhead:?}"
    )]
    LapTooShort {
        /// Zero-based round index.
        round: usize,
        /// Configured lap duration.
        lap_duration: Duration,
        /// Total fixed overhead per lap.
        overhead: Duration,
    },
}

/// Timing constants shared by every round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Extra time after the cue during which guesses are still accepted.
    pub latency_margin: Duration,
    /// Minimum delay between lap start and cue start.
    pub pre_delay: Duration,
    /// Minimum silence after the cue before the lap ends.
    pub post_delay: Duration,
    /// Duration of the cue itself.
    pub cue_duration: Duration,
}

impl Timing {
    /// Total fixed overhead of a lap:
    /// `latency_margin + pre_delay + post_delay + cue_duration`.
    pub const fn overhead(&self) -> Duration {
        self.latency_margin
            .saturating_add(self.pre_delay)
            .saturating_add(self.post_delay)
            .saturating_add(self.cue_duration)
    }

    /// Length of the window during which guesses are accepted, measured
    /// from the cue start: `cue_duration + latency_margin`.
    pub const fn submission_window(&self) -> Duration {
        self.cue_duration.saturating_add(self.latency_margin)
    }
}

/// Static description of one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundSpec {
    lap_count: usize,
    lap_duration: Duration,
    presence_only: bool,
}

impl RoundSpec {
    /// Create a round description. Checked against the shared [`Timing`]
    /// when assembled into a [`CompetitionSpec`].
    pub const fn new(lap_count: usize, lap_duration: Duration, presence_only: bool) -> Self {
        Self {
            lap_count,
            lap_duration,
            presence_only,
        }
    }

    /// Number of laps in the round.
    pub const fn lap_count(&self) -> usize {
        self.lap_count
    }

    /// Duration of each lap.
    pub const fn lap_duration(&self) -> Duration {
        self.lap_duration
    }

    /// Whether any guess counts as correct in this round.
    pub const fn presence_only(&self) -> bool {
        self.presence_only
    }
}

/// Competition flags that do not affect timing feasibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct CompetitionFlags {
    /// Start (and restart) with the clock paused.
    pub start_paused: bool,
    /// Pause the clock whenever a new round begins.
    pub pause_between_rounds: bool,
    /// Restart from the first round once the last round is over.
    pub restart_when_finished: bool,
}

/// Validated description of a whole competition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompetitionSpec {
    rounds: Vec<RoundSpec>,
    timing: Timing,
    flags: CompetitionFlags,
    seed: u64,
}

impl CompetitionSpec {
    /// Assemble and validate a competition description.
    ///
    /// # Errors
    ///
    /// Returns [`TimingError`] if there are no rounds, a round has no laps,
    /// a duration is zero, or a lap cannot fit the fixed overhead.
    pub fn new(
        rounds: Vec<RoundSpec>,
        timing: Timing,
        flags: CompetitionFlags,
        seed: u64,
    ) -> Result<Self, TimingError> {
        if rounds.is_empty() {
            return Err(TimingError::NoRounds);
        }

        for (field, value) in [
            ("latency_margin", timing.latency_margin),
            ("delay_before_playing", timing.pre_delay),
            ("delay_after_playing", timing.post_delay),
            ("sound_duration", timing.cue_duration),
        ] {
            if value.is_zero() {
                return Err(TimingError::InvalidDuration {
                    field,
                    value: format!("{value:?}"),
                });
            }
        }

        let overhead = timing.overhead();
        for (round, spec) in rounds.iter().enumerate() {
            if spec.lap_count == 0 {
                return Err(TimingError::NoLaps { round });
            }
            if spec.lap_duration.is_zero() {
                return Err(TimingError::InvalidDuration {
                    field: "lap_duration",
                    value: format!("{:?}", spec.lap_duration),
                });
            }
            if spec.lap_duration < overhead {
                return Err(TimingError::LapTooShort {
                    round,
                    lap_duration: spec.lap_duration,
                    overhead,
                });
            }
        }

        Ok(Self {
            rounds,
            timing,
            flags,
            seed,
        })
    }

    /// All rounds, in play order.
    pub fn rounds(&self) -> &[RoundSpec] {
        &self.rounds
    }

    /// Description of the round at `index`, if any.
    pub fn round(&self, index: usize) -> Option<&RoundSpec> {
        self.rounds.get(index)
    }

    /// Number of rounds.
    pub fn round_count(&self) -> usize {
        self.rounds.len()
    }

    /// Shared timing constants.
    pub const fn timing(&self) -> &Timing {
        &self.timing
    }

    /// Behavioural flags.
    pub const fn flags(&self) -> CompetitionFlags {
        self.flags
    }

    /// Seed fixing all derived randomness.
    pub const fn seed(&self) -> u64 {
        self.seed
    }
}

/// Convert a configured number of seconds into a positive [`Duration`].
///
/// # Errors
///
/// Returns [`TimingError::InvalidDuration`] for zero, negative, or
/// non-finite values.
pub fn positive_secs(field: &'static str, secs: f64) -> Result<Duration, TimingError> {
    match Duration::try_from_secs_f64(secs) {
        Ok(duration) if !duration.is_zero() => Ok(duration),
        _ => Err(TimingError::InvalidDuration {
            field,
            value: secs.to_string(),
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// margin 1, pre 2, post 1, cue 5: overhead 9 s.
    fn timing() -> Timing {
        Timing {
            latency_margin: Duration::from_secs(1),
            pre_delay: Duration::from_secs(2),
            post_delay: Duration::from_secs(1),
            cue_duration: Duration::from_secs(5),
        }
    }

    #[test]
    fn overhead_sums_all_constants() {
        assert_eq!(timing().overhead(), Duration::from_secs(9));
        assert_eq!(timing().submission_window(), Duration::from_secs(6));
    }

    #[test]
    fn rejects_lap_shorter_than_overhead() {
        let rounds = vec![RoundSpec::new(3, Duration::from_millis(8999), false)];
        let err = CompetitionSpec::new(rounds, timing(), CompetitionFlags::default(), 1)
            .unwrap_err();
        assert!(matches!(err, TimingError::LapTooShort { round: 0, .. }));
    }

    #[test]
    fn accepts_lap_exactly_equal_to_overhead() {
        let rounds = vec![RoundSpec::new(3, Duration::from_secs(9), false)];
        let spec = CompetitionSpec::new(rounds, timing(), CompetitionFlags::default(), 1);
        assert!(spec.is_ok());
    }

    #[test]
    fn reports_the_offending_round() {
        let rounds = vec![
            RoundSpec::new(2, Duration::from_secs(13), true),
            RoundSpec::new(2, Duration::from_secs(4), false),
        ];
        let err = CompetitionSpec::new(rounds, timing(), CompetitionFlags::default(), 1)
            .unwrap_err();
        assert!(matches!(err, TimingError::LapTooShort { round: 1, .. }));
    }

    #[test]
    fn rejects_empty_competition_and_lapless_rounds() {
        let err = CompetitionSpec::new(Vec::new(), timing(), CompetitionFlags::default(), 1)
            .unwrap_err();
        assert_eq!(err, TimingError::NoRounds);

        let rounds = vec![RoundSpec::new(0, Duration::from_secs(13), false)];
        let err = CompetitionSpec::new(rounds, timing(), CompetitionFlags::default(), 1)
            .unwrap_err();
        assert_eq!(err, TimingError::NoLaps { round: 0 });
    }

    #[test]
    fn rejects_zero_timing_constant() {
        let mut t = timing();
        t.cue_duration = Duration::ZERO;
        let rounds = vec![RoundSpec::new(1, Duration::from_secs(13), false)];
        let err = CompetitionSpec::new(rounds, t, CompetitionFlags::default(), 1).unwrap_err();
        assert!(matches!(
            err,
            TimingError::InvalidDuration {
                field: "sound_duration",
                ..
            }
        ));
    }

    #[test]
    fn positive_secs_rejects_non_positive_values() {
        assert_eq!(
            positive_secs("x", 1.5).unwrap(),
            Duration::from_millis(1500)
        );
        assert!(positive_secs("x", 0.0).is_err());
        assert!(positive_secs("x", -2.0).is_err());
        assert!(positive_secs("x", f64::INFINITY).is_err());
    }
}

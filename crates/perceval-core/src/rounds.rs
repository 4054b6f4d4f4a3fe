//! Round state machine.
//!
//! [`RoundState`] owns the competition position: the current round index,
//! the finished flag, the pausable clock, and the answer schedule. The lap
//! index is never stored. It is recomputed from elapsed clock time on every
//! query, so a missed or late tick can never make the position drift.
//!
//! [`RoundState::resolve_position`] is the only operation that moves the
//! position across a round boundary. It is idempotent within the same
//! elapsed window and may be called at any frequency.
//!
//! # State diagram
//!
//! ```text
//!  restart() ──► paused/running (round 0) ──lap overflow──► next round
//!                      │                                  (paused if
//!                      │ last round overflow               pause_between_rounds)
//!                      ▼
//!          restart_when_finished ? restart() : finished (paused, last lap)
//! ```

use std::sync::Arc;
use std::time::Duration;

use perceval_types::Guess;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

use crate::clock::{PausableClock, TimeSource};
use crate::schedule::{LapPlan, Schedule};
use crate::timing::{CompetitionSpec, RoundSpec};

/// Sentinel reported by [`RoundState::time_before_playing`] once the
/// competition is finished.
pub const FINISHED_TIME_BEFORE_PLAYING: f64 = -1.0;

/// Errors signalling an internal inconsistency of the position.
///
/// These never occur while the [`RoundState::resolve_position`] invariants
/// hold; callers must treat them as fatal rather than ignore them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoundError {
    /// The round index points past the configured rounds.
    #[error("round index {round} is outside the {rounds} configured rounds")]
    RoundOutOfRange {
        /// Offending round index.
        round: usize,
        /// Number of configured rounds.
        rounds: usize,
    },

    /// The schedule has no plan for the resolved lap.
    #[error("no schedule entry for round {round}, lap {lap}")]
    LapOutOfRange {
        /// Round index.
        round: usize,
        /// Offending lap index.
        lap: usize,
    },
}

/// A `(round, lap)` pair, always read together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    /// Zero-based round index.
    pub round: usize,
    /// Zero-based lap index within the round.
    pub lap: usize,
}

/// A round boundary crossed while resolving the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Moved from one round to the next.
    RoundAdvanced {
        /// Round that just ended.
        from: usize,
        /// Round that just began.
        to: usize,
    },
    /// The last round ended and the competition is now finished.
    Finished,
    /// The last round ended and the competition started over.
    Restarted,
}

/// Outcome of [`RoundState::resolve_position`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// The resolved position.
    pub position: Position,
    /// The boundary crossed by this call, if any.
    pub transition: Option<Transition>,
}

/// A consistent view of the state machine, taken at a single instant.
///
/// Scoring and status rendering work exclusively from a snapshot so that
/// the round and lap they use can never be torn apart.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundSnapshot {
    /// Current position.
    pub position: Position,
    /// Total number of rounds.
    pub number_of_rounds: usize,
    /// Number of laps in the current round.
    pub number_of_laps: usize,
    /// Whether the clock is paused.
    pub paused: bool,
    /// Whether the competition is finished.
    pub finished: bool,
    /// Whether a guess made now falls in the cue window.
    pub accepts_submissions: bool,
    /// Seconds until the next lap.
    pub time_before_next_lap: f64,
    /// Seconds until the cue of the current lap.
    pub time_before_playing: f64,
    /// Answer of the current lap.
    pub correct_guess: Guess,
    /// Answers of every lap of the current round.
    pub answers: Vec<Guess>,
    /// Whether the current round is presence-only.
    pub presence_only: bool,
}

/// Mutable competition position. See the module documentation.
#[derive(Debug)]
pub struct RoundState {
    spec: CompetitionSpec,
    clock: PausableClock,
    rng: StdRng,
    schedule: Schedule,
    round: usize,
    finished: bool,
}

impl RoundState {
    /// Build the state machine and perform the initial [`restart`](Self::restart).
    ///
    /// The generator is seeded once here: the first schedule is fixed by
    /// the seed, and every later restart draws the next schedule from the
    /// same stream.
    pub fn new(spec: CompetitionSpec, source: Arc<dyn TimeSource>) -> Self {
        let mut rng = StdRng::seed_from_u64(spec.seed());
        let schedule = Schedule::generate(&spec, &mut rng);
        let mut state = Self {
            clock: PausableClock::new(source),
            spec,
            rng,
            schedule,
            round: 0,
            finished: false,
        };
        state.reset_position();
        state
    }

    /// Start the competition over with a freshly drawn schedule.
    ///
    /// Clearing submissions is the caller's responsibility, since the log
    /// is not owned by the state machine.
    pub fn restart(&mut self) {
        self.schedule = Schedule::generate(&self.spec, &mut self.rng);
        self.reset_position();
        info!(
            rounds = self.spec.round_count(),
            paused = self.clock.is_paused(),
            "Competition restarted"
        );
    }

    fn reset_position(&mut self) {
        self.round = 0;
        self.finished = false;
        self.clock.reset();
        if !self.spec.flags().start_paused {
            self.clock.resume();
        }
    }

    /// The boundary [`resolve_position`](Self::resolve_position) would
    /// cross right now, without crossing it.
    ///
    /// Lets the caller act on a pending restart (clearing the log) before
    /// the state machine commits to it.
    ///
    /// # Errors
    ///
    /// Returns [`RoundError::RoundOutOfRange`] if the stored round index is
    /// outside the configured rounds.
    pub fn pending_transition(&self) -> Result<Option<Transition>, RoundError> {
        let round = self.current_round_spec()?;
        if self.finished || self.raw_lap(round) < round.lap_count() {
            return Ok(None);
        }
        let next = self.round.saturating_add(1);
        let transition = if next < self.spec.round_count() {
            Transition::RoundAdvanced {
                from: self.round,
                to: next,
            }
        } else if self.spec.flags().restart_when_finished {
            Transition::Restarted
        } else {
            Transition::Finished
        };
        Ok(Some(transition))
    }

    /// Position a guess made now belongs to, and whether it is in the cue
    /// window, as if the position had just been resolved.
    ///
    /// A guess landing on a boundary that no tick has crossed yet is filed
    /// under the upcoming position and is never in a window.
    ///
    /// # Errors
    ///
    /// Returns [`RoundError`] on an inconsistent position.
    pub fn pending_position(&self) -> Result<(Position, bool), RoundError> {
        match self.pending_transition()? {
            None => Ok((self.position()?, self.accepts_submissions()?)),
            Some(Transition::RoundAdvanced { to, .. }) => {
                Ok((Position { round: to, lap: 0 }, false))
            }
            Some(Transition::Restarted) => Ok((Position { round: 0, lap: 0 }, false)),
            Some(Transition::Finished) => Ok((self.position()?, false)),
        }
    }

    /// Resolve the current position, crossing at most one round boundary.
    ///
    /// # Errors
    ///
    /// Returns [`RoundError::RoundOutOfRange`] if the stored round index is
    /// outside the configured rounds.
    pub fn resolve_position(&mut self) -> Result<Resolution, RoundError> {
        let Some(transition) = self.pending_transition()? else {
            return Ok(Resolution {
                position: self.position_unchecked(),
                transition: None,
            });
        };

        match transition {
            Transition::Restarted => self.restart(),
            Transition::Finished => {
                self.finished = true;
                self.clock.pause();
                info!(round = self.round, "Competition finished");
            }
            Transition::RoundAdvanced { from, to } => {
                self.round = to;
                self.clock.restart_reference();
                if self.spec.flags().pause_between_rounds {
                    self.clock.pause();
                }
                info!(from, to, paused = self.clock.is_paused(), "Round advanced");
            }
        }

        Ok(Resolution {
            position: self.position()?,
            transition: Some(transition),
        })
    }

    /// Current position, with the lap clamped to the round's last lap.
    ///
    /// # Errors
    ///
    /// Returns [`RoundError::RoundOutOfRange`] on an inconsistent round
    /// index.
    pub fn position(&self) -> Result<Position, RoundError> {
        self.current_round_spec()?;
        Ok(self.position_unchecked())
    }

    fn position_unchecked(&self) -> Position {
        let lap = self
            .spec
            .round(self.round)
            .map_or(0, |round| self.clamped_lap(round));
        Position {
            round: self.round,
            lap,
        }
    }

    /// Seconds until the next lap starts; `0` once finished.
    ///
    /// # Errors
    ///
    /// Returns [`RoundError::RoundOutOfRange`] on an inconsistent round
    /// index.
    pub fn time_before_next_lap(&self) -> Result<f64, RoundError> {
        if self.finished {
            return Ok(0.0);
        }
        let round = self.current_round_spec()?;
        let next_lap = self.clamped_lap(round).saturating_add(1);
        let next_start = lap_start(round.lap_duration(), next_lap);
        Ok(next_start.saturating_sub(self.clock.elapsed()).as_secs_f64())
    }

    /// Seconds until the cue of the current lap starts.
    ///
    /// Negative once the cue start has passed in the current lap, and
    /// [`FINISHED_TIME_BEFORE_PLAYING`] once the competition is finished.
    ///
    /// # Errors
    ///
    /// Returns [`RoundError`] on an inconsistent position.
    pub fn time_before_playing(&self) -> Result<f64, RoundError> {
        if self.finished {
            return Ok(FINISHED_TIME_BEFORE_PLAYING);
        }
        let (plan, within) = self.current_plan()?;
        Ok(plan.offset.as_secs_f64() - within.as_secs_f64())
    }

    /// Whether a guess made now falls within
    /// `[offset, offset + cue_duration + latency_margin]` of the current lap.
    ///
    /// # Errors
    ///
    /// Returns [`RoundError`] on an inconsistent position.
    pub fn accepts_submissions(&self) -> Result<bool, RoundError> {
        if self.finished {
            return Ok(false);
        }
        let (plan, within) = self.current_plan()?;
        let window_end = plan
            .offset
            .saturating_add(self.spec.timing().submission_window());
        Ok(plan.offset <= within && within <= window_end)
    }

    /// Answer of the current lap.
    ///
    /// # Errors
    ///
    /// Returns [`RoundError`] on an inconsistent position.
    pub fn current_correct_guess(&self) -> Result<Guess, RoundError> {
        Ok(self.current_plan()?.0.answer)
    }

    /// Whether the clock is paused.
    pub const fn is_paused(&self) -> bool {
        self.clock.is_paused()
    }

    /// Whether the last lap of the last round has elapsed.
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Pause the clock. Idempotent.
    pub fn pause(&mut self) {
        self.clock.pause();
    }

    /// Resume the clock. Idempotent; no effect once finished.
    pub fn resume(&mut self) {
        if !self.finished {
            self.clock.resume();
        }
    }

    /// The competition description this state machine runs.
    pub const fn spec(&self) -> &CompetitionSpec {
        &self.spec
    }

    /// The current answer schedule.
    pub const fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Take a consistent snapshot of every derived query.
    ///
    /// # Errors
    ///
    /// Returns [`RoundError`] on an inconsistent position.
    pub fn snapshot(&self) -> Result<RoundSnapshot, RoundError> {
        let round = self.current_round_spec()?;
        let position = self.position_unchecked();
        let answers = self
            .schedule
            .answers(position.round)
            .ok_or(RoundError::LapOutOfRange {
                round: position.round,
                lap: position.lap,
            })?;
        Ok(RoundSnapshot {
            position,
            number_of_rounds: self.spec.round_count(),
            number_of_laps: round.lap_count(),
            paused: self.is_paused(),
            finished: self.finished,
            accepts_submissions: self.accepts_submissions()?,
            time_before_next_lap: self.time_before_next_lap()?,
            time_before_playing: self.time_before_playing()?,
            correct_guess: self.current_correct_guess()?,
            answers,
            presence_only: round.presence_only(),
        })
    }

    fn current_round_spec(&self) -> Result<&RoundSpec, RoundError> {
        self.spec.round(self.round).ok_or(RoundError::RoundOutOfRange {
            round: self.round,
            rounds: self.spec.round_count(),
        })
    }

    /// Lap plan of the current lap and the time spent in that lap so far.
    fn current_plan(&self) -> Result<(LapPlan, Duration), RoundError> {
        let round = self.current_round_spec()?;
        let lap = self.clamped_lap(round);
        let plan = self
            .schedule
            .lap(self.round, lap)
            .ok_or(RoundError::LapOutOfRange {
                round: self.round,
                lap,
            })?;
        let within = self
            .clock
            .elapsed()
            .saturating_sub(lap_start(round.lap_duration(), lap));
        Ok((plan, within))
    }

    /// `floor(elapsed / lap_duration)`, computed on integer nanoseconds.
    fn raw_lap(&self, round: &RoundSpec) -> usize {
        let lap_nanos = round.lap_duration().as_nanos();
        let raw = self
            .clock
            .elapsed()
            .as_nanos()
            .checked_div(lap_nanos)
            .unwrap_or(0);
        usize::try_from(raw).unwrap_or(usize::MAX)
    }

    fn clamped_lap(&self, round: &RoundSpec) -> usize {
        self.raw_lap(round)
            .min(round.lap_count().saturating_sub(1))
    }
}

/// Start of lap `lap` relative to the round start.
fn lap_start(lap_duration: Duration, lap: usize) -> Duration {
    let nanos = lap_duration
        .as_nanos()
        .saturating_mul(u128::try_from(lap).unwrap_or(u128::MAX));
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::clock::ManualTimeSource;
    use crate::timing::{CompetitionFlags, Timing};

    fn timing() -> Timing {
        Timing {
            latency_margin: Duration::from_secs(1),
            pre_delay: Duration::from_secs(2),
            post_delay: Duration::from_secs(1),
            cue_duration: Duration::from_secs(5),
        }
    }

    fn state(rounds: &[(usize, u64)], flags: CompetitionFlags) -> (ManualTimeSource, RoundState) {
        let rounds = rounds
            .iter()
            .map(|&(laps, secs)| RoundSpec::new(laps, Duration::from_secs(secs), false))
            .collect();
        let spec = CompetitionSpec::new(rounds, timing(), flags, 42).unwrap();
        let source = ManualTimeSource::new();
        let state = RoundState::new(spec, Arc::new(source.clone()));
        (source, state)
    }

    fn running() -> CompetitionFlags {
        CompetitionFlags {
            start_paused: false,
            pause_between_rounds: false,
            restart_when_finished: false,
        }
    }

    #[test]
    fn start_paused_flag_is_honoured() {
        let (source, mut st) = state(
            &[(3, 10)],
            CompetitionFlags {
                start_paused: true,
                ..running()
            },
        );
        source.advance_secs(100.0);
        let res = st.resolve_position().unwrap();
        assert!(st.is_paused());
        assert_eq!(res.position, Position { round: 0, lap: 0 });
        assert_eq!(res.transition, None);
    }

    #[test]
    fn lap_is_derived_from_elapsed_time() {
        let (source, mut st) = state(&[(3, 10)], running());
        source.advance_secs(25.0);
        assert_eq!(st.resolve_position().unwrap().position.lap, 2);
        assert_eq!(st.time_before_next_lap().unwrap(), 5.0);
    }

    #[test]
    fn rollover_advances_exactly_one_round() {
        let (source, mut st) = state(&[(4, 10), (2, 10)], running());
        source.advance_secs(40.0);
        let res = st.resolve_position().unwrap();
        assert_eq!(res.position, Position { round: 1, lap: 0 });
        assert_eq!(
            res.transition,
            Some(Transition::RoundAdvanced { from: 0, to: 1 })
        );
        assert!(!st.is_paused());

        // Repeated calls inside the same window change nothing.
        let again = st.resolve_position().unwrap();
        assert_eq!(again.position, Position { round: 1, lap: 0 });
        assert_eq!(again.transition, None);
    }

    #[test]
    fn pause_between_rounds_freezes_new_round() {
        let flags = CompetitionFlags {
            pause_between_rounds: true,
            ..running()
        };
        let (source, mut st) = state(&[(1, 10), (1, 10)], flags);
        source.advance_secs(10.0);
        st.resolve_position().unwrap();
        assert!(st.is_paused());
        source.advance_secs(50.0);
        assert_eq!(
            st.resolve_position().unwrap().position,
            Position { round: 1, lap: 0 }
        );
        assert_eq!(st.time_before_next_lap().unwrap(), 10.0);

        st.resume();
        source.advance_secs(3.0);
        assert_eq!(st.time_before_next_lap().unwrap(), 7.0);
    }

    #[test]
    fn finish_freezes_on_last_lap() {
        let (source, mut st) = state(&[(3, 10)], running());
        source.advance_secs(30.0);
        let res = st.resolve_position().unwrap();
        assert_eq!(res.transition, Some(Transition::Finished));
        assert_eq!(res.position, Position { round: 0, lap: 2 });
        assert!(st.is_finished());
        assert!(st.is_paused());

        source.advance_secs(1000.0);
        let later = st.resolve_position().unwrap();
        assert_eq!(later.position, Position { round: 0, lap: 2 });
        assert_eq!(later.transition, None);
        assert_eq!(st.time_before_next_lap().unwrap(), 0.0);
        assert_eq!(
            st.time_before_playing().unwrap(),
            FINISHED_TIME_BEFORE_PLAYING
        );
        assert!(!st.accepts_submissions().unwrap());

        // Resuming a finished competition is a no-op.
        st.resume();
        assert!(st.is_paused());
    }

    #[test]
    fn restart_when_finished_draws_new_schedule() {
        let flags = CompetitionFlags {
            restart_when_finished: true,
            ..running()
        };
        let (source, mut st) = state(&[(10, 10)], flags);
        let before = st.schedule().clone();
        source.advance_secs(100.0);
        let res = st.resolve_position().unwrap();
        assert_eq!(res.transition, Some(Transition::Restarted));
        assert_eq!(res.position, Position { round: 0, lap: 0 });
        assert!(!st.is_finished());
        assert!(!st.is_paused());
        assert_ne!(st.schedule(), &before);
    }

    #[test]
    fn pending_transition_does_not_mutate() {
        let flags = CompetitionFlags {
            restart_when_finished: true,
            ..running()
        };
        let (source, mut st) = state(&[(2, 10)], flags);
        let before = st.schedule().clone();
        source.advance_secs(20.0);

        assert_eq!(st.pending_transition().unwrap(), Some(Transition::Restarted));
        assert_eq!(st.pending_transition().unwrap(), Some(Transition::Restarted));
        assert_eq!(st.schedule(), &before);
        assert_eq!(st.position().unwrap(), Position { round: 0, lap: 1 });

        st.resolve_position().unwrap();
        assert_eq!(st.pending_transition().unwrap(), None);
    }

    #[test]
    fn pending_position_looks_past_an_unresolved_boundary() {
        let (source, mut st) = state(&[(2, 10), (2, 10)], running());
        source.advance_secs(20.5);

        assert_eq!(st.position().unwrap(), Position { round: 0, lap: 1 });
        let (pending, in_window) = st.pending_position().unwrap();
        assert_eq!(pending, Position { round: 1, lap: 0 });
        assert!(!in_window);

        assert_eq!(st.resolve_position().unwrap().position, pending);
        assert_eq!(st.pending_position().unwrap().0, pending);
    }

    #[test]
    fn first_schedule_is_fixed_by_seed() {
        let (_, a) = state(&[(5, 10), (5, 12)], running());
        let (_, b) = state(&[(5, 10), (5, 12)], running());
        assert_eq!(a.schedule(), b.schedule());
    }

    #[test]
    fn submission_window_bounds_are_inclusive() {
        let (source, st) = state(&[(3, 10)], running());
        let offset = st.schedule().lap(0, 0).unwrap().offset;

        source.advance(offset - Duration::from_millis(1));
        assert!(!st.accepts_submissions().unwrap());
        assert!(st.time_before_playing().unwrap() > 0.0);

        source.advance(Duration::from_millis(1));
        assert!(st.accepts_submissions().unwrap());
        assert_eq!(st.time_before_playing().unwrap(), 0.0);

        source.advance(Duration::from_secs(6));
        assert!(st.accepts_submissions().unwrap());

        source.advance(Duration::from_millis(1));
        assert!(!st.accepts_submissions().unwrap());
        assert!(st.time_before_playing().unwrap() < 0.0);
    }

    #[test]
    fn snapshot_is_consistent() {
        let (source, mut st) = state(&[(3, 10), (2, 9)], running());
        source.advance_secs(12.5);
        st.resolve_position().unwrap();
        let snap = st.snapshot().unwrap();
        assert_eq!(snap.position, Position { round: 0, lap: 1 });
        assert_eq!(snap.number_of_rounds, 2);
        assert_eq!(snap.number_of_laps, 3);
        assert_eq!(snap.answers.len(), 3);
        assert_eq!(snap.correct_guess, *snap.answers.get(1).unwrap());
        assert!(!snap.finished);
    }

    #[test]
    fn explicit_restart_resets_everything() {
        let (source, mut st) = state(&[(1, 10), (1, 10)], running());
        source.advance_secs(10.0);
        st.resolve_position().unwrap();
        st.restart();
        assert_eq!(st.position().unwrap(), Position { round: 0, lap: 0 });
        assert!(!st.is_paused());
        assert_eq!(st.time_before_next_lap().unwrap(), 10.0);
    }
}

//! Shared competition handle.
//!
//! [`CompetitionHandle`] is the single synchronized entry point to the
//! competition. The round state machine and the roster live behind one
//! [`tokio::sync::RwLock`]:
//!
//! - Position resolution and every clock control take the write lock, so
//!   all mutations of the position are mutually exclusive.
//! - Submissions only read the position, under the read lock.
//! - A status is computed from one [`RoundSnapshot`] taken under a single
//!   lock acquisition, so round and lap are never read apart.
//!
//! The submission log sits outside the lock. Appends and scoring reads go
//! straight to it; the only log operation performed under the lock is the
//! clear that accompanies a restart.

use std::sync::Arc;

use perceval_types::{
    GroupCheck, GroupKey, Guess, LeaderboardRow, LeaderboardStatus, NewSubmission, Submission,
};
use tokio::sync::RwLock;
use tracing::{debug, info};
use validator::Validate;

use crate::clock::TimeSource;
use crate::config::{ConfigError, GroupConfig, PercevalConfig};
use crate::roster::{LookupError, Roster, RosterError};
use crate::rounds::{Resolution, RoundError, RoundSnapshot, RoundState, Transition};
use crate::scoring::score_round;
use crate::submission::{SubmissionError, SubmissionLog};

/// Errors returned by [`CompetitionHandle`] operations.
#[derive(Debug, thiserror::Error)]
pub enum CompetitionError {
    /// The position is inconsistent. Fatal.
    #[error("round state error: {source}")]
    Round {
        /// The underlying state error.
        #[from]
        source: RoundError,
    },

    /// A group key or name is not registered.
    #[error("lookup failed: {source}")]
    Lookup {
        /// The underlying lookup error.
        #[from]
        source: LookupError,
    },

    /// A roster update would break key or name uniqueness.
    #[error("roster update rejected: {source}")]
    Roster {
        /// The underlying roster error.
        #[from]
        source: RosterError,
    },

    /// A new group failed field validation.
    #[error("invalid group: {source}")]
    InvalidGroup {
        /// The collected field errors.
        #[from]
        source: validator::ValidationErrors,
    },

    /// The submission log failed.
    #[error("submission log error: {source}")]
    Submission {
        /// The underlying backend error.
        #[from]
        source: SubmissionError,
    },

    /// A meta-value was submitted as a guess.
    #[error("`{0}` is not a guessable category")]
    NotGuessable(Guess),

    /// The caller's group lacks administrative rights.
    #[error("group is not an administrator")]
    Forbidden,

    /// A slot outside the configured rounds or laps was targeted.
    #[error("no lap {lap} in round {round}")]
    SlotOutOfRange {
        /// Requested round.
        round: usize,
        /// Requested lap.
        lap: usize,
    },
}

/// Outcome of one [`CompetitionHandle::tick`].
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    /// Position resolved by the tick.
    pub resolution: Resolution,
    /// Public status (correct guess withheld).
    pub status: LeaderboardStatus,
}

/// State guarded by the handle's lock.
#[derive(Debug)]
struct Competition {
    state: RoundState,
    roster: Roster,
    roster_dirty: bool,
}

/// Cloneable handle to a running competition. See the module documentation.
#[derive(Debug)]
pub struct CompetitionHandle<L> {
    inner: Arc<RwLock<Competition>>,
    log: Arc<L>,
}

impl<L> Clone for CompetitionHandle<L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            log: Arc::clone(&self.log),
        }
    }
}

impl<L: SubmissionLog> CompetitionHandle<L> {
    /// Wrap an already built state machine and roster.
    pub fn new(state: RoundState, roster: Roster, log: Arc<L>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Competition {
                state,
                roster,
                roster_dirty: false,
            })),
            log,
        }
    }

    /// Validate `config` and build a handle from it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration is invalid.
    pub fn from_config(
        config: &PercevalConfig,
        source: Arc<dyn TimeSource>,
        log: Arc<L>,
    ) -> Result<Self, ConfigError> {
        let (spec, roster) = config.validated()?;
        info!(
            rounds = spec.round_count(),
            groups = roster.len(),
            seed = spec.seed(),
            "Competition configured"
        );
        Ok(Self::new(RoundState::new(spec, source), roster, log))
    }

    /// The submission log backing this competition.
    pub fn log(&self) -> &L {
        &self.log
    }

    /// Resolve the position and compute the public status.
    ///
    /// # Errors
    ///
    /// Returns [`CompetitionError::Round`] on a state inconsistency and
    /// [`CompetitionError::Submission`] on a log failure.
    pub async fn tick(&self) -> Result<TickOutcome, CompetitionError> {
        let (resolution, snapshot, groups) = {
            let mut inner = self.inner.write().await;
            let resolution = self.resolve(&mut inner).await?;
            (
                resolution,
                inner.state.snapshot()?,
                inner.roster.groups().to_vec(),
            )
        };
        let status = self.render(&snapshot, &groups, false).await?;
        Ok(TickOutcome { resolution, status })
    }

    /// Status as seen by the group holding `key`. The correct guess of the
    /// current lap is only revealed to administrators.
    ///
    /// # Errors
    ///
    /// Returns [`CompetitionError::Lookup`] for an unknown key.
    pub async fn status(&self, key: &GroupKey) -> Result<LeaderboardStatus, CompetitionError> {
        let (snapshot, groups, admin) = {
            let mut inner = self.inner.write().await;
            let admin = inner.roster.by_key(key)?.admin;
            self.resolve(&mut inner).await?;
            (
                inner.state.snapshot()?,
                inner.roster.groups().to_vec(),
                admin,
            )
        };
        self.render(&snapshot, &groups, admin).await
    }

    /// Public status, without the correct guess.
    ///
    /// # Errors
    ///
    /// Returns [`CompetitionError`] on a state or log failure.
    pub async fn leaderboard(&self) -> Result<LeaderboardStatus, CompetitionError> {
        Ok(self.tick().await?.status)
    }

    /// Existence and role check for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CompetitionError::Lookup`] for an unknown key.
    pub async fn check(&self, key: &GroupKey) -> Result<GroupCheck, CompetitionError> {
        let inner = self.inner.read().await;
        let group = inner.roster.by_key(key)?;
        Ok(GroupCheck { admin: group.admin })
    }

    /// Return the caller's group if it holds administrative rights.
    ///
    /// # Errors
    ///
    /// Returns [`CompetitionError::Lookup`] for an unknown key and
    /// [`CompetitionError::Forbidden`] for a non-admin group.
    pub async fn require_admin(&self, key: &GroupKey) -> Result<GroupConfig, CompetitionError> {
        let inner = self.inner.read().await;
        let group = inner.roster.by_key(key)?;
        if group.admin {
            Ok(group.clone())
        } else {
            Err(CompetitionError::Forbidden)
        }
    }

    /// Record a guess for the current lap.
    ///
    /// The guess is filed under the position the next resolve will report,
    /// so a guess landing on a boundary no tick has crossed yet goes to the
    /// new round.
    ///
    /// Writes are never rejected for timing reasons. When
    /// `disqualify_outside_window` is set, a guess made outside the cue
    /// window is stored with the disqualified flag.
    ///
    /// # Errors
    ///
    /// Returns [`CompetitionError::Lookup`] for an unknown key and
    /// [`CompetitionError::NotGuessable`] for a meta-value.
    pub async fn submit(
        &self,
        key: &GroupKey,
        guess: Guess,
        disqualify_outside_window: bool,
    ) -> Result<Submission, CompetitionError> {
        if !guess.is_guessable() {
            return Err(CompetitionError::NotGuessable(guess));
        }
        let (position, in_window) = {
            let inner = self.inner.read().await;
            inner.roster.by_key(key)?;
            inner.state.pending_position()?
        };

        let submission = self
            .log
            .append(NewSubmission {
                key: key.clone(),
                round: position.round,
                lap: position.lap,
                guess,
                disqualified: disqualify_outside_window && !in_window,
            })
            .await?;
        debug!(
            round = submission.round,
            lap = submission.lap,
            guess = %submission.guess,
            in_window,
            disqualified = submission.disqualified,
            "Submission recorded"
        );
        Ok(submission)
    }

    /// Pause the clock.
    pub async fn pause(&self) {
        self.inner.write().await.state.pause();
        info!("Competition paused");
    }

    /// Resume the clock.
    pub async fn resume(&self) {
        self.inner.write().await.state.resume();
        info!("Competition resumed");
    }

    /// Clear the submission log and start over with a new schedule.
    ///
    /// # Errors
    ///
    /// Returns [`CompetitionError::Submission`] if the log cannot be
    /// cleared. The position is left untouched in that case.
    pub async fn restart(&self) -> Result<(), CompetitionError> {
        let mut inner = self.inner.write().await;
        self.log.clear().await?;
        inner.state.restart();
        Ok(())
    }

    /// Disqualify the group named `name` for `(round, lap)`.
    ///
    /// # Errors
    ///
    /// Returns [`CompetitionError::Lookup`] for an unknown name and
    /// [`CompetitionError::SlotOutOfRange`] for a slot that does not exist.
    pub async fn disqualify(
        &self,
        name: &str,
        round: usize,
        lap: usize,
    ) -> Result<Submission, CompetitionError> {
        let key = {
            let inner = self.inner.read().await;
            let key = GroupKey::new(inner.roster.by_name(name)?.key.clone());
            let laps = inner
                .state
                .spec()
                .round(round)
                .map_or(0, |spec| spec.lap_count());
            if lap >= laps {
                return Err(CompetitionError::SlotOutOfRange { round, lap });
            }
            key
        };

        let submission = self
            .log
            .append(NewSubmission {
                key,
                round,
                lap,
                guess: Guess::Nothing,
                disqualified: true,
            })
            .await?;
        info!(group = name, round, lap, "Group disqualified");
        Ok(submission)
    }

    /// Register a new group at the end of the roster.
    ///
    /// # Errors
    ///
    /// Returns [`CompetitionError::InvalidGroup`] or
    /// [`CompetitionError::Roster`] if the group is rejected.
    pub async fn add_group(&self, group: GroupConfig) -> Result<(), CompetitionError> {
        group.validate()?;
        let name = group.name.clone();
        let mut inner = self.inner.write().await;
        inner.roster.add(group)?;
        inner.roster_dirty = true;
        info!(group = %name, "Group added");
        Ok(())
    }

    /// Remove the group named `name`. Its submissions stay in the log.
    ///
    /// # Errors
    ///
    /// Returns [`CompetitionError::Lookup`] for an unknown name.
    pub async fn remove_group(&self, name: &str) -> Result<GroupConfig, CompetitionError> {
        let mut inner = self.inner.write().await;
        let removed = inner.roster.remove(name)?;
        inner.roster_dirty = true;
        info!(group = name, "Group removed");
        Ok(removed)
    }

    /// Every submission in the log, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`CompetitionError::Submission`] on a log failure.
    pub async fn submissions(&self) -> Result<Vec<Submission>, CompetitionError> {
        Ok(self.log.all().await?)
    }

    /// Remove every submission without touching the position.
    ///
    /// # Errors
    ///
    /// Returns [`CompetitionError::Submission`] on a log failure.
    pub async fn clear_submissions(&self) -> Result<(), CompetitionError> {
        self.log.clear().await?;
        info!("Submissions cleared");
        Ok(())
    }

    /// Return the roster if it changed since the last call, clearing the
    /// "needs save" flag.
    pub async fn take_dirty_roster(&self) -> Option<Vec<GroupConfig>> {
        let mut inner = self.inner.write().await;
        if !inner.roster_dirty {
            return None;
        }
        inner.roster_dirty = false;
        Some(inner.roster.groups().to_vec())
    }

    /// Put the "needs save" flag back after a failed save.
    pub async fn mark_roster_dirty(&self) {
        self.inner.write().await.roster_dirty = true;
    }

    /// Resolve the position under the caller's write lock.
    ///
    /// A pending restart clears the log first and only then draws the new
    /// schedule. If the clear fails the state is left on the old schedule
    /// and the next resolve retries.
    async fn resolve(&self, inner: &mut Competition) -> Result<Resolution, CompetitionError> {
        if inner.state.pending_transition()? == Some(Transition::Restarted) {
            self.log.clear().await?;
        }
        Ok(inner.state.resolve_position()?)
    }

    async fn render(
        &self,
        snapshot: &RoundSnapshot,
        groups: &[GroupConfig],
        reveal: bool,
    ) -> Result<LeaderboardStatus, CompetitionError> {
        let submissions = self
            .log
            .round_submissions(snapshot.position.round)
            .await?;
        let leaderboard = score_round(snapshot, groups, &submissions);
        Ok(status_from(snapshot, leaderboard, reveal))
    }
}

fn status_from(
    snapshot: &RoundSnapshot,
    leaderboard: Vec<LeaderboardRow>,
    reveal: bool,
) -> LeaderboardStatus {
    LeaderboardStatus {
        current_correct_guess: reveal.then_some(snapshot.correct_guess),
        current_round: snapshot.position.round,
        current_lap: snapshot.position.lap,
        number_of_rounds: snapshot.number_of_rounds,
        number_of_laps: snapshot.number_of_laps,
        paused: snapshot.paused,
        time_before_next_lap: snapshot.time_before_next_lap,
        time_before_playing: snapshot.time_before_playing,
        accepts_submissions: snapshot.accepts_submissions,
        finished: snapshot.finished,
        leaderboard,
    }
}

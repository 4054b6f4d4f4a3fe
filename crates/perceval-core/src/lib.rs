//! Competition clock, answer schedule, round state machine, and scoring for
//! the Perceval guessing competition.
//!
//! A competition is a fixed sequence of rounds. Each round is a sequence of
//! equal-length laps, and each lap plays one cue at a scheduled offset.
//! Groups submit guesses for the cue of the current lap and are scored per
//! round on a leaderboard.
//!
//! # Modules
//!
//! - [`clock`] -- Pausable stopwatch driven by a pluggable [`TimeSource`].
//! - [`timing`] -- Validated round and timing description.
//! - [`config`] -- Configuration loading from `perceval-config.yaml`.
//! - [`schedule`] -- Seeded per-lap answers and play offsets.
//! - [`rounds`] -- Round state machine resolving the current position.
//! - [`submission`] -- [`SubmissionLog`] trait and an in-memory log.
//! - [`roster`] -- Ordered, unique set of registered groups.
//! - [`scoring`] -- Per-round leaderboard computation.
//! - [`competition`] -- Shared handle tying all of the above together.
//! - [`runner`] -- Periodic tick loop with a [`TickCallback`] hook.
//!
//! [`TimeSource`]: clock::TimeSource
//! [`SubmissionLog`]: submission::SubmissionLog
//! [`TickCallback`]: runner::TickCallback

pub mod clock;
pub mod competition;
pub mod config;
pub mod roster;
pub mod rounds;
pub mod runner;
pub mod schedule;
pub mod scoring;
pub mod submission;
pub mod timing;

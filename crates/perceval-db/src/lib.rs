//! `PostgreSQL` data layer for the Perceval guessing competition.
//!
//! The competition core only needs an append-only submission log. This
//! crate provides the durable implementation of that log on top of
//! [`sqlx`], used whenever a database URL is configured.
//!
//! # Modules
//!
//! - [`database`] -- connection settings, pool and migrations
//! - [`submission_store`] -- [`PgSubmissionLog`], the `submissions` table
//! - [`error`] -- Shared error types

pub mod database;
pub mod error;
pub mod submission_store;

// Re-export primary types for convenience.
pub use database::{Database, PoolSettings};
pub use error::DbError;
pub use submission_store::{PgSubmissionLog, SubmissionRow};

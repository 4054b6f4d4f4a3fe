//! Error types for the data layer.
//!
//! All errors are propagated via [`DbError`], which wraps the underlying
//! [`sqlx`] errors. At the boundary with the competition core a
//! [`DbError`] becomes a [`SubmissionError`].

use perceval_core::submission::SubmissionError;

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A value does not fit its column.
    #[error("{field} out of range: {value}")]
    OutOfRange {
        /// Name of the column.
        field: &'static str,
        /// Offending value, rendered for diagnostics.
        value: String,
    },

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<DbError> for SubmissionError {
    fn from(err: DbError) -> Self {
        Self::Backend {
            message: err.to_string(),
        }
    }
}

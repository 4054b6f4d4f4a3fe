//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure mode of startup and of the tick
//! loop so that `main` can propagate with `?`.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: perceval_core::config::ConfigError,
    },

    /// The submission database could not be reached or migrated.
    #[error("database error: {source}")]
    Database {
        /// The underlying database error.
        #[from]
        source: perceval_db::DbError,
    },

    /// The tick loop stopped on a state inconsistency.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: perceval_core::runner::RunnerError,
    },

    /// The leaderboard server failed to start.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: perceval_server::ServerError,
    },
}

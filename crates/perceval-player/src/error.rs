//! Error types for the playback client.

use reqwest::StatusCode;

/// Errors that can occur while driving the leaderboard.
#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    /// Configuration is invalid or missing.
    #[error("config error: {0}")]
    Config(String),

    /// The server could not be reached.
    #[error("leaderboard unreachable: {0}")]
    Unreachable(String),

    /// The server answered with an unexpected status.
    #[error("leaderboard returned {status}: {body}")]
    Rejected {
        /// HTTP status of the response.
        status: StatusCode,
        /// Response body, for diagnostics.
        body: String,
    },

    /// A key is not registered on the server.
    #[error("unknown key: {0}")]
    UnknownKey(String),

    /// The configured admin key does not carry admin rights.
    #[error("key must belong to an admin group")]
    NotAdmin,

    /// The response body did not match the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),
}

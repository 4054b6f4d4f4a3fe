//! Playback client configuration, loaded from the environment.

use std::time::Duration;

use crate::error::PlayerError;

/// Server used when `LEADERBOARD_URL` is unset.
const DEFAULT_URL: &str = "http://localhost:5000";

/// Complete player configuration.
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Base URL of the leaderboard server, without a trailing slash.
    pub url: String,
    /// Key of an admin group. Used to read the correct category.
    pub admin_key: String,
    /// Key of a group that always guesses at random.
    pub random_key: Option<String>,
    /// Delay between two status polls while idle.
    pub poll_interval: Duration,
    /// How long a cue lasts once started.
    pub sound_duration: Duration,
}

impl PlayerConfig {
    /// Load configuration from environment variables.
    ///
    /// Required variables:
    /// - `LEADERBOARD_ADMIN_KEY` -- key granting admin rights
    ///
    /// Optional variables:
    /// - `LEADERBOARD_URL` -- base API URL (default `http://localhost:5000`)
    /// - `LEADERBOARD_RANDOM_KEY` -- key of the random guesser
    /// - `PLAYER_POLL_MS` -- idle poll interval in milliseconds (default 200)
    /// - `PLAYER_SOUND_DURATION_MS` -- cue duration in milliseconds (default 5000)
    pub fn from_env() -> Result<Self, PlayerError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, PlayerError> {
        let admin_key = lookup("LEADERBOARD_ADMIN_KEY")
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                PlayerError::Config("missing required env var LEADERBOARD_ADMIN_KEY".to_owned())
            })?;
        let url = lookup("LEADERBOARD_URL")
            .unwrap_or_else(|| DEFAULT_URL.to_owned())
            .trim_end_matches('/')
            .to_owned();
        let random_key = lookup("LEADERBOARD_RANDOM_KEY").filter(|key| !key.is_empty());

        Ok(Self {
            url,
            admin_key,
            random_key,
            poll_interval: millis(&lookup, "PLAYER_POLL_MS", 200)?,
            sound_duration: millis(&lookup, "PLAYER_SOUND_DURATION_MS", 5000)?,
        })
    }
}

fn millis(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: u64,
) -> Result<Duration, PlayerError> {
    lookup(name).map_or(Ok(Duration::from_millis(default)), |raw| {
        raw.parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|e| PlayerError::Config(format!("invalid {name}: {e}")))
    })
}

//! Thin HTTP client for the leaderboard polling API.

use perceval_types::{GroupCheck, Guess, LeaderboardStatus};
use reqwest::{Response, StatusCode};

use crate::error::PlayerError;

/// Client for one leaderboard server.
#[derive(Debug, Clone)]
pub struct LeaderboardClient {
    client: reqwest::Client,
    base_url: String,
}

impl LeaderboardClient {
    /// Create a client for the server at `base_url`.
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    /// `GET /leaderboard/check/{key}`.
    pub async fn check(&self, key: &str) -> Result<GroupCheck, PlayerError> {
        let response = self
            .client
            .get(format!("{}/leaderboard/check/{key}", self.base_url))
            .send()
            .await
            .map_err(|e| PlayerError::Unreachable(e.to_string()))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(PlayerError::UnknownKey(key.to_owned()));
        }
        decode(response).await
    }

    /// `GET /leaderboard/status/{key}`.
    pub async fn status(&self, key: &str) -> Result<LeaderboardStatus, PlayerError> {
        let response = self
            .client
            .get(format!("{}/leaderboard/status/{key}", self.base_url))
            .send()
            .await
            .map_err(|e| PlayerError::Unreachable(e.to_string()))?;
        decode(response).await
    }

    /// `PATCH /leaderboard/submit/{key}/{guess}`.
    pub async fn submit(&self, key: &str, guess: Guess) -> Result<(), PlayerError> {
        let response = self
            .client
            .patch(format!("{}/leaderboard/submit/{key}/{guess}", self.base_url))
            .send()
            .await
            .map_err(|e| PlayerError::Unreachable(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(rejected(response).await);
        }
        Ok(())
    }
}

async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, PlayerError> {
    if !response.status().is_success() {
        return Err(rejected(response).await);
    }
    response
        .json()
        .await
        .map_err(|e| PlayerError::Malformed(e.to_string()))
}

async fn rejected(response: Response) -> PlayerError {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "unable to read error body".to_owned());
    PlayerError::Rejected { status, body }
}

//! Public leaderboard endpoints.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | HTML leaderboard page |
//! | `GET` | `/leaderboard/status/{key}` | Competition status for a group |
//! | `GET` | `/leaderboard/check/{key}` | Existence and role check |
//! | `PATCH` | `/leaderboard/submit/{key}/{guess}` | Record a guess for the current lap |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use perceval_core::submission::SubmissionLog;
use perceval_types::{GroupKey, Guess};

use crate::error::ApiError;
use crate::pages;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// GET /
// ---------------------------------------------------------------------------

/// Serve the HTML leaderboard page with the current public standings.
pub async fn index<L: SubmissionLog>(
    State(state): State<Arc<AppState<L>>>,
) -> Result<impl IntoResponse, ApiError> {
    let status = state.competition.leaderboard().await?;
    let html = pages::render_leaderboard(&state.pages, &status)?;
    Ok(Html(html))
}

// ---------------------------------------------------------------------------
// GET /leaderboard/status/{key}
// ---------------------------------------------------------------------------

/// Return the competition status as seen by the group holding `key`.
///
/// The correct category of the current lap is only filled in for admin
/// groups. Returns 404 for an unknown key.
pub async fn status<L: SubmissionLog>(
    State(state): State<Arc<AppState<L>>>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let status = state.competition.status(&GroupKey::new(key)).await?;
    Ok(Json(status))
}

// ---------------------------------------------------------------------------
// GET /leaderboard/check/{key}
// ---------------------------------------------------------------------------

/// Confirm that `key` belongs to a registered group and report its role.
pub async fn check<L: SubmissionLog>(
    State(state): State<Arc<AppState<L>>>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let check = state.competition.check(&GroupKey::new(key)).await?;
    Ok(Json(check))
}

// ---------------------------------------------------------------------------
// PATCH /leaderboard/submit/{key}/{guess}
// ---------------------------------------------------------------------------

/// Append a guess for the current lap.
///
/// Responds with 204 on success. Unknown categories and meta-values such
/// as `none` are rejected with 400; unknown keys with 404.
pub async fn submit<L: SubmissionLog>(
    State(state): State<Arc<AppState<L>>>,
    Path((key, guess)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let guess: Guess = guess
        .parse()
        .map_err(|e: perceval_types::UnknownGuess| ApiError::InvalidQuery(e.to_string()))?;
    state
        .competition
        .submit(&GroupKey::new(key), guess, state.disqualify_outside_window)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

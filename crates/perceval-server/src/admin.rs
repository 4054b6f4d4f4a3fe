//! Administrative endpoints for running the competition.
//!
//! Every route carries the caller's key in the path. The key must belong
//! to an admin group: unknown keys get 404, other groups get 403.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/admin/{key}/pause` | Pause the clock |
//! | `POST` | `/api/admin/{key}/resume` | Resume the clock |
//! | `POST` | `/api/admin/{key}/restart` | Clear submissions and start over |
//! | `GET` | `/api/admin/{key}/submissions` | Dump the submission log |
//! | `DELETE` | `/api/admin/{key}/submissions` | Clear the submission log |
//! | `POST` | `/api/admin/{key}/disqualify` | Disqualify a group for one lap |
//! | `POST` | `/api/admin/{key}/groups` | Register a group |
//! | `DELETE` | `/api/admin/{key}/groups/{name}` | Remove a group |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use perceval_core::config::GroupConfig;
use perceval_core::submission::SubmissionLog;
use perceval_types::GroupKey;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for `POST /api/admin/{key}/disqualify`.
#[derive(Debug, serde::Deserialize)]
pub struct DisqualifyRequest {
    /// Display name of the group to disqualify.
    pub name: String,
    /// Round index of the slot.
    pub round: usize,
    /// Lap index of the slot.
    pub lap: usize,
}

/// Generic success response.
#[derive(Debug, serde::Serialize)]
struct AdminResponse {
    /// Whether the operation succeeded.
    ok: bool,
    /// Human-readable message.
    message: String,
}

impl AdminResponse {
    fn ok(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            ok: true,
            message: message.into(),
        })
    }
}

async fn authorize<L: SubmissionLog>(state: &AppState<L>, key: &str) -> Result<(), ApiError> {
    let admin = state
        .competition
        .require_admin(&GroupKey::new(key))
        .await?;
    tracing::debug!(admin = %admin.name, "Admin request authorized");
    Ok(())
}

/// Pause the competition clock.
pub async fn pause<L: SubmissionLog>(
    State(state): State<Arc<AppState<L>>>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, &key).await?;
    state.competition.pause().await;
    Ok(AdminResponse::ok("Competition paused"))
}

/// Resume the competition clock. Has no effect once finished.
pub async fn resume<L: SubmissionLog>(
    State(state): State<Arc<AppState<L>>>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, &key).await?;
    state.competition.resume().await;
    Ok(AdminResponse::ok("Competition resumed"))
}

/// Clear the submission log and restart with a fresh schedule.
pub async fn restart<L: SubmissionLog>(
    State(state): State<Arc<AppState<L>>>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, &key).await?;
    state.competition.restart().await?;
    Ok(AdminResponse::ok("Competition restarted"))
}

/// Return every stored submission, oldest first.
pub async fn list_submissions<L: SubmissionLog>(
    State(state): State<Arc<AppState<L>>>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, &key).await?;
    let submissions = state.competition.submissions().await?;
    Ok(Json(submissions))
}

/// Delete every stored submission. The position is left as is.
pub async fn clear_submissions<L: SubmissionLog>(
    State(state): State<Arc<AppState<L>>>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, &key).await?;
    state.competition.clear_submissions().await?;
    Ok(AdminResponse::ok("Submissions cleared"))
}

/// Disqualify a group for one `(round, lap)` slot.
pub async fn disqualify<L: SubmissionLog>(
    State(state): State<Arc<AppState<L>>>,
    Path(key): Path<String>,
    Json(body): Json<DisqualifyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, &key).await?;
    state
        .competition
        .disqualify(&body.name, body.round, body.lap)
        .await?;
    Ok(AdminResponse::ok(format!(
        "{} disqualified for round {} lap {}",
        body.name, body.round, body.lap
    )))
}

/// Register a new group at the end of the roster.
pub async fn add_group<L: SubmissionLog>(
    State(state): State<Arc<AppState<L>>>,
    Path(key): Path<String>,
    Json(group): Json<GroupConfig>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, &key).await?;
    let name = group.name.clone();
    state.competition.add_group(group).await?;
    Ok(AdminResponse::ok(format!("Group {name} added")))
}

/// Remove a group by display name.
pub async fn remove_group<L: SubmissionLog>(
    State(state): State<Arc<AppState<L>>>,
    Path((key, name)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, &key).await?;
    let removed = state.competition.remove_group(&name).await?;
    Ok(AdminResponse::ok(format!("Group {} removed", removed.name)))
}

//! Axum router construction.
//!
//! Assembles the public leaderboard routes, the admin routes, and the
//! `WebSocket` stream into a single [`Router`] with permissive CORS so
//! the page and third-party clients can poll from any origin.

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, patch, post};
use perceval_core::submission::SubmissionLog;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{admin, handlers, ws};

/// Build the complete router for the leaderboard server.
///
/// Public routes:
/// - `GET /` -- HTML leaderboard page
/// - `GET /leaderboard/status/{key}` -- competition status
/// - `GET /leaderboard/check/{key}` -- existence and role check
/// - `PATCH /leaderboard/submit/{key}/{guess}` -- record a guess
/// - `GET /leaderboard/ws` -- snapshot stream
///
/// Admin routes live under `/api/admin/{key}/`; see [`admin`].
pub fn build_router<L: SubmissionLog>(state: Arc<AppState<L>>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index::<L>))
        // Polling API
        .route("/leaderboard/status/{key}", get(handlers::status::<L>))
        .route("/leaderboard/check/{key}", get(handlers::check::<L>))
        .route(
            "/leaderboard/submit/{key}/{guess}",
            patch(handlers::submit::<L>),
        )
        .route("/leaderboard/ws", get(ws::leaderboard_ws::<L>))
        // Administration
        .route("/api/admin/{key}/pause", post(admin::pause::<L>))
        .route("/api/admin/{key}/resume", post(admin::resume::<L>))
        .route("/api/admin/{key}/restart", post(admin::restart::<L>))
        .route(
            "/api/admin/{key}/submissions",
            get(admin::list_submissions::<L>).delete(admin::clear_submissions::<L>),
        )
        .route("/api/admin/{key}/disqualify", post(admin::disqualify::<L>))
        .route("/api/admin/{key}/groups", post(admin::add_group::<L>))
        .route(
            "/api/admin/{key}/groups/{name}",
            delete(admin::remove_group::<L>),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

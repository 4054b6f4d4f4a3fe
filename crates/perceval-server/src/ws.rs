//! `WebSocket` stream of leaderboard snapshots.
//!
//! Clients connect to `GET /leaderboard/ws` and receive the public
//! [`LeaderboardStatus`](perceval_types::LeaderboardStatus) as a JSON text
//! frame after every tick. A client that falls behind skips to the newest
//! snapshot.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use perceval_core::submission::SubmissionLog;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::state::AppState;

/// Upgrade to a `WebSocket` and start streaming leaderboard snapshots.
pub async fn leaderboard_ws<L: SubmissionLog>(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState<L>>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

async fn handle_ws<L: SubmissionLog>(mut socket: WebSocket, state: Arc<AppState<L>>) {
    debug!("Leaderboard client connected");

    let mut rx = state.subscribe();

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(status) => {
                        let json = match serde_json::to_string(&status) {
                            Ok(j) => j,
                            Err(e) => {
                                warn!("Failed to serialize leaderboard snapshot: {e}");
                                continue;
                            }
                        };
                        if socket.send(Message::Text(json.into())).await.is_err() {
                            debug!("Leaderboard client disconnected (send failed)");
                            return;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        debug!(skipped = n, "Leaderboard client lagged, skipping ahead");
                    }
                    Err(RecvError::Closed) => {
                        debug!("Broadcast channel closed, closing leaderboard socket");
                        return;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("Leaderboard client disconnected");
                        return;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!("Leaderboard client disconnected (pong failed)");
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        debug!("Leaderboard socket error: {e}");
                        return;
                    }
                    // Clients have nothing to say.
                    _ => {}
                }
            }
        }
    }
}

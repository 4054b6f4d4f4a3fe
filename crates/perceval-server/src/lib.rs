//! Leaderboard API server for the Perceval guessing competition.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **Group endpoints** (`/leaderboard/...`) for status polling, key
//!   checks, and guess submission
//! - **`WebSocket` endpoint** (`/leaderboard/ws`) streaming the public
//!   leaderboard pushed by the tick loop via [`tokio::sync::broadcast`]
//! - **Admin endpoints** (`/api/admin/{key}/...`) for clock control,
//!   submission inspection, disqualification, and roster edits
//! - **HTML leaderboard page** (`GET /`) rendered with `minijinja`
//!
//! # Architecture
//!
//! Every handler goes through the shared [`CompetitionHandle`], the single
//! synchronized entry point to the competition. The server never touches
//! the round state directly.
//!
//! [`CompetitionHandle`]: perceval_core::competition::CompetitionHandle

pub mod admin;
pub mod error;
pub mod handlers;
pub mod pages;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use startup::{SpawnedServer, spawn_server};
pub use state::{AppState, SharedState};

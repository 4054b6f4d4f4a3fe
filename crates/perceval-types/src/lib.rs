//! Shared type definitions for the Perceval guessing competition.
//!
//! This crate is the single source of truth for the types exchanged between
//! the competition core, the HTTP layer, and the playback client. Types flow
//! downstream to `TypeScript` via `ts-rs` for the leaderboard page.
//!
//! # Modules
//!
//! - [`ids`] -- Opaque group key wrapper
//! - [`enums`] -- The [`Guess`] category set, including reserved meta-values
//! - [`structs`] -- Leaderboard rows, status payloads, and submissions

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{Guess, UnknownGuess};
pub use ids::GroupKey;
pub use structs::{
    Answer, GroupCheck, LeaderboardRow, LeaderboardStatus, NewSubmission, Submission,
};

#[cfg(test)]
mod tests {
    //! Integration tests for type exports and `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // ts-rs generates TypeScript bindings when types with
        // #[ts(export)] are used. The files are written to the `bindings/`
        // directory relative to the crate root.
        use ts_rs::TS;

        let _ = crate::ids::GroupKey::export_all();
        let _ = crate::enums::Guess::export_all();
        let _ = crate::structs::Answer::export_all();
        let _ = crate::structs::LeaderboardRow::export_all();
        let _ = crate::structs::LeaderboardStatus::export_all();
        let _ = crate::structs::GroupCheck::export_all();
        let _ = crate::structs::Submission::export_all();
    }
}

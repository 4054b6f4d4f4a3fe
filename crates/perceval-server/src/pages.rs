//! HTML leaderboard page rendered with `minijinja`.
//!
//! The template is compiled into the binary so the server has no runtime
//! dependency on the working directory. The page renders the current
//! public status, then keeps itself up to date from the leaderboard
//! `WebSocket`.

use minijinja::{Environment, context};
use perceval_types::LeaderboardStatus;

use crate::error::ApiError;

/// Name of the leaderboard page template.
pub const LEADERBOARD_TEMPLATE: &str = "leaderboard.html";

/// Build the template environment with every page registered.
pub fn environment() -> Environment<'static> {
    let mut env = Environment::new();
    if let Err(e) = env.add_template(
        LEADERBOARD_TEMPLATE,
        include_str!("../templates/leaderboard.html"),
    ) {
        tracing::error!(error = %e, "Failed to compile leaderboard template");
    }
    env
}

/// Render the leaderboard page for `status`.
///
/// # Errors
///
/// Returns [`ApiError::Internal`] if the template is missing or fails to
/// render.
pub fn render_leaderboard(
    env: &Environment<'static>,
    status: &LeaderboardStatus,
) -> Result<String, ApiError> {
    env.get_template(LEADERBOARD_TEMPLATE)
        .map_err(|e| ApiError::Internal(format!("missing leaderboard template: {e}")))?
        .render(context! { status })
        .map_err(|e| ApiError::Internal(format!("leaderboard render failed: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use perceval_types::{Answer, Guess, LeaderboardRow};
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn renders_rows_and_hides_future_laps() {
        let status = LeaderboardStatus {
            current_correct_guess: None,
            current_round: 0,
            current_lap: 0,
            number_of_rounds: 2,
            number_of_laps: 2,
            paused: true,
            time_before_next_lap: 13.0,
            time_before_playing: 4.2,
            accepts_submissions: false,
            finished: false,
            leaderboard: vec![LeaderboardRow {
                name: "Les Chevaliers".to_owned(),
                answers: vec![
                    Answer {
                        guess: Guess::Chainsaw,
                        correct: true,
                        hide: false,
                    },
                    Answer {
                        guess: Guess::Fire,
                        correct: false,
                        hide: true,
                    },
                ],
                score: Decimal::ONE,
            }],
        };

        let html = render_leaderboard(&environment(), &status).unwrap();
        assert!(html.contains("Les Chevaliers"));
        assert!(html.contains("PAUSED"));
        assert!(html.contains(">chainsaw<"));
        assert!(!html.contains(">fire<"));
    }
}

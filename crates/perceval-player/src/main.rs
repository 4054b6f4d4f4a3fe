//! Playback client for the Perceval guessing competition.
//!
//! Stands next to the speakers: it polls the leaderboard as an admin,
//! plays each lap's cue at its scheduled offset, and submits the correct
//! category as a reference. With `LEADERBOARD_RANDOM_KEY` set it also
//! submits a uniformly random guess per lap, as a chance baseline.

mod client;
mod config;
mod cue;
mod error;
mod player;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::PlayerConfig;
use crate::cue::LoggingCuePlayer;
use crate::player::Player;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the keys are
/// rejected by the server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("perceval-player starting");

    let config = PlayerConfig::from_env()?;
    info!(
        url = config.url,
        random_guesser = config.random_key.is_some(),
        poll_ms = config.poll_interval.as_millis(),
        sound_ms = config.sound_duration.as_millis(),
        "Configuration loaded"
    );

    let mut player = Player::new(config, LoggingCuePlayer::default());
    player.wait_until_ready().await?;

    tokio::select! {
        () = player.run() => {}
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Shutdown signal received");
        }
    }

    info!("perceval-player stopped");
    Ok(())
}

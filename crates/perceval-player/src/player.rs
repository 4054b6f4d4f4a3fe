//! The playback loop.
//!
//! The player polls the status as an admin, plays the cue of every lap at
//! its scheduled offset, and submits the correct category for the admin
//! group (and a random one for the random guesser, if configured). Each
//! `(round, lap)` is played at most once; laps joined after their cue
//! start are skipped.

use std::collections::HashSet;
use std::time::Duration;

use perceval_types::{Guess, LeaderboardStatus};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::client::LeaderboardClient;
use crate::config::PlayerConfig;
use crate::cue::CuePlayer;
use crate::error::PlayerError;

/// What to do after reading one status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The competition is paused; poll again after the delay.
    Paused(Duration),
    /// This lap was already handled; poll again after the delay.
    AlreadyPlayed(Duration),
    /// The cue start has passed; skip to the next lap.
    TooLate {
        /// The category that should have played.
        guess: Guess,
        /// Time until the next lap.
        wait: Duration,
    },
    /// Play `guess` after `after`.
    Play {
        /// The category to play and submit.
        guess: Guess,
        /// Time until the cue starts.
        after: Duration,
    },
}

/// Decide the next step from an admin status. Records the lap as handled
/// unless the competition is paused.
pub fn plan(
    status: &LeaderboardStatus,
    played: &mut HashSet<(usize, usize)>,
    poll: Duration,
) -> Result<Step, PlayerError> {
    if status.paused {
        return Ok(Step::Paused(poll));
    }

    let next_lap = seconds(status.time_before_next_lap);
    if !played.insert((status.current_round, status.current_lap)) {
        return Ok(Step::AlreadyPlayed(poll.min(next_lap)));
    }

    let guess = status
        .current_correct_guess
        .ok_or_else(|| PlayerError::Malformed("status carries no correct guess".to_owned()))?;

    if status.time_before_playing < 0.0 {
        return Ok(Step::TooLate {
            guess,
            wait: next_lap,
        });
    }
    Ok(Step::Play {
        guess,
        after: seconds(status.time_before_playing),
    })
}

/// Drives one leaderboard.
pub struct Player<C> {
    client: LeaderboardClient,
    config: PlayerConfig,
    cue: C,
    played: HashSet<(usize, usize)>,
    rng: StdRng,
}

impl<C: CuePlayer> Player<C> {
    /// Create a player for `config`, playing cues through `cue`.
    pub fn new(config: PlayerConfig, cue: C) -> Self {
        Self {
            client: LeaderboardClient::new(&config.url),
            config,
            cue,
            played: HashSet::new(),
            rng: StdRng::from_os_rng(),
        }
    }

    /// Wait for the server to come up and confirm the keys.
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::NotAdmin`] if the admin key lacks admin
    /// rights and [`PlayerError::UnknownKey`] for an unregistered key.
    pub async fn wait_until_ready(&self) -> Result<(), PlayerError> {
        loop {
            match self.client.check(&self.config.admin_key).await {
                Ok(check) if !check.admin => return Err(PlayerError::NotAdmin),
                Ok(_) => break,
                Err(e @ PlayerError::UnknownKey(_)) => return Err(e),
                Err(e) => {
                    info!(error = %e, "Waiting for the server to be ready");
                    sleep(self.config.poll_interval).await;
                }
            }
        }

        if let Some(random_key) = &self.config.random_key {
            self.client.check(random_key).await?;
        }
        info!("Keys confirmed");
        Ok(())
    }

    /// Run the playback loop forever.
    pub async fn run(&mut self) {
        loop {
            let started = Instant::now();
            let status = match self.client.status(&self.config.admin_key).await {
                Ok(status) => status,
                Err(e) => {
                    warn!(error = %e, "Status request failed");
                    sleep(self.config.poll_interval).await;
                    continue;
                }
            };
            debug!(
                elapsed_ms = started.elapsed().as_millis(),
                round = status.current_round,
                lap = status.current_lap,
                "Status received"
            );

            match plan(&status, &mut self.played, self.config.poll_interval) {
                Ok(Step::Paused(wait)) => {
                    debug!("Leaderboard is paused");
                    sleep(wait).await;
                }
                Ok(Step::AlreadyPlayed(wait)) => sleep(wait).await,
                Ok(Step::TooLate { guess, wait }) => {
                    info!(category = %guess, "Too late for playing");
                    sleep(wait).await;
                }
                Ok(Step::Play { guess, after }) => {
                    info!(category = %guess, in_ms = after.as_millis(), "Cue scheduled");
                    sleep(after).await;
                    self.play(guess).await;
                }
                Err(e) => {
                    warn!(error = %e, "Cannot plan the lap");
                    sleep(self.config.poll_interval).await;
                }
            }
        }
    }

    async fn play(&mut self, guess: Guess) {
        self.cue.play(guess);
        let started = Instant::now();

        if let Err(e) = self.client.submit(&self.config.admin_key, guess).await {
            warn!(error = %e, "Reference submission failed");
        }
        if let Some(random_key) = &self.config.random_key {
            let random = random_guess(&mut self.rng);
            if let Err(e) = self.client.submit(random_key, random).await {
                warn!(error = %e, "Random submission failed");
            }
        }

        sleep(self.config.sound_duration.saturating_sub(started.elapsed())).await;
    }
}

/// Draw a uniformly random guessable category.
pub fn random_guess(rng: &mut impl Rng) -> Guess {
    Guess::guessable_from_index(rng.random_range(0..Guess::GUESSABLE.len()))
}

fn seconds(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const POLL: Duration = Duration::from_millis(200);

    fn status(paused: bool, lap: usize, before_playing: f64) -> LeaderboardStatus {
        LeaderboardStatus {
            current_correct_guess: Some(Guess::Fire),
            current_round: 1,
            current_lap: lap,
            number_of_rounds: 3,
            number_of_laps: 20,
            paused,
            time_before_next_lap: 8.0,
            time_before_playing: before_playing,
            accepts_submissions: false,
            finished: false,
            leaderboard: Vec::new(),
        }
    }

    #[test]
    fn paused_competition_only_polls() {
        let mut played = HashSet::new();
        let step = plan(&status(true, 0, 3.0), &mut played, POLL).unwrap();
        assert_eq!(step, Step::Paused(POLL));
        assert!(played.is_empty());
    }

    #[test]
    fn each_lap_plays_once() {
        let mut played = HashSet::new();
        let step = plan(&status(false, 4, 2.5), &mut played, POLL).unwrap();
        assert_eq!(
            step,
            Step::Play {
                guess: Guess::Fire,
                after: Duration::from_millis(2500),
            }
        );
        let step = plan(&status(false, 4, 1.0), &mut played, POLL).unwrap();
        assert_eq!(step, Step::AlreadyPlayed(POLL));

        let step = plan(&status(false, 5, 1.0), &mut played, POLL).unwrap();
        assert!(matches!(step, Step::Play { .. }));
    }

    #[test]
    fn late_laps_are_skipped() {
        let mut played = HashSet::new();
        let step = plan(&status(false, 0, -0.5), &mut played, POLL).unwrap();
        assert_eq!(
            step,
            Step::TooLate {
                guess: Guess::Fire,
                wait: Duration::from_secs(8),
            }
        );
    }

    #[test]
    fn status_without_answer_is_malformed() {
        let mut played = HashSet::new();
        let mut hidden = status(false, 0, 1.0);
        hidden.current_correct_guess = None;
        assert!(matches!(
            plan(&hidden, &mut played, POLL),
            Err(PlayerError::Malformed(_))
        ));
    }

    #[test]
    fn random_guesses_are_guessable() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            assert!(random_guess(&mut rng).is_guessable());
        }
    }
}

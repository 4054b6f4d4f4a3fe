//! Configuration loading and typed config structures for the competition.
//!
//! The canonical configuration lives in `perceval-config.yaml`. It holds the
//! server settings, the registered groups, and the round/timing setup. This
//! module defines serde structs mirroring that document, field-level
//! validation through [`validator`], and conversion of the round setup into
//! a checked [`CompetitionSpec`].
//!
//! The document is also written back by the engine whenever an
//! administrative change to the roster marks it dirty, so every struct here
//! round-trips through YAML.

use std::path::Path;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::roster::{Roster, RosterError};
use crate::timing::{
    CompetitionFlags, CompetitionSpec, RoundSpec, Timing, TimingError, positive_secs,
};

/// Errors that can occur when loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read or write the configuration file.
    #[error("failed to access config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse or emit YAML content.
    #[error("failed to process config YAML: {source}")]
    Yaml {
        /// The underlying YAML error.
        source: serde_yml::Error,
    },

    /// A field failed its declared constraints.
    #[error("invalid configuration: {source}")]
    Validation {
        /// The collected field errors.
        #[from]
        source: validator::ValidationErrors,
    },

    /// The round setup is infeasible.
    #[error("invalid round timing: {source}")]
    Timing {
        /// The underlying timing error.
        #[from]
        source: TimingError,
    },

    /// The group roster is inconsistent.
    #[error("invalid group roster: {source}")]
    Roster {
        /// The underlying roster error.
        #[from]
        source: RosterError,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct PercevalConfig {
    /// Server and infrastructure settings.
    #[serde(default)]
    #[validate(nested)]
    pub server: ServerSettings,

    /// Registered groups, in leaderboard order.
    #[serde(default)]
    #[validate(nested)]
    pub group_configs: Vec<GroupConfig>,

    /// Round and timing setup.
    #[serde(default)]
    #[validate(nested)]
    pub rounds_config: RoundsConfig,
}

impl PercevalConfig {
    /// Load the configuration document from a YAML file, exactly as
    /// written. See [`with_env_overrides`](Self::with_env_overrides) for
    /// the runtime view.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_yml::from_str(&contents)?)
    }

    /// Runtime copy of the document with process environment overrides
    /// applied:
    /// - `DATABASE_URL` overrides `server.database_url`
    /// - `PERCEVAL_PORT` overrides `server.port`
    ///
    /// The document itself is left as written, so it can be saved back
    /// without leaking deployment secrets into the file.
    #[must_use]
    pub fn with_env_overrides(&self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Like [`with_env_overrides`](Self::with_env_overrides), reading
    /// variables through `lookup`.
    #[must_use]
    pub fn with_overrides(&self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut runtime = self.clone();
        runtime.server.apply_overrides(lookup);
        runtime
    }

    /// Parse configuration from a YAML string. No environment overrides
    /// are applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Render the document as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if serialization fails.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yml::to_string(self)?)
    }

    /// Write the document to `path`, replacing any previous content.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if serialization or the write fails.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let yaml = self.to_yaml()?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Run every check on the document and build the validated core
    /// values: the competition description and the group roster.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] for field-level violations,
    /// [`ConfigError::Timing`] for infeasible laps, and
    /// [`ConfigError::Roster`] for duplicate keys or names.
    pub fn validated(&self) -> Result<(CompetitionSpec, Roster), ConfigError> {
        self.validate()?;
        let spec = self.rounds_config.to_spec()?;
        let roster = Roster::new(self.group_configs.clone())?;
        Ok((spec, roster))
    }
}

/// Server and infrastructure settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ServerSettings {
    /// Address to bind the HTTP server to.
    #[serde(default = "default_host")]
    #[validate(length(min = 1))]
    pub host: String,

    /// TCP port of the HTTP server.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Interval between two resolutions of the competition position.
    #[serde(default = "default_tick_interval_ms")]
    #[validate(range(min = 100))]
    pub tick_interval_ms: u64,

    /// Interval between two checks of the "needs save" flag.
    #[serde(default = "default_save_interval_ms")]
    #[validate(range(min = 100))]
    pub save_interval_ms: u64,

    /// `PostgreSQL` URL of the submission log. In-memory log when absent.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Upper bound on open database connections.
    #[serde(default = "default_database_max_connections")]
    #[validate(range(min = 1))]
    pub database_max_connections: u32,

    /// How long to wait for a database connection before failing.
    #[serde(default = "default_database_connect_timeout_ms")]
    #[validate(range(min = 100))]
    pub database_connect_timeout_ms: u64,

    /// Flag guesses made outside the cue window as disqualified.
    #[serde(default)]
    pub disqualify_outside_window: bool,
}

impl ServerSettings {
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("DATABASE_URL") {
            self.database_url = Some(url);
        }
        if let Some(port) = lookup("PERCEVAL_PORT").and_then(|raw| raw.parse::<u16>().ok()) {
            self.port = port;
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            tick_interval_ms: default_tick_interval_ms(),
            save_interval_ms: default_save_interval_ms(),
            database_url: None,
            database_max_connections: default_database_max_connections(),
            database_connect_timeout_ms: default_database_connect_timeout_ms(),
            disqualify_outside_window: false,
        }
    }
}

/// A registered group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct GroupConfig {
    /// Secret key identifying the group on the API.
    #[validate(length(min = 1, max = 128))]
    pub key: String,

    /// Display name shown on the leaderboard.
    #[validate(length(min = 1, max = 128))]
    pub name: String,

    /// Whether the group holds administrative rights.
    #[serde(default)]
    pub admin: bool,
}

/// Static configuration of one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct RoundConfig {
    /// Number of laps in the round.
    #[serde(default = "default_lap_count")]
    #[validate(range(min = 1))]
    pub lap_count: usize,

    /// Duration of each lap, in seconds.
    #[serde(default = "default_lap_duration")]
    #[validate(range(exclusive_min = 0.0))]
    pub lap_duration: f64,

    /// Any guess counts as correct (detection-only calibration round).
    #[serde(default)]
    pub only_check_for_presence: bool,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            lap_count: default_lap_count(),
            lap_duration: default_lap_duration(),
            only_check_for_presence: false,
        }
    }
}

/// Round sequence and timing constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[allow(clippy::struct_excessive_bools)]
pub struct RoundsConfig {
    /// Rounds, in play order.
    #[serde(default = "default_rounds")]
    #[validate(length(min = 1), nested)]
    pub rounds: Vec<RoundConfig>,

    /// Seed fixing the answer schedule.
    #[serde(default = "default_seed")]
    #[validate(range(min = 1))]
    pub seed: u64,

    /// Start (and restart) with the clock paused.
    #[serde(default = "default_true")]
    pub start_paused: bool,

    /// Restart from the first round once the last one is over.
    #[serde(default)]
    pub restart_when_finished: bool,

    /// Pause the clock whenever a new round begins.
    #[serde(default = "default_true")]
    pub pause_between_rounds: bool,

    /// Extra seconds after the cue during which guesses are accepted.
    #[serde(default = "default_latency_margin")]
    #[validate(range(exclusive_min = 0.0))]
    pub latency_margin: f64,

    /// Minimum seconds between lap start and cue start.
    #[serde(default = "default_delay_before_playing")]
    #[validate(range(exclusive_min = 0.0))]
    pub delay_before_playing: f64,

    /// Minimum seconds of silence after the cue before the lap ends.
    #[serde(default = "default_delay_after_playing")]
    #[validate(range(exclusive_min = 0.0))]
    pub delay_after_playing: f64,

    /// Cue duration, in seconds.
    #[serde(default = "default_sound_duration")]
    #[validate(range(exclusive_min = 0.0))]
    pub sound_duration: f64,
}

impl RoundsConfig {
    /// Convert into a checked [`CompetitionSpec`].
    ///
    /// # Errors
    ///
    /// Returns [`TimingError`] for non-positive durations, empty rounds, or
    /// laps too short for the fixed overhead.
    pub fn to_spec(&self) -> Result<CompetitionSpec, TimingError> {
        let timing = Timing {
            latency_margin: positive_secs("latency_margin", self.latency_margin)?,
            pre_delay: positive_secs("delay_before_playing", self.delay_before_playing)?,
            post_delay: positive_secs("delay_after_playing", self.delay_after_playing)?,
            cue_duration: positive_secs("sound_duration", self.sound_duration)?,
        };

        let rounds = self
            .rounds
            .iter()
            .map(|round| {
                Ok(RoundSpec::new(
                    round.lap_count,
                    positive_secs("lap_duration", round.lap_duration)?,
                    round.only_check_for_presence,
                ))
            })
            .collect::<Result<Vec<_>, TimingError>>()?;

        let flags = CompetitionFlags {
            start_paused: self.start_paused,
            pause_between_rounds: self.pause_between_rounds,
            restart_when_finished: self.restart_when_finished,
        };

        CompetitionSpec::new(rounds, timing, flags, self.seed)
    }
}

impl Default for RoundsConfig {
    fn default() -> Self {
        Self {
            rounds: default_rounds(),
            seed: default_seed(),
            start_paused: true,
            restart_when_finished: false,
            pause_between_rounds: true,
            latency_margin: default_latency_margin(),
            delay_before_playing: default_delay_before_playing(),
            delay_after_playing: default_delay_after_playing(),
            sound_duration: default_sound_duration(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    5000
}

const fn default_tick_interval_ms() -> u64 {
    1000
}

const fn default_save_interval_ms() -> u64 {
    5000
}

const fn default_database_max_connections() -> u32 {
    10
}

const fn default_database_connect_timeout_ms() -> u64 {
    5_000
}

const fn default_true() -> bool {
    true
}

const fn default_lap_count() -> usize {
    20
}

const fn default_lap_duration() -> f64 {
    13.0
}

/// One presence-only calibration round followed by four scored rounds.
fn default_rounds() -> Vec<RoundConfig> {
    let mut rounds = vec![RoundConfig {
        only_check_for_presence: true,
        ..RoundConfig::default()
    }];
    rounds.extend(std::iter::repeat_n(RoundConfig::default(), 4));
    rounds
}

const fn default_seed() -> u64 {
    1234
}

const fn default_latency_margin() -> f64 {
    1.0
}

const fn default_delay_before_playing() -> f64 {
    2.0
}

const fn default_delay_after_playing() -> f64 {
    1.0
}

const fn default_sound_duration() -> f64 {
    5.0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = PercevalConfig::default();
        let (spec, roster) = config.validated().unwrap();
        assert_eq!(spec.round_count(), 5);
        assert!(spec.rounds().first().unwrap().presence_only());
        assert_eq!(spec.timing().overhead(), Duration::from_secs(9));
        assert!(spec.flags().start_paused);
        assert!(roster.is_empty());
    }

    #[test]
    fn shipped_config_is_valid() {
        let config =
            PercevalConfig::parse(include_str!("../../../perceval-config.yaml")).unwrap();
        let (spec, roster) = config.validated().unwrap();
        assert_eq!(spec.round_count(), 5);
        assert_eq!(roster.len(), 2);
        assert!(config.server.database_url.is_none());
    }

    #[test]
    fn overrides_only_touch_the_runtime_copy() {
        let document = PercevalConfig::default();
        let runtime = document.with_overrides(|name| match name {
            "DATABASE_URL" => Some("postgres://secret@db/perceval".to_owned()),
            "PERCEVAL_PORT" => Some("9100".to_owned()),
            _ => None,
        });
        assert_eq!(
            runtime.server.database_url.as_deref(),
            Some("postgres://secret@db/perceval")
        );
        assert_eq!(runtime.server.port, 9100);
        assert_eq!(document, PercevalConfig::default());
        assert!(!document.to_yaml().unwrap().contains("secret"));

        let bad_port = document.with_overrides(|name| {
            (name == "PERCEVAL_PORT").then(|| "not-a-port".to_owned())
        });
        assert_eq!(bad_port.server.port, document.server.port);
    }

    #[test]
    fn parses_minimal_yaml_with_defaults() {
        let yaml = r"
group_configs:
  - key: admin-key
    name: Organisers
    admin: true
  - key: k1
    name: Team One
rounds_config:
  rounds:
    - lap_count: 3
      lap_duration: 10
  seed: 7
";
        let config = PercevalConfig::parse(yaml).unwrap();
        assert_eq!(config.group_configs.len(), 2);
        assert!(!config.group_configs.get(1).unwrap().admin);
        assert_eq!(config.rounds_config.seed, 7);
        assert!(config.rounds_config.pause_between_rounds);
        assert_eq!(config.server.port, 5000);

        let (spec, roster) = config.validated().unwrap();
        assert_eq!(spec.round_count(), 1);
        assert_eq!(roster.len(), 2);
    }

    #[test]
    fn rejects_unknown_top_level_fields() {
        let yaml = "unexpected: true\n";
        assert!(matches!(
            PercevalConfig::parse(yaml),
            Err(ConfigError::Yaml { .. })
        ));
    }

    #[test]
    fn rejects_short_laps() {
        let mut config = PercevalConfig::default();
        config.rounds_config.rounds = vec![RoundConfig {
            lap_count: 3,
            lap_duration: 8.5,
            only_check_for_presence: false,
        }];
        assert!(matches!(
            config.validated(),
            Err(ConfigError::Timing {
                source: TimingError::LapTooShort { .. }
            })
        ));
    }

    #[test]
    fn rejects_field_constraint_violations() {
        let mut config = PercevalConfig::default();
        config.group_configs.push(GroupConfig {
            key: String::new(),
            name: "Nameless".to_owned(),
            admin: false,
        });
        assert!(matches!(
            config.validated(),
            Err(ConfigError::Validation { .. })
        ));

        let mut config = PercevalConfig::default();
        config.rounds_config.sound_duration = -1.0;
        assert!(matches!(
            config.validated(),
            Err(ConfigError::Validation { .. })
        ));

        let mut config = PercevalConfig::default();
        config.rounds_config.rounds.clear();
        assert!(config.validated().is_err());
    }

    #[test]
    fn rejects_duplicate_group_names() {
        let mut config = PercevalConfig::default();
        for key in ["a", "b"] {
            config.group_configs.push(GroupConfig {
                key: key.to_owned(),
                name: "Same".to_owned(),
                admin: false,
            });
        }
        assert!(matches!(
            config.validated(),
            Err(ConfigError::Roster {
                source: RosterError::DuplicateName(_)
            })
        ));
    }

    #[test]
    fn yaml_round_trip_preserves_document() {
        let mut config = PercevalConfig::default();
        config.group_configs.push(GroupConfig {
            key: "k".to_owned(),
            name: "n".to_owned(),
            admin: true,
        });
        config.server.database_url = Some("postgresql://localhost/perceval".to_owned());
        let yaml = config.to_yaml().unwrap();
        let back = PercevalConfig::parse(&yaml).unwrap();
        assert_eq!(back, config);
    }
}

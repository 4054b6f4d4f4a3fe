//! The category set used by the competition.
//!
//! Five categories can be played and guessed. Three further values are
//! reserved for bookkeeping and can never be the correct answer for a lap:
//!
//! | Value | Wire name | Meaning |
//! |-------|-----------|---------|
//! | [`Guess::Nothing`] | `none` | No submission for the slot |
//! | [`Guess::Received`] | `acknowledged` | Presence-only lap with a submission |
//! | [`Guess::Disqualified`] | `disqualified` | Slot carries a disqualified submission |

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A category value: either a guessable category or a reserved meta-value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum Guess {
    /// Bird song.
    Birds,
    /// A running chainsaw.
    Chainsaw,
    /// A crackling fire.
    Fire,
    /// A handsaw cutting wood.
    Handsaw,
    /// A helicopter passing by.
    Helicopter,
    /// No guess was submitted.
    #[serde(rename = "none", alias = "nothing")]
    Nothing,
    /// A guess was received during a presence-only round.
    #[serde(rename = "acknowledged", alias = "received")]
    Received,
    /// The slot was disqualified.
    Disqualified,
}

/// Error returned when parsing an unknown category name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category: `{0}`")]
pub struct UnknownGuess(pub String);

impl Guess {
    /// Every category that can be played and guessed, in declaration order.
    pub const GUESSABLE: [Self; 5] = [
        Self::Birds,
        Self::Chainsaw,
        Self::Fire,
        Self::Handsaw,
        Self::Helicopter,
    ];

    /// Whether this value is a real category rather than a meta-value.
    pub const fn is_guessable(self) -> bool {
        !matches!(self, Self::Nothing | Self::Received | Self::Disqualified)
    }

    /// Map an index in `0..GUESSABLE.len()` to a guessable category.
    ///
    /// Out-of-range indices wrap around, so any `usize` maps to a valid
    /// category.
    pub const fn guessable_from_index(index: usize) -> Self {
        match index.checked_rem(Self::GUESSABLE.len()) {
            Some(0) | None => Self::Birds,
            Some(1) => Self::Chainsaw,
            Some(2) => Self::Fire,
            Some(3) => Self::Handsaw,
            Some(_) => Self::Helicopter,
        }
    }

    /// The wire name of this value.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Birds => "birds",
            Self::Chainsaw => "chainsaw",
            Self::Fire => "fire",
            Self::Handsaw => "handsaw",
            Self::Helicopter => "helicopter",
            Self::Nothing => "none",
            Self::Received => "acknowledged",
            Self::Disqualified => "disqualified",
        }
    }
}

impl fmt::Display for Guess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Guess {
    type Err = UnknownGuess;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "birds" => Ok(Self::Birds),
            "chainsaw" => Ok(Self::Chainsaw),
            "fire" => Ok(Self::Fire),
            "handsaw" => Ok(Self::Handsaw),
            "helicopter" => Ok(Self::Helicopter),
            "none" | "nothing" => Ok(Self::Nothing),
            "acknowledged" | "received" => Ok(Self::Received),
            "disqualified" => Ok(Self::Disqualified),
            other => Err(UnknownGuess(other.to_owned())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn meta_values_are_not_guessable() {
        assert!(!Guess::Nothing.is_guessable());
        assert!(!Guess::Received.is_guessable());
        assert!(!Guess::Disqualified.is_guessable());
        assert!(Guess::GUESSABLE.iter().all(|g| g.is_guessable()));
    }

    #[test]
    fn index_mapping_covers_all_guessable() {
        for (i, expected) in Guess::GUESSABLE.iter().enumerate() {
            assert_eq!(Guess::guessable_from_index(i), *expected);
        }
        assert_eq!(Guess::guessable_from_index(5), Guess::Birds);
    }

    #[test]
    fn wire_names_match_display_and_parse() {
        for guess in [
            Guess::Birds,
            Guess::Helicopter,
            Guess::Nothing,
            Guess::Received,
            Guess::Disqualified,
        ] {
            let json = serde_json::to_string(&guess).unwrap();
            assert_eq!(json, format!("\"{guess}\""));
            assert_eq!(guess.as_str().parse::<Guess>().unwrap(), guess);
        }
    }

    #[test]
    fn legacy_names_are_accepted() {
        let nothing: Guess = serde_json::from_str("\"nothing\"").unwrap();
        assert_eq!(nothing, Guess::Nothing);
        assert_eq!("Received".parse::<Guess>().unwrap(), Guess::Received);
        assert!("trumpet".parse::<Guess>().is_err());
    }
}

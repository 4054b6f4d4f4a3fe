//! Opaque identifier for a registered group.
//!
//! A group is identified on the wire by a secret key handed out by the
//! organisers. The key is never parsed or interpreted; it is only compared.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// The secret key identifying a registered group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GroupKey(pub String);

impl GroupKey {
    /// Wrap a raw key string.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Borrow the raw key string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GroupKey {
    fn from(key: &str) -> Self {
        Self(key.to_owned())
    }
}

impl From<String> for GroupKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

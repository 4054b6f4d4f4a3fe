//! Registered groups.
//!
//! The roster keeps groups in configuration order, which is also the
//! leaderboard order. Keys and names are unique across the roster; the
//! invariant is checked on construction and on every addition.

use perceval_types::GroupKey;

use crate::config::GroupConfig;

/// Roster construction or update errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RosterError {
    /// Two groups share the same key.
    #[error("duplicate group key")]
    DuplicateKey(String),

    /// Two groups share the same display name.
    #[error("duplicate group name: {0}")]
    DuplicateName(String),
}

/// A lookup for a group that is not registered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// No group holds this key.
    #[error("unknown group key")]
    UnknownKey(GroupKey),

    /// No group has this display name.
    #[error("unknown group name: {0}")]
    UnknownName(String),
}

/// Ordered set of registered groups with unique keys and names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    groups: Vec<GroupConfig>,
}

impl Roster {
    /// Build a roster, rejecting duplicate keys or names.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError`] naming the first duplicate found.
    pub fn new(groups: Vec<GroupConfig>) -> Result<Self, RosterError> {
        let mut roster = Self::default();
        for group in groups {
            roster.add(group)?;
        }
        Ok(roster)
    }

    /// Append a group at the end of the roster.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError`] if the key or the name is already taken.
    pub fn add(&mut self, group: GroupConfig) -> Result<(), RosterError> {
        if self.groups.iter().any(|g| g.key == group.key) {
            return Err(RosterError::DuplicateKey(group.key));
        }
        if self.groups.iter().any(|g| g.name == group.name) {
            return Err(RosterError::DuplicateName(group.name));
        }
        self.groups.push(group);
        Ok(())
    }

    /// Remove the group named `name` and return it.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::UnknownName`] if no such group exists.
    pub fn remove(&mut self, name: &str) -> Result<GroupConfig, LookupError> {
        let index = self
            .groups
            .iter()
            .position(|g| g.name == name)
            .ok_or_else(|| LookupError::UnknownName(name.to_owned()))?;
        Ok(self.groups.remove(index))
    }

    /// Find a group by key.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::UnknownKey`] if no group holds `key`.
    pub fn by_key(&self, key: &GroupKey) -> Result<&GroupConfig, LookupError> {
        self.groups
            .iter()
            .find(|g| g.key == key.as_str())
            .ok_or_else(|| LookupError::UnknownKey(key.clone()))
    }

    /// Find a group by display name.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::UnknownName`] if no group has `name`.
    pub fn by_name(&self, name: &str) -> Result<&GroupConfig, LookupError> {
        self.groups
            .iter()
            .find(|g| g.name == name)
            .ok_or_else(|| LookupError::UnknownName(name.to_owned()))
    }

    /// Groups in roster order.
    pub fn groups(&self) -> &[GroupConfig] {
        &self.groups
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether no group is registered.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn group(key: &str, name: &str, admin: bool) -> GroupConfig {
        GroupConfig {
            key: key.to_owned(),
            name: name.to_owned(),
            admin,
        }
    }

    #[test]
    fn keeps_configuration_order() {
        let roster = Roster::new(vec![
            group("z", "Zulu", false),
            group("a", "Alpha", true),
        ])
        .unwrap();
        let names: Vec<_> = roster.groups().iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, ["Zulu", "Alpha"]);
    }

    #[test]
    fn rejects_duplicates() {
        let err = Roster::new(vec![group("a", "A", false), group("a", "B", false)]).unwrap_err();
        assert_eq!(err, RosterError::DuplicateKey("a".to_owned()));

        let mut roster = Roster::new(vec![group("a", "A", false)]).unwrap();
        let err = roster.add(group("b", "A", false)).unwrap_err();
        assert_eq!(err, RosterError::DuplicateName("A".to_owned()));
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn lookups_report_not_found() {
        let mut roster = Roster::new(vec![group("a", "A", true)]).unwrap();
        assert!(roster.by_key(&GroupKey::from("a")).unwrap().admin);
        assert!(matches!(
            roster.by_key(&GroupKey::from("missing")),
            Err(LookupError::UnknownKey(_))
        ));
        assert!(matches!(
            roster.by_name("B"),
            Err(LookupError::UnknownName(_))
        ));
        assert!(roster.remove("B").is_err());
        assert_eq!(roster.remove("A").unwrap().key, "a");
        assert!(roster.is_empty());
    }
}

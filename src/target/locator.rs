//! # Target locator.
//!
//! A [`Locator`] is the stable, operator-facing name of a watched entity:
//! `name@address`. It survives restarts of the entity and is what a watcher
//! re-resolves after every failure.
//!
//! ## Text form
//! ```text
//! ping@node-1   → name="ping", address="node-1"
//! ping          → name="ping", address="local"
//! a@b@c         → name="a@b",  address="c"      (split at the last '@')
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

/// Address used when a locator is written without `@address`.
pub const LOCAL_ADDRESS: &str = "local";

/// Stable identifier used to (re-)resolve a target.
///
/// Cheap to clone (`Arc`-backed).
///
/// ## Example
/// ```rust
/// use watchvisor::Locator;
///
/// let loc: Locator = "watcher@X".parse().unwrap();
/// assert_eq!(loc.name(), "watcher");
/// assert_eq!(loc.address(), "X");
/// assert_eq!(loc.to_string(), "watcher@X");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Locator {
    name: Arc<str>,
    address: Arc<str>,
}

/// Rejected locator text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocatorParseError {
    #[error("locator is empty")]
    Empty,
    #[error("locator {0:?} has an empty name")]
    EmptyName(String),
    #[error("locator {0:?} has an empty address")]
    EmptyAddress(String),
    #[error("locator {0:?} contains whitespace")]
    Whitespace(String),
}

impl Locator {
    /// Creates a locator from its parts.
    pub fn new(name: impl Into<Arc<str>>, address: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }

    /// Creates a locator on the local address.
    pub fn local(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, LOCAL_ADDRESS)
    }

    /// Entity name (path part).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Address part.
    pub fn address(&self) -> &str {
        &self.address
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.address)
    }
}

impl FromStr for Locator {
    type Err = LocatorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(LocatorParseError::Empty);
        }
        if s.chars().any(char::is_whitespace) {
            return Err(LocatorParseError::Whitespace(s.to_string()));
        }
        match s.rsplit_once('@') {
            None => Ok(Self::local(s)),
            Some(("", _)) => Err(LocatorParseError::EmptyName(s.to_string())),
            Some((_, "")) => Err(LocatorParseError::EmptyAddress(s.to_string())),
            Some((name, address)) => Ok(Self::new(name, address)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_name_is_local() {
        let loc: Locator = "ping".parse().unwrap();
        assert_eq!(loc, Locator::local("ping"));
        assert_eq!(loc.to_string(), "ping@local");
    }

    #[test]
    fn test_splits_at_last_at_sign() {
        let loc: Locator = "a@b@c".parse().unwrap();
        assert_eq!(loc.name(), "a@b");
        assert_eq!(loc.address(), "c");
    }

    #[test]
    fn test_rejects_malformed() {
        assert_eq!("".parse::<Locator>(), Err(LocatorParseError::Empty));
        assert!(matches!(
            "@x".parse::<Locator>(),
            Err(LocatorParseError::EmptyName(_))
        ));
        assert!(matches!(
            "x@".parse::<Locator>(),
            Err(LocatorParseError::EmptyAddress(_))
        ));
        assert!(matches!(
            "a b@c".parse::<Locator>(),
            Err(LocatorParseError::Whitespace(_))
        ));
    }
}

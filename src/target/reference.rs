//! # Target reference.
//!
//! A [`TargetRef`] names one *incarnation* of a target: the locator it was
//! found under plus an incarnation id handed out by the substrate. A target
//! restarted under the same locator gets a new id, so its reference compares
//! unequal to the old one.
//!
//! References are only minted by a [`Substrate`](crate::Substrate); there is
//! deliberately no `FromStr`.

use std::fmt;

use super::Locator;

/// Handle to one specific instance of a target.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TargetRef {
    locator: Locator,
    incarnation: u64,
}

impl TargetRef {
    /// Mints a reference. Intended for [`Substrate`](crate::Substrate) implementations.
    pub fn new(locator: Locator, incarnation: u64) -> Self {
        Self {
            locator,
            incarnation,
        }
    }

    /// Locator this instance was registered under.
    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    /// Substrate-assigned incarnation id.
    pub fn incarnation(&self) -> u64 {
        self.incarnation
    }
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.locator, self.incarnation)
    }
}

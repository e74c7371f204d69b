//! # Target identity and liveness messages.
//!
//! - [`Locator`] stable `name@address` used to find a target
//! - [`TargetRef`] one incarnation of a target (locator + incarnation id)
//! - [`Ping`] / [`Pong`] the confirmation exchange payloads

mod locator;
mod reference;

pub use locator::{LOCAL_ADDRESS, Locator, LocatorParseError};
pub use reference::TargetRef;

/// Liveness request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Ping;

/// Liveness reply.
///
/// `from` is the reference of the instance that actually answered; watchers
/// subscribe to this reference rather than the one they resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pong {
    /// Reference of the answering instance.
    pub from: TargetRef,
    /// Human-readable reply text (`"pong from <ref>"`).
    pub text: String,
}

impl Pong {
    /// Builds the standard reply for `from`.
    pub fn from_target(from: TargetRef) -> Self {
        let text = format!("pong from {from}");
        Self { from, text }
    }
}

use std::sync::Arc;

use crate::{
    core::Config,
    subscribers::{Subscribe, SubscriberSet},
    substrate::SubstrateRef,
};
use super::watchtower::Watchtower;

/// Builder for a [`Watchtower`].
pub struct WatchtowerBuilder {
    cfg: Config,
    substrate: SubstrateRef,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl WatchtowerBuilder {
    /// Creates a builder over `substrate` with the given configuration.
    pub fn new(cfg: Config, substrate: SubstrateRef) -> Self {
        Self {
            cfg,
            substrate,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers.
    ///
    /// Each subscriber gets a dedicated worker with a bounded queue; see
    /// [`SubscriberSet`].
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Adds one subscriber.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Builds the watchtower and starts its event listener.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Watchtower {
        Watchtower::new_internal(self.cfg, self.substrate, self.subscribers)
    }
}

//! Subscription handles

use std::sync::Weak;
use std::time::Duration;

use super::BrokerInner;
use crate::types::identifiers::Domain;

/// Per-subscription options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscribeOptions {
    /// Requested poll interval; the fastest request across all subscribers
    /// of a domain wins
    pub poll_interval: Option<Duration>,
}

impl SubscribeOptions {
    /// Request a poll interval
    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }
}

/// Live subscription to one domain
///
/// Dropping the handle unsubscribes. The supervisor behind it stops once the
/// last subscription is gone and the grace period has passed.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    domain: Domain,
    broker: Weak<BrokerInner>,
    released: bool,
}

impl Subscription {
    pub(super) fn new(id: u64, domain: Domain, broker: Weak<BrokerInner>) -> Self {
        Self {
            id,
            domain,
            broker,
            released: false,
        }
    }

    /// Subscription id, unique per broker
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Subscribed domain
    #[must_use]
    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// Unsubscribe now
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Some(broker) = self.broker.upgrade() {
            broker.release(self.domain, self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("domain", &self.domain)
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

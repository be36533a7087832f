//! Per-domain delivery hub
//!
//! Writes to the cache and fan-out to subscribers happen under one
//! re-entrant lock, so every subscriber sees snapshots in cache order. The
//! lock is re-entrant so a callback may subscribe or unsubscribe from inside
//! a delivery without deadlocking.

use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex, RwLock};

use crate::cache::{CacheStore, StaleMark};
use crate::supervisor::SnapshotSink;
use crate::types::identifiers::Domain;
use crate::types::snapshot::Snapshot;

/// Callback invoked with every accepted snapshot
pub type UpdateCallback = Arc<dyn Fn(&Arc<Snapshot>) + Send + Sync>;

/// One registered callback
pub(crate) struct Subscriber {
    id: u64,
    callback: UpdateCallback,
    last: Mutex<Option<Arc<Snapshot>>>,
}

impl Subscriber {
    pub(crate) fn new(id: u64, callback: UpdateCallback) -> Self {
        Self {
            id,
            callback,
            last: Mutex::new(None),
        }
    }

    /// Invoke the callback unless this subscriber already saw something newer
    fn deliver(&self, snapshot: &Arc<Snapshot>) {
        {
            let mut last = self.last.lock();
            if last.as_ref().is_some_and(|seen| !snapshot.supersedes(seen)) {
                return;
            }
            *last = Some(Arc::clone(snapshot));
        }
        (self.callback)(snapshot);
    }
}

/// Cache writer and subscriber registry for one domain
pub(crate) struct DomainHub {
    domain: Domain,
    cache: Arc<CacheStore>,
    subscribers: RwLock<Vec<Arc<Subscriber>>>,
    delivery: ReentrantMutex<()>,
}

impl DomainHub {
    pub(crate) fn new(domain: Domain, cache: Arc<CacheStore>) -> Self {
        Self {
            domain,
            cache,
            subscribers: RwLock::new(Vec::new()),
            delivery: ReentrantMutex::new(()),
        }
    }

    /// Register a subscriber and hand it the cached snapshot, if any
    pub(crate) fn add(&self, subscriber: Arc<Subscriber>) {
        let _delivery = self.delivery.lock();
        self.subscribers.write().push(Arc::clone(&subscriber));
        if let Some(snapshot) = self.cache.get(self.domain) {
            subscriber.deliver(&snapshot);
        }
    }

    /// Remove a subscriber; returns whether it was registered
    pub(crate) fn remove(&self, id: u64) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        subscribers.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Deliver to everyone; caller holds the delivery lock
    fn fan_out(&self, snapshot: &Arc<Snapshot>) {
        let subscribers = self.subscribers.read().clone();
        for subscriber in subscribers {
            subscriber.deliver(snapshot);
        }
    }
}

impl SnapshotSink for DomainHub {
    fn next_seq(&self) -> u64 {
        self.cache.next_seq()
    }

    fn current(&self) -> Option<Arc<Snapshot>> {
        self.cache.get(self.domain)
    }

    fn publish(&self, snapshot: Snapshot) -> bool {
        let _delivery = self.delivery.lock();
        let snapshot = Arc::new(snapshot);
        if !self.cache.set(self.domain, Arc::clone(&snapshot)) {
            return false;
        }
        self.fan_out(&snapshot);
        true
    }

    fn publish_stale(&self, mark: StaleMark) -> bool {
        let _delivery = self.delivery.lock();
        match self.cache.mark_stale_with(self.domain, mark) {
            Some(stale) => {
                self.fan_out(&stale);
                true
            }
            None => false,
        }
    }
}

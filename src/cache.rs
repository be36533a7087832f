//! Last-good-value cache
//!
//! One slot per domain, in process memory. Slots are replaced whole, never
//! merged field by field, and never move backwards: a snapshot is accepted
//! only if it [supersedes](Snapshot::supersedes) the one already stored.
//! A cached re-emission ranks by the data it carries, so a live response to
//! a request issued after that data was fetched still lands.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::types::identifiers::Domain;
use crate::types::snapshot::{ConnectionType, Snapshot, SnapshotSource};

/// Parameters for marking a slot stale
#[derive(Debug, Clone, Default)]
pub struct StaleMark {
    /// Sequence number of the request that failed; the mark is skipped if the
    /// slot already holds data at least that new
    pub failed_seq: Option<u64>,
    /// Error text attached to the stale snapshot
    pub error: Option<String>,
    /// Transport in use at the time of the failure
    pub connection_type: Option<ConnectionType>,
}

/// Per-domain snapshot cache
#[derive(Debug)]
pub struct CacheStore {
    slots: RwLock<HashMap<Domain, Arc<Snapshot>>>,
    next_seq: AtomicU64,
}

impl CacheStore {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(1),
        }
    }

    /// Allocate the next sequence number
    ///
    /// Sequence numbers are shared by every domain and every supervisor
    /// generation, so a restarted supervisor always outranks cached data.
    #[must_use]
    pub fn next_seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::SeqCst)
    }

    /// Current snapshot for a domain
    #[must_use]
    pub fn get(&self, domain: Domain) -> Option<Arc<Snapshot>> {
        self.slots.read().get(&domain).cloned()
    }

    /// Store a snapshot
    ///
    /// Returns `false` (and stores nothing) if the slot already holds a
    /// snapshot with an equal or newer sequence number, unless the stored one
    /// is a cached copy of data older than `snapshot`.
    pub fn set(&self, domain: Domain, snapshot: Arc<Snapshot>) -> bool {
        if snapshot.domain != domain {
            log::error!(
                "[{}] refusing to cache a snapshot for domain {}",
                domain,
                snapshot.domain
            );
            return false;
        }

        let mut slots = self.slots.write();
        if let Some(current) = slots.get(&domain)
            && !snapshot.supersedes(current)
        {
            log::debug!(
                "[{}] dropping out-of-order snapshot seq {} (have {})",
                domain,
                snapshot.seq,
                current.seq
            );
            return false;
        }
        slots.insert(domain, snapshot);
        true
    }

    /// Flip the cached snapshot to `source = cache`
    ///
    /// Keeps `data` untouched. Returns the replacement snapshot, or `None` if
    /// there is nothing cached or it is already marked as cache.
    pub fn mark_stale(&self, domain: Domain) -> Option<Arc<Snapshot>> {
        self.mark_stale_with(domain, StaleMark::default())
    }

    /// [`mark_stale`](Self::mark_stale) with failure bookkeeping
    pub fn mark_stale_with(&self, domain: Domain, mark: StaleMark) -> Option<Arc<Snapshot>> {
        let mut slots = self.slots.write();
        let current = slots.get(&domain)?;
        if current.source == SnapshotSource::Cache {
            return None;
        }
        if let Some(failed_seq) = mark.failed_seq
            && current.seq > failed_seq
        {
            // A newer success already landed; the failure is old news
            return None;
        }
        let stale = Arc::new(current.to_stale(
            self.next_seq(),
            mark.error,
            mark.connection_type,
        ));
        slots.insert(domain, Arc::clone(&stale));
        Some(stale)
    }

    /// Drop a domain's slot
    pub fn clear(&self, domain: Domain) -> Option<Arc<Snapshot>> {
        self.slots.write().remove(&domain)
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}

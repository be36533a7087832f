//! Snapshot destination for supervisors

use std::sync::Arc;

use crate::cache::StaleMark;
use crate::types::snapshot::Snapshot;

/// Where a supervisor sends what it produces
///
/// The broker's per-domain hub implements this by writing to the
/// [`CacheStore`](crate::cache::CacheStore) and fanning out to subscribers
/// under one lock, so cache contents and delivery order always agree.
pub trait SnapshotSink: Send + Sync {
    /// Allocate a sequence number for a request being issued now
    fn next_seq(&self) -> u64;

    /// Snapshot currently held for the domain
    fn current(&self) -> Option<Arc<Snapshot>>;

    /// Offer a new snapshot; returns whether it was accepted
    fn publish(&self, snapshot: Snapshot) -> bool;

    /// Re-emit the current snapshot as `source = cache`; returns whether
    /// anything changed
    fn publish_stale(&self, mark: StaleMark) -> bool;
}

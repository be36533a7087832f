//! Recent memories facade

use crate::broker::SyncBroker;
use crate::error::{Result, SyncError};
use crate::types::gateway::RecentMemory;
use crate::types::identifiers::Domain;

use super::{ConsumerHandle, SyncMeta};

/// Entries shown when no limit is given
pub const DEFAULT_MEMORY_LIMIT: usize = 5;

/// What the memory panel renders
#[derive(Debug, Clone, PartialEq)]
pub struct RecentMemoriesState {
    /// Newest first, at most `limit` entries
    pub memories: Vec<RecentMemory>,
    /// Sync bookkeeping
    pub meta: SyncMeta,
}

/// Recently touched memory entries
///
/// The gateway is always asked for its fixed page; `limit` only trims what
/// this facade shows, so facades with different limits share one poll.
pub struct RecentMemories {
    handle: ConsumerHandle,
    limit: usize,
}

impl RecentMemories {
    /// Subscribe showing [`DEFAULT_MEMORY_LIMIT`] entries
    ///
    /// # Errors
    /// Returns `InvalidConfig` if the broker cannot serve memories
    pub fn mount(broker: &SyncBroker) -> Result<Self> {
        Self::mount_with_limit(broker, DEFAULT_MEMORY_LIMIT)
    }

    /// Subscribe showing up to `limit` entries
    ///
    /// # Errors
    /// Returns `InvalidConfig` if `limit` is zero or the broker cannot serve
    /// memories
    pub fn mount_with_limit(broker: &SyncBroker, limit: usize) -> Result<Self> {
        if limit == 0 {
            return Err(SyncError::invalid_config("memory limit must be positive"));
        }
        Ok(Self {
            handle: ConsumerHandle::mount(broker, Domain::Memories, None)?,
            limit,
        })
    }

    /// Entries shown
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Current view
    #[must_use]
    pub fn state(&self) -> RecentMemoriesState {
        let snapshot = self.handle.snapshot();
        let mut memories = snapshot
            .as_ref()
            .and_then(|s| s.data.as_memories())
            .map(<[RecentMemory]>::to_vec)
            .unwrap_or_default();
        memories.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        memories.truncate(self.limit);

        RecentMemoriesState {
            memories,
            meta: SyncMeta::from_snapshot(snapshot.as_deref()),
        }
    }

    /// Wait for the next update; `false` once the broker is gone
    pub async fn changed(&mut self) -> bool {
        self.handle.changed().await
    }

    /// Fetch once, out of band
    pub fn refresh(&self) {
        self.handle.refresh();
    }
}

//! Sidebar cron facade

use std::time::Duration;

use crate::broker::SyncBroker;
use crate::error::Result;
use crate::types::gateway::CronJob;
use crate::types::identifiers::Domain;

use super::{ConsumerHandle, SyncMeta};

/// What the cron list renders
#[derive(Debug, Clone, PartialEq)]
pub struct SidebarCronsState {
    /// Crons as reported
    pub crons: Vec<CronJob>,
    /// Number of enabled crons
    pub enabled_crons: usize,
    /// Number of crons
    pub total_crons: usize,
    /// Sync bookkeeping
    pub meta: SyncMeta,
}

/// Cron jobs for the sidebar
pub struct SidebarCrons {
    handle: ConsumerHandle,
}

impl SidebarCrons {
    /// Subscribe with the domain's default interval
    ///
    /// # Errors
    /// Returns `InvalidConfig` if the broker cannot serve crons
    pub fn mount(broker: &SyncBroker) -> Result<Self> {
        Self::mount_with_interval(broker, None)
    }

    /// Subscribe, requesting a poll interval
    ///
    /// # Errors
    /// Returns `InvalidConfig` if the broker cannot serve crons
    pub fn mount_with_interval(broker: &SyncBroker, interval: Option<Duration>) -> Result<Self> {
        Ok(Self {
            handle: ConsumerHandle::mount(broker, Domain::Crons, interval)?,
        })
    }

    /// Current view
    #[must_use]
    pub fn state(&self) -> SidebarCronsState {
        let snapshot = self.handle.snapshot();
        let crons = snapshot
            .as_ref()
            .and_then(|s| s.data.as_crons())
            .map(<[CronJob]>::to_vec)
            .unwrap_or_default();

        SidebarCronsState {
            enabled_crons: crons.iter().filter(|c| c.enabled).count(),
            total_crons: crons.len(),
            crons,
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

//! Sidebar task facade

use std::time::Duration;

use crate::broker::SyncBroker;
use crate::error::Result;
use crate::normalizer::task_counts;
use crate::types::gateway::AgentTask;
use crate::types::identifiers::Domain;

use super::{ConsumerHandle, SyncMeta};

/// What the task list renders
#[derive(Debug, Clone, PartialEq)]
pub struct SidebarTasksState {
    /// Tasks as reported
    pub tasks: Vec<AgentTask>,
    /// Tasks still executing
    pub running_tasks: u32,
    /// Tasks that finished successfully
    pub completed_tasks: u32,
    /// Tasks that failed
    pub failed_tasks: u32,
    /// Sync bookkeeping
    pub meta: SyncMeta,
}

/// Agent tasks for the sidebar
pub struct SidebarTasks {
    handle: ConsumerHandle,
}

impl SidebarTasks {
    /// Subscribe with the domain's default interval
    ///
    /// # Errors
    /// Returns `InvalidConfig` if the broker cannot serve tasks
    pub fn mount(broker: &SyncBroker) -> Result<Self> {
        Self::mount_with_interval(broker, None)
    }

    /// Subscribe, requesting a poll interval
    ///
    /// # Errors
    /// Returns `InvalidConfig` if the broker cannot serve tasks
    pub fn mount_with_interval(broker: &SyncBroker, interval: Option<Duration>) -> Result<Self> {
        Ok(Self {
            handle: ConsumerHandle::mount(broker, Domain::Tasks, interval)?,
        })
    }

    /// Current view
    #[must_use]
    pub fn state(&self) -> SidebarTasksState {
        let snapshot = self.handle.snapshot();
        let tasks = snapshot
            .as_ref()
            .and_then(|s| s.data.as_tasks())
            .map(<[AgentTask]>::to_vec)
            .unwrap_or_default();
        let counts = task_counts(&tasks);

        SidebarTasksState {
            tasks,
            running_tasks: counts.running,
            completed_tasks: counts.completed,
            failed_tasks: counts.failed,
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

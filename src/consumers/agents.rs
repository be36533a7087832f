//! Agent sessions facade

use std::sync::Arc;
use std::time::Duration;

use crate::broker::SyncBroker;
use crate::error::Result;
use crate::normalizer::{normalize, working_count};
use crate::types::gateway::GatewaySession;
use crate::types::identifiers::{AgentId, Domain};
use crate::types::node::AgentNodeState;
use crate::types::snapshot::Snapshot;

use super::{ConsumerHandle, SyncMeta};

/// What the agent panel renders
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSessionsState {
    /// One node per catalog entry; all idle until data arrives
    pub nodes: Vec<AgentNodeState>,
    /// Ids of nodes currently working
    pub active_agent_ids: Vec<AgentId>,
    /// Number of working nodes
    pub active_count: usize,
    /// Sessions across all nodes
    pub total_sessions: u32,
    /// Raw gateway sessions, when reported
    pub sessions: Vec<GatewaySession>,
    /// Sync bookkeeping
    pub meta: SyncMeta,
}

/// Agent sessions for the sidebar and agent map
pub struct AgentSessions {
    handle: ConsumerHandle,
}

impl AgentSessions {
    /// Subscribe with the domain's default interval
    ///
    /// # Errors
    /// Returns `InvalidConfig` if the broker cannot serve agent sessions
    pub fn mount(broker: &SyncBroker) -> Result<Self> {
        Self::mount_with_interval(broker, None)
    }

    /// Subscribe, requesting a poll interval
    ///
    /// # Errors
    /// Returns `InvalidConfig` if the broker cannot serve agent sessions
    pub fn mount_with_interval(broker: &SyncBroker, interval: Option<Duration>) -> Result<Self> {
        Ok(Self {
            handle: ConsumerHandle::mount(broker, Domain::AgentSessions, interval)?,
        })
    }

    /// Current view
    #[must_use]
    pub fn state(&self) -> AgentSessionsState {
        let snapshot = self.handle.snapshot();
        let meta = SyncMeta::from_snapshot(snapshot.as_deref());
        let data = snapshot
            .as_ref()
            .and_then(|s| s.data.as_agent_sessions());

        let (nodes, sessions) = match data {
            Some(data) => (data.nodes.clone(), data.sessions.clone()),
            None => (
                normalize(&[], self.handle.broker.catalog()),
                Vec::new(),
            ),
        };

        let active_agent_ids: Vec<AgentId> = nodes
            .iter()
            .filter(|n| n.is_working())
            .map(|n| n.id().clone())
            .collect();

        AgentSessionsState {
            active_count: working_count(&nodes),
            total_sessions: nodes.iter().map(|n| n.active_sessions).sum(),
            active_agent_ids,
            nodes,
            sessions,
            meta,
        }
    }

    /// Latest raw snapshot
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.handle.snapshot()
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

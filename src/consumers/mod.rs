//! Consumer facades
//!
//! Thin, typed views over [`SyncBroker`] subscriptions, one per dashboard
//! panel. Each facade holds its subscription for as long as it lives and
//! keeps the latest snapshot in a `watch` channel, so callers can either read
//! `state()` whenever they like or `await` the next change.
//!
//! None of these ever open a connection themselves.

mod agents;
mod crons;
mod memories;
mod skills;
mod status;
mod tasks;

pub use agents::{AgentSessions, AgentSessionsState};
pub use crons::{SidebarCrons, SidebarCronsState};
pub use memories::{DEFAULT_MEMORY_LIMIT, RecentMemories, RecentMemoriesState};
pub use skills::{SidebarSkills, SidebarSkillsState};
pub use status::{CONNECTION_CHECK_INTERVAL, ConnectionState, ConnectionStatus, SystemStatusState, SystemStatusView};
pub use tasks::{SidebarTasks, SidebarTasksState};

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::broker::{SubscribeOptions, Subscription, SyncBroker};
use crate::error::Result;
use crate::types::identifiers::Domain;
use crate::types::snapshot::{ConnectionType, Snapshot, SnapshotSource};

/// Bookkeeping every facade state carries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncMeta {
    /// No snapshot has arrived yet
    pub loading: bool,
    /// Soft error text from the latest failure
    pub error: Option<String>,
    /// When the shown data was fetched
    pub last_updated: Option<DateTime<Utc>>,
    /// Whether the shown data is live
    pub gateway_connected: bool,
    /// Live or cached, once something has arrived
    pub source: Option<SnapshotSource>,
    /// Transport that produced the shown data
    pub connection_type: ConnectionType,
}

impl SyncMeta {
    fn from_snapshot(snapshot: Option<&Snapshot>) -> Self {
        match snapshot {
            Some(snapshot) => Self {
                loading: false,
                error: snapshot.error.clone(),
                last_updated: (!snapshot.placeholder).then_some(snapshot.fetched_at),
                gateway_connected: snapshot.is_live(),
                source: Some(snapshot.source),
                connection_type: snapshot.connection_type,
            },
            None => Self {
                loading: true,
                error: None,
                last_updated: None,
                gateway_connected: false,
                source: None,
                connection_type: ConnectionType::None,
            },
        }
    }
}

/// Subscription plus the latest snapshot it delivered
struct ConsumerHandle {
    broker: SyncBroker,
    domain: Domain,
    rx: watch::Receiver<Option<Arc<Snapshot>>>,
    _subscription: Subscription,
}

impl ConsumerHandle {
    fn mount(broker: &SyncBroker, domain: Domain, poll_interval: Option<Duration>) -> Result<Self> {
        let (tx, rx) = watch::channel(None);
        let subscription = broker.subscribe_with(
            domain,
            SubscribeOptions { poll_interval },
            move |snapshot| {
                tx.send_replace(Some(Arc::clone(snapshot)));
            },
        )?;

        Ok(Self {
            broker: broker.clone(),
            domain,
            rx,
            _subscription: subscription,
        })
    }

    fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.rx.borrow().clone()
    }

    /// Wait for a snapshot newer than the last one seen through this handle
    async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    fn refresh(&self) {
        self.broker.refresh(self.domain);
    }
}

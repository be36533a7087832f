//! System status and gateway connectivity facades
//!
//! Both read the system status domain. `ConnectionStatus` asks for a 2 second
//! interval; while it is mounted, every status subscriber gets that rate.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::broker::SyncBroker;
use crate::error::Result;
use crate::types::gateway::SystemStatus;
use crate::types::identifiers::Domain;

use super::{ConsumerHandle, SyncMeta};

/// Poll interval the connection indicator asks for
pub const CONNECTION_CHECK_INTERVAL: Duration = Duration::from_secs(2);

/// What the status panel renders
#[derive(Debug, Clone, PartialEq)]
pub struct SystemStatusState {
    /// Latest status, once one has arrived
    pub status: Option<SystemStatus>,
    /// Sync bookkeeping
    pub meta: SyncMeta,
}

/// Gateway and subsystem health
pub struct SystemStatusView {
    handle: ConsumerHandle,
}

impl SystemStatusView {
    /// Subscribe with the domain's default interval
    ///
    /// # Errors
    /// Returns `InvalidConfig` if the broker cannot serve system status
    pub fn mount(broker: &SyncBroker) -> Result<Self> {
        Ok(Self {
            handle: ConsumerHandle::mount(broker, Domain::SystemStatus, None)?,
        })
    }

    /// Current view
    #[must_use]
    pub fn state(&self) -> SystemStatusState {
        let snapshot = self.handle.snapshot();
        SystemStatusState {
            status: snapshot
                .as_ref()
                .and_then(|s| s.data.as_system_status())
                .cloned(),
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

/// What the connection indicator renders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionState {
    /// Latest status round trip succeeded
    pub is_online: bool,
    /// Round-trip time of that request
    pub latency: Option<Duration>,
    /// When the gateway last answered
    pub last_ping: Option<DateTime<Utc>>,
}

/// Online/offline indicator for the gateway
pub struct ConnectionStatus {
    handle: ConsumerHandle,
}

impl ConnectionStatus {
    /// Subscribe at [`CONNECTION_CHECK_INTERVAL`]
    ///
    /// # Errors
    /// Returns `InvalidConfig` if the broker cannot serve system status
    pub fn mount(broker: &SyncBroker) -> Result<Self> {
        Ok(Self {
            handle: ConsumerHandle::mount(
                broker,
                Domain::SystemStatus,
                Some(CONNECTION_CHECK_INTERVAL),
            )?,
        })
    }

    /// Current view
    ///
    /// `last_ping` survives going offline: a stale snapshot keeps the fetch
    /// time of the live data it was derived from. A placeholder emitted before
    /// any success carries no ping.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        match self.handle.snapshot() {
            Some(snapshot) => ConnectionState {
                is_online: snapshot.is_live(),
                latency: snapshot.latency,
                last_ping: (!snapshot.placeholder).then_some(snapshot.fetched_at),
            },
            None => ConnectionState {
                is_online: false,
                latency: None,
                last_ping: None,
            },
        }
    }

    /// Wait for the next update; `false` once the broker is gone
    pub async fn changed(&mut self) -> bool {
        self.handle.changed().await
    }

    /// Check now
    pub fn refresh(&self) {
        self.handle.refresh();
    }
}

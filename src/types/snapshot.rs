//! Snapshot types broadcast to subscribers
//!
//! A `Snapshot` is immutable once built. Consumers receive `Arc<Snapshot>` and
//! may use `Arc::ptr_eq` for change detection; a stale re-emission shares the
//! exact same `data` allocation as the live snapshot it was derived from.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::catalog::Catalog;
use super::gateway::{AgentTask, CronJob, GatewaySession, RecentMemory, Skill, SystemStatus};
use super::identifiers::Domain;
use super::node::AgentNodeState;
use crate::normalizer::normalize;

/// Where a snapshot's data came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotSource {
    /// Produced by a successful gateway round trip
    Live,
    /// Gateway unreachable; this is the last good data
    Cache,
}

/// Transport that produced a snapshot, for UI badges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    /// Server-sent event stream
    Sse,
    /// Interval polling
    Poll,
    /// No transport
    #[default]
    None,
}

/// Agent sessions payload after normalization
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AgentSessionsData {
    /// One node per catalog entry, in catalog order
    pub nodes: Vec<AgentNodeState>,
    /// Raw gateway sessions, when the gateway reported them
    pub sessions: Vec<GatewaySession>,
}

/// Domain-specific snapshot payload
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "domain", content = "data", rename_all = "snake_case")]
pub enum DomainData {
    /// Normalized agent nodes
    AgentSessions(AgentSessionsData),
    /// Task list
    Tasks(Vec<AgentTask>),
    /// Cron list
    Crons(Vec<CronJob>),
    /// Skill list
    Skills(Vec<Skill>),
    /// System status
    SystemStatus(SystemStatus),
    /// Recent memories
    Memories(Vec<RecentMemory>),
}

impl DomainData {
    /// Domain this payload belongs to
    #[must_use]
    pub fn domain(&self) -> Domain {
        match self {
            DomainData::AgentSessions(_) => Domain::AgentSessions,
            DomainData::Tasks(_) => Domain::Tasks,
            DomainData::Crons(_) => Domain::Crons,
            DomainData::Skills(_) => Domain::Skills,
            DomainData::SystemStatus(_) => Domain::SystemStatus,
            DomainData::Memories(_) => Domain::Memories,
        }
    }

    /// Empty payload for a domain
    ///
    /// For agent sessions this is the full catalog with every node idle.
    #[must_use]
    pub fn empty(domain: Domain, catalog: &Catalog) -> Self {
        match domain {
            Domain::AgentSessions => DomainData::AgentSessions(AgentSessionsData {
                nodes: normalize(&[], catalog),
                sessions: Vec::new(),
            }),
            Domain::Tasks => DomainData::Tasks(Vec::new()),
            Domain::Crons => DomainData::Crons(Vec::new()),
            Domain::Skills => DomainData::Skills(Vec::new()),
            Domain::SystemStatus => DomainData::SystemStatus(SystemStatus::default()),
            Domain::Memories => DomainData::Memories(Vec::new()),
        }
    }

    /// Agent sessions payload, if this is one
    #[must_use]
    pub fn as_agent_sessions(&self) -> Option<&AgentSessionsData> {
        match self {
            DomainData::AgentSessions(data) => Some(data),
            _ => None,
        }
    }

    /// Task list, if this is one
    #[must_use]
    pub fn as_tasks(&self) -> Option<&[AgentTask]> {
        match self {
            DomainData::Tasks(tasks) => Some(tasks),
            _ => None,
        }
    }

    /// Skill list, if this is one
    #[must_use]
    pub fn as_skills(&self) -> Option<&[Skill]> {
        match self {
            DomainData::Skills(skills) => Some(skills),
            _ => None,
        }
    }

    /// Cron list, if this is one
    #[must_use]
    pub fn as_crons(&self) -> Option<&[CronJob]> {
        match self {
            DomainData::Crons(crons) => Some(crons),
            _ => None,
        }
    }

    /// System status, if this is one
    #[must_use]
    pub fn as_system_status(&self) -> Option<&SystemStatus> {
        match self {
            DomainData::SystemStatus(status) => Some(status),
            _ => None,
        }
    }

    /// Memory list, if this is one
    #[must_use]
    pub fn as_memories(&self) -> Option<&[RecentMemory]> {
        match self {
            DomainData::Memories(memories) => Some(memories),
            _ => None,
        }
    }
}

/// The unit stored in the cache and broadcast to subscribers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Domain
    pub domain: Domain,
    /// Payload
    pub data: Arc<DomainData>,
    /// When the payload was fetched (or the server timestamp, if supplied)
    pub fetched_at: DateTime<Utc>,
    /// Monotonic sequence number, assigned when the producing request was issued
    pub seq: u64,
    /// Live or cached
    pub source: SnapshotSource,
    /// Transport in use when this snapshot was produced
    pub connection_type: ConnectionType,
    /// Soft error text from the most recent failure, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Round-trip time of the request that produced this snapshot
    #[serde(skip)]
    pub latency: Option<Duration>,
    /// Empty stand-in emitted before any fetch succeeded
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub placeholder: bool,
    /// Sequence number of the live snapshot whose data this carries
    ///
    /// Equal to `seq` for live snapshots. A cached copy keeps the value of
    /// the snapshot it was derived from; a placeholder carries no data and
    /// uses 0.
    #[serde(skip)]
    pub data_seq: u64,
}

impl Snapshot {
    /// A live snapshot
    #[must_use]
    pub fn live(
        data: DomainData,
        seq: u64,
        fetched_at: DateTime<Utc>,
        connection_type: ConnectionType,
    ) -> Self {
        Self {
            domain: data.domain(),
            data: Arc::new(data),
            fetched_at,
            seq,
            source: SnapshotSource::Live,
            connection_type,
            error: None,
            latency: None,
            placeholder: false,
            data_seq: seq,
        }
    }

    /// Attach a measured round-trip latency
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// A cached copy of this snapshot
    ///
    /// Shares `data` and keeps `fetched_at`; only bookkeeping changes.
    #[must_use]
    pub fn to_stale(
        &self,
        seq: u64,
        error: Option<String>,
        connection_type: Option<ConnectionType>,
    ) -> Self {
        Self {
            domain: self.domain,
            data: Arc::clone(&self.data),
            fetched_at: self.fetched_at,
            seq,
            source: SnapshotSource::Cache,
            connection_type: connection_type.unwrap_or(self.connection_type),
            error,
            latency: None,
            placeholder: self.placeholder,
            data_seq: self.data_seq,
        }
    }

    /// Placeholder emitted when the very first fetch for a domain fails
    #[must_use]
    pub fn unavailable(
        domain: Domain,
        catalog: &Catalog,
        seq: u64,
        connection_type: ConnectionType,
        error: impl Into<String>,
    ) -> Self {
        Self {
            domain,
            data: Arc::new(DomainData::empty(domain, catalog)),
            fetched_at: Utc::now(),
            seq,
            source: SnapshotSource::Cache,
            connection_type,
            error: Some(error.into()),
            latency: None,
            placeholder: true,
            data_seq: 0,
        }
    }

    /// Whether this snapshot may replace `current`
    ///
    /// A newer sequence number always wins. A live snapshot also replaces a
    /// cached one whose data it postdates: the cache re-emission took a fresh
    /// sequence number when the failure landed, but a request issued after
    /// the cached data was fetched still carries newer data.
    #[must_use]
    pub fn supersedes(&self, current: &Snapshot) -> bool {
        if self.seq > current.seq {
            return true;
        }
        self.is_live() && !current.is_live() && self.seq > current.data_seq
    }

    /// Whether this snapshot came from a successful round trip
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.source == SnapshotSource::Live
    }
}

//! Newtype wrappers and domain keys
//!
//! This module contains the `Domain` key that partitions all synchronized state
//! and the `AgentId` newtype used by the catalog and gateway records.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SyncError;

// ============================================================================
// Domain
// ============================================================================

/// A logical data domain served by the gateway
///
/// Each domain has exactly one upstream connection, one cache slot and one
/// subscriber set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    /// Agent sessions, normalized against the catalog
    AgentSessions,
    /// Agent tasks derived from sessions
    Tasks,
    /// Scheduled cron jobs
    Crons,
    /// Tools available to agents
    Skills,
    /// Gateway/system health
    SystemStatus,
    /// Recently touched memory entries
    Memories,
}

impl Domain {
    /// Every domain, in a stable order
    pub const ALL: [Domain; 6] = [
        Domain::AgentSessions,
        Domain::Tasks,
        Domain::Crons,
        Domain::Skills,
        Domain::SystemStatus,
        Domain::Memories,
    ];

    /// Stable name used in logs and configuration
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Domain::AgentSessions => "agent_sessions",
            Domain::Tasks => "tasks",
            Domain::Crons => "crons",
            Domain::Skills => "skills",
            Domain::SystemStatus => "system_status",
            Domain::Memories => "memories",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "agent_sessions" | "agents" | "sessions" => Ok(Domain::AgentSessions),
            "tasks" | "task" => Ok(Domain::Tasks),
            "crons" => Ok(Domain::Crons),
            "skills" | "skill" | "tools" => Ok(Domain::Skills),
            "system_status" | "status" => Ok(Domain::SystemStatus),
            "memories" | "memory" => Ok(Domain::Memories),
            other => Err(SyncError::unknown_domain(other)),
        }
    }
}

// ============================================================================
// Agent ID
// ============================================================================

/// Agent ID newtype for type safety
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    /// Create a new agent ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the agent ID as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for AgentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl PartialEq<str> for AgentId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for AgentId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

//! Normalized per-agent node state

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::catalog::{AgentNodeConfig, Position};
use super::identifiers::AgentId;

/// Derived agent status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    /// Not present in the gateway response
    Idle,
    /// Has a session but no active task
    Connected,
    /// Has an active task
    Working,
}

/// One entry per catalog agent
///
/// Presentation fields are read through the shared catalog entry, so two
/// states built from the same catalog point at the same `AgentNodeConfig`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentNodeState {
    #[serde(flatten)]
    config: Arc<AgentNodeConfig>,
    /// Derived status
    pub status: AgentStatus,
    /// Concurrent session count
    pub active_sessions: u32,
    /// Current task label, only set while working
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_task: Option<String>,
    /// Last activity reported by the gateway
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<DateTime<Utc>>,
}

impl AgentNodeState {
    /// An idle node for a catalog entry
    #[must_use]
    pub fn idle(config: Arc<AgentNodeConfig>) -> Self {
        Self {
            config,
            status: AgentStatus::Idle,
            active_sessions: 0,
            current_task: None,
            last_activity: None,
        }
    }

    /// Build a node with explicit state
    #[must_use]
    pub fn new(
        config: Arc<AgentNodeConfig>,
        status: AgentStatus,
        active_sessions: u32,
        current_task: Option<String>,
        last_activity: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            config,
            status,
            active_sessions,
            current_task,
            last_activity,
        }
    }

    /// Agent id
    #[must_use]
    pub fn id(&self) -> &AgentId {
        &self.config.id
    }

    /// Display name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Icon glyph
    #[must_use]
    pub fn emoji(&self) -> &str {
        &self.config.emoji
    }

    /// Color token
    #[must_use]
    pub fn color(&self) -> &str {
        &self.config.color
    }

    /// Diagram position
    #[must_use]
    pub fn position(&self) -> Position {
        self.config.position
    }

    /// Shared catalog entry backing this node
    #[must_use]
    pub fn config(&self) -> &Arc<AgentNodeConfig> {
        &self.config
    }

    /// Whether the node is working
    #[must_use]
    pub fn is_working(&self) -> bool {
        self.status == AgentStatus::Working
    }
}

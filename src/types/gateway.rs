//! Raw gateway record types
//!
//! These mirror the JSON the gateway sends on both the push stream and the
//! poll endpoints. Every field the dashboard does not strictly need is
//! defaulted so a partially populated payload still decodes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identifiers::AgentId;

// ============================================================================
// Agent sessions
// ============================================================================

/// Session lifecycle as reported by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Session is executing
    Running,
    /// Session finished successfully
    Complete,
    /// Session failed
    Failed,
    /// Session exists but is doing nothing
    #[default]
    #[serde(other)]
    Idle,
}

/// Token usage for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenUsage {
    /// Prompt tokens
    pub input: u64,
    /// Completion tokens
    pub output: u64,
    /// Total tokens
    pub total: u64,
}

/// A gateway session, identified by label rather than catalog id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewaySession {
    /// Session key, e.g. `agent:main:subagent:1234`
    pub id: String,
    /// Human readable label
    #[serde(default)]
    pub label: String,
    /// Lifecycle status
    #[serde(default)]
    pub status: SessionStatus,
    /// Start time
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    /// Pre-formatted runtime
    #[serde(default)]
    pub runtime: Option<String>,
    /// Token usage
    #[serde(default)]
    pub tokens: TokenUsage,
    /// Model name
    #[serde(default)]
    pub model: Option<String>,
}

/// A per-agent record keyed by catalog id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAgentRecord {
    /// Catalog id this record describes
    pub id: AgentId,
    /// Number of concurrent sessions
    #[serde(default, alias = "activeSessions", alias = "sessionCount")]
    pub sessions: u32,
    /// Label of the task currently executing, if any
    #[serde(default, alias = "currentTask")]
    pub active_task: Option<String>,
    /// Last reported activity
    #[serde(default)]
    pub last_activity: Option<DateTime<Utc>>,
}

impl RawAgentRecord {
    /// A record with an open session and no task
    pub fn connected(id: impl Into<AgentId>, sessions: u32) -> Self {
        Self {
            id: id.into(),
            sessions,
            active_task: None,
            last_activity: None,
        }
    }

    /// A record with an active task
    pub fn working(id: impl Into<AgentId>, task: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sessions: 1,
            active_task: Some(task.into()),
            last_activity: None,
        }
    }

    /// Whether the record reports an active task
    #[must_use]
    pub fn has_active_task(&self) -> bool {
        self.active_task.as_deref().is_some_and(|t| !t.is_empty())
    }
}

// ============================================================================
// Tasks
// ============================================================================

/// Task lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Still executing
    Running,
    /// Finished successfully
    Complete,
    /// Finished with an error
    Failed,
}

/// A unit of agent work shown in the sidebar task list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentTask {
    /// Task id (the session key it was derived from)
    pub id: String,
    /// Catalog id of the agent doing the work, or `agent` if unknown
    #[serde(default)]
    pub agent_id: String,
    /// Display name of the agent
    #[serde(default)]
    pub agent_name: String,
    /// Icon glyph of the agent
    #[serde(default)]
    pub agent_emoji: String,
    /// Human readable label
    #[serde(default)]
    pub label: String,
    /// Lifecycle status
    pub status: TaskStatus,
    /// Start time
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    /// Percent complete, when known
    #[serde(default)]
    pub progress: Option<u8>,
    /// Output excerpt
    #[serde(default)]
    pub output: Option<String>,
}

// ============================================================================
// Skills
// ============================================================================

/// A tool the gateway exposes to agents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    /// Tool name as the gateway knows it
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Grouping for the skills panel
    #[serde(default)]
    pub category: String,
    /// Whether agents can use it right now
    #[serde(default)]
    pub available: bool,
}

/// Tool entry from the gateway's tool listing
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ToolListing {
    /// Tool name, snake_case
    pub name: String,
    /// Tool category
    #[serde(default)]
    pub category: Option<String>,
}

impl From<ToolListing> for Skill {
    fn from(tool: ToolListing) -> Self {
        let name = tool
            .name
            .split('_')
            .filter(|word| !word.is_empty())
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            id: tool.name,
            name,
            category: tool.category.unwrap_or_else(|| "Tools".to_string()),
            available: true,
        }
    }
}

// ============================================================================
// Crons
// ============================================================================

/// Cron priority tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CronPriority {
    /// Must not be skipped
    Critical,
    /// Default tier
    Normal,
    /// Best effort
    Low,
}

/// Outcome of a cron run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CronRunStatus {
    /// Last run succeeded
    Success,
    /// Last run failed
    Failed,
    /// Currently running
    Running,
}

/// A scheduled job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CronJob {
    /// Job id
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Cron expression
    #[serde(default)]
    pub schedule: String,
    /// Command or prompt the job runs
    #[serde(default)]
    pub command: String,
    /// Whether the job is scheduled
    #[serde(default)]
    pub enabled: bool,
    /// Priority tier
    #[serde(default)]
    pub priority: Option<CronPriority>,
    /// Last run time
    #[serde(default)]
    pub last_run: Option<DateTime<Utc>>,
    /// Last run outcome
    #[serde(default)]
    pub last_status: Option<CronRunStatus>,
    /// Next scheduled run
    #[serde(default)]
    pub next_run: Option<DateTime<Utc>>,
    /// Total runs
    #[serde(default)]
    pub run_count: Option<u64>,
    /// Free text description
    #[serde(default)]
    pub description: Option<String>,
}

// ============================================================================
// System status
// ============================================================================

/// Assistant presence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceState {
    /// Ready
    Online,
    /// Generating
    Thinking,
    /// Producing speech
    Speaking,
    /// Unreachable
    #[default]
    #[serde(other)]
    Offline,
}

/// Assistant block of the status payload
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AssistantStatus {
    /// Presence
    pub status: PresenceState,
    /// Last activity
    pub last_activity: Option<DateTime<Utc>>,
    /// Uptime in seconds
    pub uptime: u64,
}

/// Gateway block of the status payload
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GatewayHealth {
    /// Whether the gateway reports itself connected upstream
    pub connected: bool,
    /// Gateway-measured latency in ms
    pub latency: u64,
    /// Last upstream ping
    pub last_ping: Option<DateTime<Utc>>,
    /// Gateway URL
    pub url: Option<String>,
}

/// Voice block of the status payload
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceStatus {
    /// Whether voice is configured
    pub available: bool,
    /// Voice pipeline state (`ready`, `speaking`, `listening`, `unavailable`)
    pub status: String,
}

/// API block of the status payload
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ApiHealth {
    /// Health flag
    pub healthy: bool,
    /// Response time in ms
    pub response_time: u64,
}

/// Agent counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentCounts {
    /// Agents with an active task
    pub active: u32,
    /// Agents without work
    pub idle: u32,
    /// All agents
    pub total: u32,
}

/// Task counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskCounts {
    /// Running tasks
    pub running: u32,
    /// Completed tasks
    pub completed: u32,
    /// Failed tasks
    pub failed: u32,
    /// Queued tasks
    pub pending: u32,
}

/// Context window usage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextUsage {
    /// Tokens used
    pub used: u64,
    /// Window size
    pub total: u64,
}

/// Full system status payload
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemStatus {
    /// Assistant presence (`opie` on the wire)
    #[serde(alias = "opie")]
    pub assistant: AssistantStatus,
    /// Gateway health
    pub gateway: GatewayHealth,
    /// Voice pipeline
    pub voice: VoiceStatus,
    /// API health
    pub api: ApiHealth,
    /// Agent counters
    pub agents: AgentCounts,
    /// Task counters
    pub tasks: TaskCounts,
    /// Active model
    pub model: Option<String>,
    /// Context usage
    pub context: Option<ContextUsage>,
}

// ============================================================================
// Memories
// ============================================================================

/// Kind of memory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryKind {
    /// Workspace file
    File,
    /// Past conversation
    Conversation,
    /// Free note
    Note,
    /// Task record
    Task,
}

/// A recently touched memory entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentMemory {
    /// Entry id
    pub id: String,
    /// Title
    #[serde(default)]
    pub title: String,
    /// Entry kind
    #[serde(rename = "type")]
    pub kind: MemoryKind,
    /// Workspace path
    #[serde(default)]
    pub path: Option<String>,
    /// Last touched
    pub timestamp: DateTime<Utc>,
    /// Short preview
    #[serde(default)]
    pub preview: Option<String>,
}

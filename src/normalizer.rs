//! Session normalization
//!
//! Projects raw gateway records onto the static catalog. The output always has
//! exactly one node per catalog entry, in catalog order; records for ids the
//! catalog does not know are dropped so consumer layouts stay fixed. New agents
//! therefore need a catalog update before they appear.

use std::collections::HashMap;

use crate::types::catalog::Catalog;
use crate::types::gateway::{
    AgentTask, GatewaySession, RawAgentRecord, SessionStatus, TaskCounts, TaskStatus,
};
use crate::types::node::{AgentNodeState, AgentStatus};

/// Merge raw records with the catalog
///
/// When several records share an id the first one wins.
#[must_use]
pub fn normalize(records: &[RawAgentRecord], catalog: &Catalog) -> Vec<AgentNodeState> {
    let mut by_id: HashMap<&str, &RawAgentRecord> = HashMap::with_capacity(records.len());
    for record in records {
        by_id.entry(record.id.as_str()).or_insert(record);
    }

    catalog
        .iter()
        .map(|config| match by_id.get(config.id.as_str()) {
            Some(record) if record.has_active_task() => AgentNodeState::new(
                config.clone(),
                AgentStatus::Working,
                record.sessions.max(1),
                record.active_task.clone(),
                record.last_activity,
            ),
            Some(record) => AgentNodeState::new(
                config.clone(),
                AgentStatus::Connected,
                record.sessions,
                None,
                record.last_activity,
            ),
            None => AgentNodeState::idle(config.clone()),
        })
        .collect()
}

/// Group label-keyed gateway sessions into per-agent records
///
/// Each session is attributed to a catalog node via
/// [`Catalog::match_session`]. A node's record counts its running sessions;
/// while any is running, the most recently started session's label is the
/// active task. Unmatched sessions are dropped.
#[must_use]
pub fn group_sessions(sessions: &[GatewaySession], catalog: &Catalog) -> Vec<RawAgentRecord> {
    let mut grouped: HashMap<&str, Vec<&GatewaySession>> = HashMap::new();
    for session in sessions {
        if let Some(node) = catalog.match_session(&session.label, &session.id) {
            grouped.entry(node.id.as_str()).or_default().push(session);
        }
    }

    catalog
        .iter()
        .filter_map(|config| {
            let mut matched = grouped.remove(config.id.as_str())?;
            // Most recent first; sessions without a start time sort last
            matched.sort_by(|a, b| b.started_at.cmp(&a.started_at));

            let running = matched
                .iter()
                .filter(|s| s.status == SessionStatus::Running)
                .count() as u32;
            let latest = matched.first();

            Some(RawAgentRecord {
                id: config.id.clone(),
                sessions: running,
                active_task: if running > 0 {
                    latest.map(|s| s.label.clone())
                } else {
                    None
                },
                last_activity: latest.and_then(|s| s.started_at),
            })
        })
        .collect()
}

/// Agent id given to tasks no catalog node claims
const UNMATCHED_AGENT_ID: &str = "agent";

/// Glyph given to tasks no catalog node claims
const UNMATCHED_AGENT_EMOJI: &str = "🤖";

/// Derive sidebar tasks from gateway sessions
///
/// Every running, complete or failed session becomes a task; idle sessions
/// are skipped. Progress is coarse: 50 while running, 100 once complete, 0
/// on failure.
#[must_use]
pub fn tasks_from_sessions(sessions: &[GatewaySession], catalog: &Catalog) -> Vec<AgentTask> {
    sessions
        .iter()
        .filter_map(|session| {
            let (status, progress) = match session.status {
                SessionStatus::Running => (TaskStatus::Running, 50),
                SessionStatus::Complete => (TaskStatus::Complete, 100),
                SessionStatus::Failed => (TaskStatus::Failed, 0),
                SessionStatus::Idle => return None,
            };
            let node = catalog.match_session(&session.label, &session.id);

            Some(AgentTask {
                id: session.id.clone(),
                agent_id: node.map_or_else(|| UNMATCHED_AGENT_ID.to_string(), |n| n.id.to_string()),
                agent_name: session.label.clone(),
                agent_emoji: node
                    .map_or_else(|| UNMATCHED_AGENT_EMOJI.to_string(), |n| n.emoji.clone()),
                label: session.label.clone(),
                status,
                start_time: session.started_at,
                progress: Some(progress),
                output: None,
            })
        })
        .collect()
}

/// Count tasks by status
#[must_use]
pub fn task_counts(tasks: &[AgentTask]) -> TaskCounts {
    tasks.iter().fold(TaskCounts::default(), |mut counts, task| {
        match task.status {
            TaskStatus::Running => counts.running += 1,
            TaskStatus::Complete => counts.completed += 1,
            TaskStatus::Failed => counts.failed += 1,
        }
        counts
    })
}

/// Number of nodes currently working
#[must_use]
pub fn working_count(nodes: &[AgentNodeState]) -> usize {
    nodes.iter().filter(|n| n.is_working()).count()
}

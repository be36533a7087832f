//! Gateway payload decoding
//!
//! Turns a JSON body (poll response or SSE `data`) into a [`DomainData`].
//! Push events may carry several domains at once (the `initial` event does),
//! so a payload without this domain's key is "not for us" on the stream but
//! "empty" on the poll endpoint.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Result, SyncError};
use crate::normalizer::{group_sessions, normalize, tasks_from_sessions};
use crate::types::catalog::Catalog;
use crate::types::gateway::{
    AgentTask, CronJob, GatewaySession, RawAgentRecord, RecentMemory, Skill, SystemStatus,
    ToolListing,
};
use crate::types::identifiers::Domain;
use crate::types::snapshot::{AgentSessionsData, DomainData};

/// Where a payload came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadOrigin {
    /// SSE event data; missing keys mean the event is for another domain
    Stream,
    /// Poll response; missing keys mean "empty"
    Poll,
}

/// A decoded payload
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    /// Domain payload
    pub data: DomainData,
    /// Server timestamp, when supplied
    pub timestamp: Option<DateTime<Utc>>,
}

/// Decode a body for a domain
///
/// Returns `Ok(None)` when a stream payload carries nothing for this domain.
///
/// # Errors
/// Returns a decode error for invalid JSON or a payload of the wrong shape
pub fn decode_payload(
    domain: Domain,
    catalog: &Catalog,
    body: &str,
    origin: PayloadOrigin,
) -> Result<Option<Decoded>> {
    let value: Value = serde_json::from_str(body)?;
    let timestamp = value
        .get("timestamp")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    let data = match domain {
        Domain::AgentSessions => decode_agent_sessions(&value, catalog, origin)?,
        Domain::Tasks => decode_tasks(&value, catalog, origin)?,
        Domain::Crons => list_field::<CronJob>(&value, "crons", origin)?.map(DomainData::Crons),
        Domain::Skills => decode_skills(&value, origin)?,
        Domain::SystemStatus => decode_status(&value, origin)?,
        Domain::Memories => {
            list_field::<RecentMemory>(&value, "memories", origin)?.map(DomainData::Memories)
        }
    };

    Ok(data.map(|data| Decoded { data, timestamp }))
}

fn decode_agent_sessions(
    value: &Value,
    catalog: &Catalog,
    origin: PayloadOrigin,
) -> Result<Option<DomainData>> {
    // A bare array is always a list of per-agent records
    let (records, sessions) = match value {
        Value::Array(_) => (
            Some(serde_json::from_value::<Vec<RawAgentRecord>>(value.clone())?),
            None,
        ),
        _ => (
            list_field::<RawAgentRecord>(value, "agents", PayloadOrigin::Stream)?,
            list_field::<GatewaySession>(value, "sessions", PayloadOrigin::Stream)?,
        ),
    };

    if records.is_none() && sessions.is_none() && origin == PayloadOrigin::Stream {
        return Ok(None);
    }

    let sessions = sessions.unwrap_or_default();
    let records = match records {
        Some(records) if !records.is_empty() => records,
        _ => group_sessions(&sessions, catalog),
    };

    Ok(Some(DomainData::AgentSessions(AgentSessionsData {
        nodes: normalize(&records, catalog),
        sessions,
    })))
}

/// Tasks come either ready-made under `tasks` or derived from `sessions`
fn decode_tasks(
    value: &Value,
    catalog: &Catalog,
    origin: PayloadOrigin,
) -> Result<Option<DomainData>> {
    match value {
        Value::Object(_) => {}
        // A bare array is a list of agent records, which carry no tasks
        Value::Array(_) => {
            return Ok((origin == PayloadOrigin::Poll).then(|| DomainData::Tasks(Vec::new())));
        }
        _ => {
            return Err(SyncError::payload(
                "expected an object for 'tasks'",
                Some(value.clone()),
            ));
        }
    }

    if let Some(tasks) = list_field::<AgentTask>(value, "tasks", PayloadOrigin::Stream)? {
        return Ok(Some(DomainData::Tasks(tasks)));
    }
    let tasks = match list_field::<GatewaySession>(value, "sessions", origin)? {
        Some(sessions) => tasks_from_sessions(&sessions, catalog),
        None => return Ok(None),
    };
    Ok(Some(DomainData::Tasks(tasks)))
}

/// Skills under `skills`, or the gateway's raw tool listing under `tools`
fn decode_skills(value: &Value, origin: PayloadOrigin) -> Result<Option<DomainData>> {
    if let Some(skills) = list_field::<Skill>(value, "skills", PayloadOrigin::Stream)? {
        return Ok(Some(DomainData::Skills(skills)));
    }
    let skills = match list_field::<ToolListing>(value, "tools", origin)? {
        Some(tools) => tools.into_iter().map(Skill::from).collect(),
        None => return Ok(None),
    };
    Ok(Some(DomainData::Skills(skills)))
}

fn decode_status(value: &Value, origin: PayloadOrigin) -> Result<Option<DomainData>> {
    let body = match value.get("status") {
        Some(inner @ Value::Object(_)) if value.get("gateway").is_none() => inner,
        _ if origin == PayloadOrigin::Stream && value.get("gateway").is_none() => {
            return Ok(None);
        }
        _ => value,
    };

    if !body.is_object() {
        return Err(SyncError::payload(
            "system status must be a JSON object",
            Some(value.clone()),
        ));
    }

    let status: SystemStatus = serde_json::from_value(body.clone())?;
    Ok(Some(DomainData::SystemStatus(status)))
}

/// Read a list either from `key` or from a top-level array
fn list_field<T: DeserializeOwned>(
    value: &Value,
    key: &str,
    origin: PayloadOrigin,
) -> Result<Option<Vec<T>>> {
    let list = match value {
        Value::Array(_) => Some(value),
        Value::Object(map) => map.get(key).filter(|v| !v.is_null()),
        _ => {
            return Err(SyncError::payload(
                format!("expected an object or array for '{key}'"),
                Some(value.clone()),
            ));
        }
    };

    match list {
        Some(list) => Ok(Some(serde_json::from_value(list.clone())?)),
        None if origin == PayloadOrigin::Poll => Ok(Some(Vec::new())),
        None => Ok(None),
    }
}

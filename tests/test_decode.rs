//! Unit tests for gateway payload decoding
//!
//! Tests poll and push payload shapes for every domain

use kodegen_live_status::{
    AgentStatus, Domain, DomainData, ErrorKind, PayloadOrigin, TaskStatus, decode_payload,
    default_catalog,
};

fn decode(domain: Domain, body: &str, origin: PayloadOrigin) -> Option<DomainData> {
    decode_payload(domain, &default_catalog(), body, origin)
        .unwrap()
        .map(|d| d.data)
}

#[test]
fn test_agent_records_object() {
    let body = r#"{"agents":[{"id":"code","activeSessions":1,"currentTask":"Refactor"}]}"#;
    let data = decode(Domain::AgentSessions, body, PayloadOrigin::Poll).unwrap();
    let nodes = &data.as_agent_sessions().unwrap().nodes;

    assert_eq!(nodes.len(), 8);
    let code = nodes.iter().find(|n| n.id() == "code").unwrap();
    assert_eq!(code.status, AgentStatus::Working);
    assert_eq!(code.current_task.as_deref(), Some("Refactor"));
}

#[test]
fn test_agent_records_bare_array() {
    let body = r#"[{"id":"qa","sessions":3}]"#;
    let data = decode(Domain::AgentSessions, body, PayloadOrigin::Poll).unwrap();
    let qa = data
        .as_agent_sessions()
        .unwrap()
        .nodes
        .iter()
        .find(|n| n.id() == "qa")
        .cloned()
        .unwrap();
    assert_eq!(qa.status, AgentStatus::Connected);
    assert_eq!(qa.active_sessions, 3);
}

#[test]
fn test_agent_sessions_grouped_by_label() {
    let body = r#"{
        "sessions": [
            {"id":"s1","label":"Write launch blog","status":"running","startedAt":"2026-03-01T12:00:00Z"}
        ]
    }"#;
    let data = decode(Domain::AgentSessions, body, PayloadOrigin::Stream).unwrap();
    let agents = data.as_agent_sessions().unwrap();

    assert_eq!(agents.sessions.len(), 1);
    let content = agents.nodes.iter().find(|n| n.id() == "content").unwrap();
    assert_eq!(content.status, AgentStatus::Working);
    assert_eq!(content.current_task.as_deref(), Some("Write launch blog"));
}

#[test]
fn test_server_timestamp() {
    let body = r#"{"crons":[],"timestamp":"2026-03-01T12:00:00Z"}"#;
    let decoded = decode_payload(Domain::Crons, &default_catalog(), body, PayloadOrigin::Poll)
        .unwrap()
        .unwrap();
    assert_eq!(
        decoded.timestamp.map(|t| t.to_rfc3339()),
        Some("2026-03-01T12:00:00+00:00".to_string())
    );
}

#[test]
fn test_stream_event_for_other_domain() {
    // A sessions event carries nothing for crons
    let body = r#"{"sessions":[]}"#;
    assert!(decode(Domain::Crons, body, PayloadOrigin::Stream).is_none());

    // On the poll endpoint a missing key means empty
    let data = decode(Domain::Crons, body, PayloadOrigin::Poll).unwrap();
    assert!(data.as_crons().unwrap().is_empty());
}

#[test]
fn test_initial_event_feeds_several_domains() {
    let body = r#"{
        "sessions": [],
        "crons": [{"id":"nightly","name":"Nightly","enabled":true}]
    }"#;
    assert!(decode(Domain::AgentSessions, body, PayloadOrigin::Stream).is_some());
    let crons = decode(Domain::Crons, body, PayloadOrigin::Stream).unwrap();
    assert_eq!(crons.as_crons().unwrap()[0].id, "nightly");
}

#[test]
fn test_status_wrapped_and_flat() {
    let flat = r#"{"gateway":{"connected":true,"latency":9},"agents":{"active":2,"idle":6,"total":8}}"#;
    let wrapped = r#"{"status":{"gateway":{"connected":true,"latency":9},"agents":{"active":2,"idle":6,"total":8}}}"#;

    let a = decode(Domain::SystemStatus, flat, PayloadOrigin::Poll).unwrap();
    let b = decode(Domain::SystemStatus, wrapped, PayloadOrigin::Poll).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.as_system_status().unwrap().agents.active, 2);
}

#[test]
fn test_status_legacy_assistant_key() {
    let body = r#"{"opie":{"status":"thinking","uptime":5},"gateway":{"connected":true}}"#;
    let data = decode(Domain::SystemStatus, body, PayloadOrigin::Poll).unwrap();
    assert_eq!(data.as_system_status().unwrap().assistant.uptime, 5);
}

#[test]
fn test_memories() {
    let body = r#"{"memories":[
        {"id":"m1","title":"Notes","type":"note","timestamp":"2026-03-01T12:00:00Z"}
    ]}"#;
    let data = decode(Domain::Memories, body, PayloadOrigin::Poll).unwrap();
    assert_eq!(data.as_memories().unwrap()[0].title, "Notes");
}

#[test]
fn test_tasks_from_push_event() {
    let body = r#"{
        "sessions": [{"id":"s1","label":"Write launch blog","status":"running"}],
        "tasks": [
            {"id":"t1","agentId":"code","agentName":"Code","label":"Refactor","status":"complete","progress":100}
        ],
        "stats": {"runningTasks":0,"completedTasks":1,"failedTasks":0}
    }"#;
    let data = decode(Domain::Tasks, body, PayloadOrigin::Stream).unwrap();
    let tasks = data.as_tasks().unwrap();

    // Ready-made tasks win over deriving them from sessions
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].agent_id, "code");
    assert_eq!(tasks[0].status, TaskStatus::Complete);
}

#[test]
fn test_tasks_derived_from_polled_sessions() {
    let body = r#"{"sessions":[
        {"id":"s1","label":"Write launch blog","status":"running"},
        {"id":"s2","label":"Idle chat","status":"idle"}
    ]}"#;
    let data = decode(Domain::Tasks, body, PayloadOrigin::Poll).unwrap();
    let tasks = data.as_tasks().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].agent_id, "content");
    assert_eq!(tasks[0].status, TaskStatus::Running);

    // Agent records carry no tasks
    let records = r#"[{"id":"qa","sessions":3}]"#;
    let data = decode(Domain::Tasks, records, PayloadOrigin::Poll).unwrap();
    assert!(data.as_tasks().unwrap().is_empty());
    assert!(decode(Domain::Tasks, records, PayloadOrigin::Stream).is_none());

    // A crons event is not for us
    assert!(decode(Domain::Tasks, r#"{"crons":[]}"#, PayloadOrigin::Stream).is_none());
}

#[test]
fn test_skills_from_event_and_tool_listing() {
    let event = r#"{"skills":[{"id":"web_search","name":"Web Search","category":"Research","available":true}]}"#;
    let data = decode(Domain::Skills, event, PayloadOrigin::Stream).unwrap();
    assert_eq!(data.as_skills().unwrap()[0].category, "Research");

    let listing = r#"{"tools":[{"name":"web_search"},{"name":"send_email","category":"Outreach"}]}"#;
    let data = decode(Domain::Skills, listing, PayloadOrigin::Poll).unwrap();
    let skills = data.as_skills().unwrap();
    assert_eq!(skills[0].id, "web_search");
    assert_eq!(skills[0].name, "Web Search");
    assert_eq!(skills[0].category, "Tools");
    assert!(skills[0].available);
    assert_eq!(skills[1].category, "Outreach");

    assert!(decode(Domain::Skills, r#"{"sessions":[]}"#, PayloadOrigin::Stream).is_none());
    let empty = decode(Domain::Skills, r#"{}"#, PayloadOrigin::Poll).unwrap();
    assert!(empty.as_skills().unwrap().is_empty());
}

#[test]
fn test_malformed_payloads_are_decode_errors() {
    let catalog = default_catalog();

    let err = decode_payload(Domain::Crons, &catalog, "{not json", PayloadOrigin::Poll)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);

    let err = decode_payload(Domain::SystemStatus, &catalog, "42", PayloadOrigin::Poll)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);

    let err = decode_payload(Domain::Crons, &catalog, r#"{"crons":"nope"}"#, PayloadOrigin::Poll)
        .unwrap_err();
    assert!(err.is_recoverable());
}

//! Integration tests for the consumer facades

mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio_test::{assert_pending, assert_ready};

use common::{
    FetchScript, ScriptedTransport, advance, agents_body, crons_body, sessions_body, status_body,
};
use kodegen_live_status::consumers::{CONNECTION_CHECK_INTERVAL, DEFAULT_MEMORY_LIMIT};
use kodegen_live_status::{
    AgentSessions, AgentStatus, ConnectionStatus, ConnectionType, Domain, DomainConfig,
    RecentMemories, SidebarCrons, SidebarSkills, SidebarTasks, SnapshotSource, SseEvent,
    SyncBroker, SyncOptions, SystemStatusView, TaskStatus,
};

fn poll_only(domain: Domain, path: &str, period: Duration) -> SyncOptions {
    SyncOptions::builder()
        .domain(domain, DomainConfig::poll_only(path, period))
        .build()
}

#[tokio::test(start_paused = true)]
async fn test_agent_sessions_view() {
    common::init_logging();

    let transport = ScriptedTransport::new();
    transport.set_fallback_fetch(FetchScript::Ok(agents_body("research", "Market scan")));
    let broker = SyncBroker::new(
        poll_only(Domain::AgentSessions, "/api/agents", Duration::from_secs(5)),
        transport.clone(),
    );

    let mut agents = AgentSessions::mount(&broker).unwrap();

    // Before any data: every node present and idle
    let state = agents.state();
    assert!(state.meta.loading);
    assert_eq!(state.nodes.len(), broker.catalog().len());
    assert!(state.nodes.iter().all(|n| n.status == AgentStatus::Idle));
    assert_eq!(state.active_count, 0);

    assert!(agents.changed().await);
    let state = agents.state();
    assert!(!state.meta.loading);
    assert!(state.meta.gateway_connected);
    assert_eq!(state.meta.source, Some(SnapshotSource::Live));
    assert_eq!(state.meta.connection_type, ConnectionType::Poll);
    assert_eq!(state.active_agent_ids, ["research"]);
    assert_eq!(state.active_count, 1);
    // research has one session, qa two
    assert_eq!(state.total_sessions, 3);

    // Nothing new until the next poll
    {
        let mut next = tokio_test::task::spawn(agents.changed());
        assert_pending!(next.poll());
    }

    advance(5010).await;
    {
        let mut next = tokio_test::task::spawn(agents.changed());
        assert_ready!(next.poll());
    }
}

#[tokio::test(start_paused = true)]
async fn test_views_share_one_snapshot() {
    let transport = ScriptedTransport::new();
    transport.set_fallback_fetch(FetchScript::Ok(agents_body("code", "Build")));
    let broker = SyncBroker::new(
        poll_only(Domain::AgentSessions, "/api/agents", Duration::from_secs(5)),
        transport.clone(),
    );

    let sidebar = AgentSessions::mount(&broker).unwrap();
    let map = AgentSessions::mount(&broker).unwrap();
    advance(10).await;

    assert_eq!(transport.fetch_count(), 1);
    let a = sidebar.snapshot().unwrap();
    let b = map.snapshot().unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(sidebar.state(), map.state());
}

#[tokio::test(start_paused = true)]
async fn test_cached_view_after_failure() {
    let transport = ScriptedTransport::new();
    transport.push_fetch(FetchScript::Ok(agents_body("qa", "Regression")));
    let broker = SyncBroker::new(
        poll_only(Domain::AgentSessions, "/api/agents", Duration::from_secs(1)),
        transport.clone(),
    );

    let agents = AgentSessions::mount(&broker).unwrap();
    advance(10).await;
    let live = agents.state();

    advance(1000).await;
    let cached = agents.state();
    assert!(!cached.meta.gateway_connected);
    assert_eq!(cached.meta.source, Some(SnapshotSource::Cache));
    assert!(cached.meta.error.is_some());
    assert_eq!(cached.nodes, live.nodes);
    assert_eq!(cached.meta.last_updated, live.meta.last_updated);
}

#[tokio::test(start_paused = true)]
async fn test_offline_from_the_start() {
    let transport = ScriptedTransport::new();
    let broker = SyncBroker::new(
        poll_only(Domain::AgentSessions, "/api/agents", Duration::from_secs(5)),
        transport.clone(),
    );

    let agents = AgentSessions::mount(&broker).unwrap();
    advance(10).await;

    let state = agents.state();
    assert!(!state.meta.loading);
    assert!(!state.meta.gateway_connected);
    assert!(state.meta.error.is_some());
    assert!(state.meta.last_updated.is_none());
    assert_eq!(state.nodes.len(), broker.catalog().len());
}

#[tokio::test(start_paused = true)]
async fn test_sidebar_crons() {
    let transport = ScriptedTransport::new();
    transport.set_fallback_fetch(FetchScript::Ok(crons_body(5)));
    let broker = SyncBroker::new(
        poll_only(Domain::Crons, "/api/crons", Duration::from_secs(5)),
        transport.clone(),
    );

    let crons = SidebarCrons::mount(&broker).unwrap();
    assert!(crons.state().meta.loading);
    advance(10).await;

    let state = crons.state();
    assert_eq!(state.total_crons, 5);
    assert_eq!(state.enabled_crons, 3);

    crons.refresh();
    advance(10).await;
    assert_eq!(transport.fetch_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_sidebar_tasks_from_polled_sessions() {
    let transport = ScriptedTransport::new();
    transport.set_fallback_fetch(FetchScript::Ok(sessions_body()));
    let broker = SyncBroker::new(
        poll_only(Domain::Tasks, "/api/agents", Duration::from_secs(5)),
        transport.clone(),
    );

    let tasks = SidebarTasks::mount(&broker).unwrap();
    assert!(tasks.state().meta.loading);
    assert!(tasks.state().tasks.is_empty());
    advance(10).await;

    let state = tasks.state();
    assert_eq!(state.meta.connection_type, ConnectionType::Poll);
    assert_eq!(state.tasks.len(), 3);
    assert_eq!(state.running_tasks, 1);
    assert_eq!(state.completed_tasks, 1);
    assert_eq!(state.failed_tasks, 1);

    let blog = state.tasks.iter().find(|t| t.id == "s-1").unwrap();
    assert_eq!(blog.agent_id, "content");
    assert_eq!(blog.status, TaskStatus::Running);
    assert_eq!(blog.progress, Some(50));
}

#[tokio::test(start_paused = true)]
async fn test_sidebar_tasks_from_push() {
    let transport = ScriptedTransport::new();
    let feed = transport.open_stream_next();
    let broker = SyncBroker::new(SyncOptions::default(), transport.clone());

    let mut tasks = SidebarTasks::mount(&broker).unwrap();
    advance(10).await;
    let event = serde_json::json!({
        "sessions": [],
        "tasks": [
            { "id": "t-1", "agentId": "code", "label": "Refactor", "status": "running", "progress": 30 },
            { "id": "t-2", "agentId": "qa", "label": "Smoke test", "status": "running" },
            { "id": "t-3", "agentId": "qa", "label": "Lint", "status": "failed" }
        ],
        "stats": { "runningTasks": 2, "completedTasks": 0, "failedTasks": 1 }
    });
    feed.send(Ok(SseEvent::new("sessions", event.to_string())))
        .unwrap();

    assert!(tasks.changed().await);
    let state = tasks.state();
    assert_eq!(state.meta.connection_type, ConnectionType::Sse);
    assert_eq!(state.tasks.len(), 3);
    assert_eq!(state.running_tasks, 2);
    assert_eq!(state.failed_tasks, 1);
    assert_eq!(state.tasks[0].progress, Some(30));
    assert_eq!(transport.fetch_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_sidebar_skills_from_initial_event() {
    let transport = ScriptedTransport::new();
    let feed = transport.open_stream_next();
    let broker = SyncBroker::new(SyncOptions::default(), transport.clone());

    let mut skills = SidebarSkills::mount(&broker).unwrap();
    advance(10).await;

    // Events for other domains leave the skills view alone
    feed.send(Ok(SseEvent::new("crons", crons_body(2)))).unwrap();
    let event = serde_json::json!({
        "crons": [],
        "skills": [
            { "id": "web_search", "name": "Web Search", "category": "Research", "available": true },
            { "id": "send_email", "name": "Send Email", "category": "Outreach", "available": false }
        ]
    });
    feed.send(Ok(SseEvent::new("initial", event.to_string())))
        .unwrap();

    assert!(skills.changed().await);
    let state = skills.state();
    assert_eq!(state.skills.len(), 2);
    assert_eq!(state.available_skills, 1);
    assert!(state.meta.gateway_connected);
}

#[tokio::test(start_paused = true)]
async fn test_connection_status_interval_and_state() {
    let transport = ScriptedTransport::new();
    transport.push_fetch(FetchScript::Delayed(
        Duration::from_millis(40),
        status_body(2),
    ));
    let broker = SyncBroker::new(SyncOptions::default(), transport.clone());

    let status = SystemStatusView::mount(&broker).unwrap();
    assert_eq!(
        broker.effective_poll_interval(Domain::SystemStatus),
        Some(Duration::from_secs(30))
    );

    let connection = ConnectionStatus::mount(&broker).unwrap();
    assert_eq!(
        broker.effective_poll_interval(Domain::SystemStatus),
        Some(CONNECTION_CHECK_INTERVAL)
    );

    advance(100).await;
    let state = connection.state();
    assert!(state.is_online);
    assert_eq!(state.latency, Some(Duration::from_millis(40)));
    let last_ping = state.last_ping;
    assert!(last_ping.is_some());
    assert_eq!(status.state().status.unwrap().agents.active, 2);

    // The next check fails; the last ping survives
    advance(2500).await;
    let state = connection.state();
    assert!(!state.is_online);
    assert!(state.latency.is_none());
    assert_eq!(state.last_ping, last_ping);
    assert!(status.state().status.is_some());

    drop(connection);
    assert_eq!(
        broker.effective_poll_interval(Domain::SystemStatus),
        Some(Duration::from_secs(30))
    );
}

#[tokio::test(start_paused = true)]
async fn test_recent_memories_limit() {
    let memories: Vec<_> = (0..8)
        .map(|i| {
            serde_json::json!({
                "id": format!("m{i}"),
                "title": format!("Memory {i}"),
                "type": "note",
                "timestamp": format!("2026-03-01T12:0{i}:00Z")
            })
        })
        .collect();
    let body = serde_json::json!({ "memories": memories }).to_string();

    let transport = ScriptedTransport::new();
    transport.set_fallback_fetch(FetchScript::Ok(body));
    let broker = SyncBroker::new(SyncOptions::default(), transport.clone());

    let short = RecentMemories::mount_with_limit(&broker, 3).unwrap();
    let default = RecentMemories::mount(&broker).unwrap();
    advance(10).await;

    assert_eq!(transport.fetch_count(), 1);
    let state = short.state();
    assert_eq!(state.memories.len(), 3);
    assert_eq!(state.memories[0].id, "m7");
    assert_eq!(default.state().memories.len(), DEFAULT_MEMORY_LIMIT);

    assert!(RecentMemories::mount_with_limit(&broker, 0).is_err());
}

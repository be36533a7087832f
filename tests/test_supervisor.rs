//! Integration tests for `ConnectionSupervisor`
//!
//! Drives the transport state machine on a paused clock with a scripted
//! gateway and a recording sink.

mod common;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use common::{FetchScript, ScriptedTransport, StreamScript, advance, agents_body, crons_body};
use kodegen_live_status::{
    AgentStatus, CacheStore, ConnectionSupervisor, ConnectionType, Domain, DomainConfig,
    ErrorKind, Snapshot, SnapshotSink, SnapshotSource, SseEvent, StaleMark, SupervisorState,
    SyncError, SyncOptions,
};

/// Sink that records everything the cache accepts
struct RecordingSink {
    domain: Domain,
    cache: CacheStore,
    published: Mutex<Vec<Arc<Snapshot>>>,
}

impl RecordingSink {
    fn new(domain: Domain) -> Arc<Self> {
        Arc::new(Self {
            domain,
            cache: CacheStore::new(),
            published: Mutex::new(Vec::new()),
        })
    }

    fn published(&self) -> Vec<Arc<Snapshot>> {
        self.published.lock().clone()
    }

    fn count(&self) -> usize {
        self.published.lock().len()
    }
}

impl SnapshotSink for RecordingSink {
    fn next_seq(&self) -> u64 {
        self.cache.next_seq()
    }

    fn current(&self) -> Option<Arc<Snapshot>> {
        self.cache.get(self.domain)
    }

    fn publish(&self, snapshot: Snapshot) -> bool {
        let snapshot = Arc::new(snapshot);
        if !self.cache.set(self.domain, Arc::clone(&snapshot)) {
            return false;
        }
        self.published.lock().push(snapshot);
        true
    }

    fn publish_stale(&self, mark: StaleMark) -> bool {
        match self.cache.mark_stale_with(self.domain, mark) {
            Some(stale) => {
                self.published.lock().push(stale);
                true
            }
            None => false,
        }
    }
}

fn crons_every(period: Duration) -> SyncOptions {
    SyncOptions::builder()
        .domain(Domain::Crons, DomainConfig::poll_only("/api/crons", period))
        .build()
}

fn supervisor(
    domain: Domain,
    options: &SyncOptions,
    transport: &Arc<ScriptedTransport>,
    sink: &Arc<RecordingSink>,
) -> ConnectionSupervisor {
    ConnectionSupervisor::new(domain, options, transport.clone(), sink.clone()).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_poll_only_lifecycle() {
    common::init_logging();

    let transport = ScriptedTransport::new();
    transport.set_fallback_fetch(FetchScript::Ok(crons_body(2)));
    let sink = RecordingSink::new(Domain::Crons);
    let mut sup = supervisor(Domain::Crons, &crons_every(Duration::from_secs(1)), &transport, &sink);

    assert_eq!(sup.state(), SupervisorState::Idle);
    assert!(!sup.state().is_active());
    sup.start().unwrap();
    advance(10).await;

    assert_eq!(sup.state(), SupervisorState::Polling);
    assert!(sup.state().is_active());
    assert_eq!(sup.connection_type(), ConnectionType::Poll);
    assert_eq!(transport.stream_opens(), 0);
    let first = sink.published();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].source, SnapshotSource::Live);
    assert_eq!(first[0].connection_type, ConnectionType::Poll);
    assert!(first[0].latency.is_some());

    advance(2000).await;
    assert_eq!(sink.count(), 3);

    sup.stop();
    assert_eq!(sup.state(), SupervisorState::Stopped);
    assert!(!sup.state().is_active());
    assert!(!sup.is_running());
    advance(5000).await;
    assert_eq!(sink.count(), 3);

    // Stop is idempotent, and a stopped supervisor can start again
    sup.stop();
    sup.start().unwrap();
    advance(10).await;
    assert_eq!(sink.count(), 4);
    assert_eq!(sup.state(), SupervisorState::Polling);
}

#[tokio::test(start_paused = true)]
async fn test_late_response_dropped_after_stop() {
    let transport = ScriptedTransport::new();
    transport.push_fetch(FetchScript::Delayed(
        Duration::from_secs(2),
        crons_body(1),
    ));
    let sink = RecordingSink::new(Domain::Crons);
    let mut sup = supervisor(Domain::Crons, &crons_every(Duration::from_secs(30)), &transport, &sink);

    sup.start().unwrap();
    advance(500).await;
    assert_eq!(transport.fetch_count(), 1);

    sup.stop();
    advance(3000).await;
    assert_eq!(sink.count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_stream_open_timeout_falls_back_to_poll() {
    common::init_logging();

    let transport = ScriptedTransport::new();
    transport.push_stream(StreamScript::Hang);
    transport.set_fallback_fetch(FetchScript::Ok(agents_body("research", "Scan")));
    let sink = RecordingSink::new(Domain::AgentSessions);
    let mut sup = supervisor(Domain::AgentSessions, &SyncOptions::default(), &transport, &sink);

    sup.start().unwrap();
    advance(4900).await;
    assert_eq!(sink.count(), 0);
    assert_eq!(sup.state(), SupervisorState::Connecting);

    advance(200).await;
    let published = sink.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].connection_type, ConnectionType::Poll);
    assert!(published[0].is_live());
    assert_eq!(sup.state(), SupervisorState::Polling);
}

#[tokio::test(start_paused = true)]
async fn test_push_then_fallback_to_poll() {
    common::init_logging();

    let transport = ScriptedTransport::new();
    let feed = transport.open_stream_next();
    transport.set_fallback_fetch(FetchScript::Ok(agents_body("code", "Refactor")));
    let sink = RecordingSink::new(Domain::AgentSessions);
    let mut sup = supervisor(Domain::AgentSessions, &SyncOptions::default(), &transport, &sink);

    sup.start().unwrap();
    advance(10).await;
    assert_eq!(sup.state(), SupervisorState::Streaming);

    // Control and foreign events publish nothing
    feed.send(Ok(SseEvent::new("connected", "{}"))).unwrap();
    feed.send(Ok(SseEvent::new("crons", r#"{"crons":[]}"#))).unwrap();
    feed.send(Ok(SseEvent::new("sessions", agents_body("research", "Scan"))))
        .unwrap();
    advance(10).await;

    let published = sink.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].connection_type, ConnectionType::Sse);
    let nodes = &published[0].data.as_agent_sessions().unwrap().nodes;
    let research = nodes.iter().find(|n| n.id() == "research").unwrap();
    assert_eq!(research.status, AgentStatus::Working);
    assert_eq!(transport.fetch_count(), 0);

    feed.send(Err(SyncError::stream("connection reset"))).unwrap();
    advance(10).await;

    assert_eq!(sup.state(), SupervisorState::Polling);
    let published = sink.published();
    assert_eq!(published.len(), 2);
    assert_eq!(published[1].connection_type, ConnectionType::Poll);
    assert!(published[1].seq > published[0].seq);
}

#[tokio::test(start_paused = true)]
async fn test_malformed_push_is_discarded() {
    let transport = ScriptedTransport::new();
    let feed = transport.open_stream_next();
    let sink = RecordingSink::new(Domain::AgentSessions);
    let mut sup = supervisor(Domain::AgentSessions, &SyncOptions::default(), &transport, &sink);

    sup.start().unwrap();
    advance(10).await;
    feed.send(Ok(SseEvent::new("sessions", agents_body("qa", "Review"))))
        .unwrap();
    feed.send(Ok(SseEvent::new("sessions", "{broken"))).unwrap();
    feed.send(Err(SyncError::BufferOverflow(16))).unwrap();
    advance(10).await;

    // The bad message marks the data stale; the stream stays up
    let published = sink.published();
    assert_eq!(published.len(), 2);
    assert_eq!(published[1].source, SnapshotSource::Cache);
    assert!(Arc::ptr_eq(&published[0].data, &published[1].data));
    assert_eq!(sup.state(), SupervisorState::Streaming);

    feed.send(Ok(SseEvent::new("sessions", agents_body("qa", "Review again"))))
        .unwrap();
    advance(10).await;
    assert!(sink.published()[2].is_live());
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_event_reopens_stream() {
    let transport = ScriptedTransport::new();
    let first = transport.open_stream_next();
    let _second = transport.open_stream_next();
    let sink = RecordingSink::new(Domain::Crons);
    let mut sup = supervisor(Domain::Crons, &SyncOptions::default(), &transport, &sink);

    sup.start().unwrap();
    advance(10).await;
    first.send(Ok(SseEvent::new("reconnect", "{}"))).unwrap();
    advance(10).await;
    assert_eq!(sup.state(), SupervisorState::Reconnecting);

    advance(1000).await;
    assert_eq!(transport.stream_opens(), 2);
    assert_eq!(sup.state(), SupervisorState::Streaming);
    assert_eq!(transport.fetch_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_stream_retry_upgrades_from_polling() {
    let transport = ScriptedTransport::new();
    transport.push_stream(StreamScript::Fail);
    let _feed = transport.open_stream_next();
    transport.set_fallback_fetch(FetchScript::Ok(crons_body(1)));
    let sink = RecordingSink::new(Domain::Crons);
    let mut sup = supervisor(Domain::Crons, &SyncOptions::default(), &transport, &sink);

    sup.start().unwrap();
    advance(10).await;
    assert_eq!(sup.state(), SupervisorState::Polling);
    assert_eq!(transport.fetch_count(), 1);

    // First retry after the reconnect base delay
    advance(1000).await;
    assert_eq!(sup.state(), SupervisorState::Streaming);
    assert_eq!(transport.stream_opens(), 2);

    // Polling stopped with the upgrade
    advance(10_000).await;
    assert_eq!(transport.fetch_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_while_streaming() {
    let transport = ScriptedTransport::new();
    let _feed = transport.open_stream_next();
    transport.set_fallback_fetch(FetchScript::Ok(crons_body(3)));
    let sink = RecordingSink::new(Domain::Crons);
    let mut sup = supervisor(Domain::Crons, &SyncOptions::default(), &transport, &sink);

    sup.start().unwrap();
    advance(10).await;
    sup.refresh();
    advance(10).await;

    assert_eq!(transport.fetch_count(), 1);
    assert_eq!(sup.state(), SupervisorState::Streaming);
    let published = sink.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].connection_type, ConnectionType::Sse);
    assert_eq!(published[0].data.as_crons().unwrap().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_first_failure_emits_placeholder() {
    let transport = ScriptedTransport::new();
    let sink = RecordingSink::new(Domain::Crons);
    let mut sup = supervisor(Domain::Crons, &crons_every(Duration::from_secs(1)), &transport, &sink);

    sup.start().unwrap();
    advance(10).await;

    let published = sink.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].source, SnapshotSource::Cache);
    assert!(published[0].placeholder);
    assert!(published[0].error.is_some());
    assert!(published[0].data.as_crons().unwrap().is_empty());

    // Further failures change nothing
    advance(3000).await;
    assert_eq!(sink.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_set_poll_interval() {
    let transport = ScriptedTransport::new();
    transport.set_fallback_fetch(FetchScript::Ok(crons_body(1)));
    let sink = RecordingSink::new(Domain::Crons);
    let mut sup = supervisor(Domain::Crons, &crons_every(Duration::from_secs(10)), &transport, &sink);

    sup.start().unwrap();
    advance(10).await;
    assert_eq!(transport.fetch_count(), 1);

    sup.set_poll_interval(Duration::from_secs(1));
    assert_eq!(sup.poll_interval(), Duration::from_secs(1));
    advance(3500).await;
    assert!(transport.fetch_count() >= 4);
}

#[test]
fn test_unconfigured_domain_is_rejected() {
    let options = SyncOptions::builder().without_domain(Domain::Memories).build();
    let err = ConnectionSupervisor::new(
        Domain::Memories,
        &options,
        ScriptedTransport::new(),
        RecordingSink::new(Domain::Memories),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Programmer);
}

#[test]
fn test_start_outside_runtime_fails() {
    let sink = RecordingSink::new(Domain::Crons);
    let mut sup = ConnectionSupervisor::new(
        Domain::Crons,
        &SyncOptions::default(),
        ScriptedTransport::new(),
        sink,
    )
    .unwrap();
    assert!(matches!(sup.start(), Err(SyncError::InvalidConfig(_))));
    assert!(!sup.is_running());
}

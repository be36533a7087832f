//! Shared fixtures for integration tests
//!
//! `ScriptedTransport` plays back a queue of stream and fetch outcomes so
//! supervisor and broker behavior can be driven on a paused tokio clock.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use kodegen_live_status::{
    EventStream, GatewayTransport, Result, Snapshot, SseEvent, SyncError,
};

/// Sender half of a scripted push stream
pub type StreamFeed = mpsc::UnboundedSender<Result<SseEvent>>;

/// What the next `open_stream` call does
pub enum StreamScript {
    /// Refuse the connection
    Fail,
    /// Never resolve
    Hang,
    /// Open, fed by the paired sender
    Open(mpsc::UnboundedReceiver<Result<SseEvent>>),
}

/// What the next `fetch` call does
#[derive(Clone)]
pub enum FetchScript {
    /// Answer with a body
    Ok(String),
    /// Answer with a body after a delay
    Delayed(Duration, String),
    /// Fail with a connection error
    Fail,
}

/// Transport that follows a script
pub struct ScriptedTransport {
    streams: Mutex<VecDeque<StreamScript>>,
    fetches: Mutex<VecDeque<FetchScript>>,
    fallback_fetch: Mutex<FetchScript>,
    feeds: Mutex<Vec<StreamFeed>>,
    stream_opens: AtomicUsize,
    fetch_count: AtomicUsize,
}

impl ScriptedTransport {
    /// Streams fail and fetches fail until scripted otherwise
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            streams: Mutex::new(VecDeque::new()),
            fetches: Mutex::new(VecDeque::new()),
            fallback_fetch: Mutex::new(FetchScript::Fail),
            feeds: Mutex::new(Vec::new()),
            stream_opens: AtomicUsize::new(0),
            fetch_count: AtomicUsize::new(0),
        })
    }

    /// Queue a stream that opens; returns the feed for it
    pub fn open_stream_next(&self) -> StreamFeed {
        let (tx, rx) = mpsc::unbounded_channel();
        self.streams.lock().push_back(StreamScript::Open(rx));
        self.feeds.lock().push(tx.clone());
        tx
    }

    /// Queue a stream outcome
    pub fn push_stream(&self, script: StreamScript) {
        self.streams.lock().push_back(script);
    }

    /// Queue a fetch outcome
    pub fn push_fetch(&self, script: FetchScript) {
        self.fetches.lock().push_back(script);
    }

    /// Outcome for fetches once the queue is empty
    pub fn set_fallback_fetch(&self, script: FetchScript) {
        *self.fallback_fetch.lock() = script;
    }

    pub fn stream_opens(&self) -> usize {
        self.stream_opens.load(Ordering::SeqCst)
    }

    /// Scripted streams the supervisor has closed or dropped
    pub fn closed_streams(&self) -> usize {
        self.feeds.lock().iter().filter(|feed| feed.is_closed()).count()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

impl GatewayTransport for ScriptedTransport {
    fn open_stream<'a>(
        &'a self,
        url: &'a str,
        _max_event_size: usize,
    ) -> BoxFuture<'a, Result<EventStream>> {
        self.stream_opens.fetch_add(1, Ordering::SeqCst);
        let script = self.streams.lock().pop_front().unwrap_or(StreamScript::Fail);
        Box::pin(async move {
            match script {
                StreamScript::Fail => Err(SyncError::connection(format!("refused: {url}"))),
                StreamScript::Hang => futures::future::pending().await,
                StreamScript::Open(rx) => Ok(EventStream::from_receiver(rx)),
            }
        })
    }

    fn fetch<'a>(&'a self, url: &'a str, _timeout: Duration) -> BoxFuture<'a, Result<String>> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        let script = self
            .fetches
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback_fetch.lock().clone());
        Box::pin(async move {
            match script {
                FetchScript::Ok(body) => Ok(body),
                FetchScript::Delayed(delay, body) => {
                    tokio::time::sleep(delay).await;
                    Ok(body)
                }
                FetchScript::Fail => Err(SyncError::connection(format!("refused: {url}"))),
            }
        })
    }
}

/// Snapshots collected by a subscriber callback
#[derive(Clone, Default)]
pub struct Collector {
    seen: Arc<Mutex<Vec<Arc<Snapshot>>>>,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Callback that records into this collector
    pub fn callback(&self) -> impl Fn(&Arc<Snapshot>) + Send + Sync + 'static {
        let seen = Arc::clone(&self.seen);
        move |snapshot| seen.lock().push(Arc::clone(snapshot))
    }

    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn all(&self) -> Vec<Arc<Snapshot>> {
        self.seen.lock().clone()
    }

    pub fn last(&self) -> Option<Arc<Snapshot>> {
        self.seen.lock().last().cloned()
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Let spawned tasks run, advancing the paused clock by `ms`
pub async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

pub fn agents_body(working: &str, task: &str) -> String {
    serde_json::json!({
        "agents": [
            { "id": working, "sessions": 1, "activeTask": task },
            { "id": "qa", "sessions": 2 }
        ],
        "timestamp": "2026-03-01T12:00:00Z"
    })
    .to_string()
}

pub fn crons_body(count: usize) -> String {
    let crons: Vec<_> = (0..count)
        .map(|i| {
            serde_json::json!({
                "id": format!("cron-{i}"),
                "name": format!("Job {i}"),
                "schedule": "*/5 * * * *",
                "enabled": i % 2 == 0
            })
        })
        .collect();
    serde_json::json!({ "crons": crons }).to_string()
}

pub fn status_body(active_agents: u32) -> String {
    serde_json::json!({
        "assistant": { "status": "online", "uptime": 120 },
        "gateway": { "connected": true, "latency": 12 },
        "agents": { "active": active_agents, "idle": 8 - active_agents, "total": 8 }
    })
    .to_string()
}

/// `/api/agents` body in the session-list shape: one session per status
pub fn sessions_body() -> String {
    serde_json::json!({
        "sessions": [
            { "id": "s-1", "label": "Write launch blog", "status": "running", "startedAt": "2026-03-01T12:00:00Z" },
            { "id": "s-2", "label": "QA regression pass", "status": "complete", "startedAt": "2026-03-01T11:00:00Z" },
            { "id": "s-3", "label": "Sales outreach draft", "status": "failed", "startedAt": "2026-03-01T10:00:00Z" },
            { "id": "s-4", "label": "Research backlog", "status": "idle" }
        ]
    })
    .to_string()
}

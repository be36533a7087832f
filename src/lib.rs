//! # Live status synchronization for agent dashboards
//!
//! Keeps a dashboard's view of an agent gateway fresh: which agents are
//! working and on what tasks, which crons are scheduled, whether the gateway
//! itself is healthy.
//! Every data domain gets exactly one upstream connection no matter how many
//! panels watch it, prefers a server-sent event stream, falls back to polling
//! when the stream is unavailable, and keeps showing the last good data
//! (marked as cached) when the gateway goes away.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use kodegen_live_status::{AgentSessions, HttpTransport, SyncBroker, SyncOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = SyncOptions::builder()
//!         .base_url("http://127.0.0.1:3000")
//!         .build();
//!     let broker = SyncBroker::new(options, Arc::new(HttpTransport::new()?));
//!
//!     let mut agents = AgentSessions::mount(&broker)?;
//!     while agents.changed().await {
//!         let state = agents.state();
//!         log::info!("{} of {} agents working", state.active_count, state.nodes.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Raw Subscriptions
//!
//! The facades in [`consumers`] are thin wrappers over
//! [`SyncBroker::subscribe`]. Subscribe directly to get every snapshot as it
//! is accepted:
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use kodegen_live_status::{Domain, NoopTransport, SyncBroker, SyncOptions};
//! # async fn example() -> kodegen_live_status::Result<()> {
//! let broker = SyncBroker::new(SyncOptions::default(), Arc::new(NoopTransport));
//! let subscription = broker.subscribe(Domain::Crons, |snapshot| {
//!     log::info!("crons seq {} from {:?}", snapshot.seq, snapshot.source);
//! })?;
//! // Dropping the handle unsubscribes
//! drop(subscription);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`types`]: Catalog, gateway records, snapshots and options
//! - [`normalizer`]: Projects raw agent records onto the catalog
//! - [`decode`]: Gateway payloads to domain data
//! - [`cache`]: Per-domain last-good-value store
//! - [`transport`]: Gateway transports and the SSE decoder
//! - [`supervisor`]: One connection per domain, stream first, poll fallback
//! - [`broker`]: Reference-counted subscriptions over supervisors
//! - [`consumers`]: Typed facades for dashboard panels
//! - [`error`]: Error types and handling
//!
//! ## Feature Flags
//!
//! - `http` (default) - HTTP transport over `reqwest` and the watcher binary
//!
//! ## Error Handling
//!
//! Only mistakes in setup surface as errors: an unconfigured domain, a zero
//! interval, no tokio runtime. Gateway failures never reach subscribers as
//! errors; they arrive as snapshots with `source = Cache` and an `error`
//! string.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use kodegen_live_status::{Domain, NoopTransport, SyncBroker, SyncError, SyncOptions};
//! # fn example() {
//! let options = SyncOptions::builder().without_domain(Domain::Memories).build();
//! let broker = SyncBroker::new(options, Arc::new(NoopTransport));
//! match broker.subscribe(Domain::Memories, |_| {}) {
//!     Ok(_subscription) => {}
//!     Err(SyncError::InvalidConfig(msg)) => log::error!("bad setup: {}", msg),
//!     Err(e) => log::error!("Error: {}", e),
//! }
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod broker;
pub mod cache;
pub mod consumers;
pub mod decode;
pub mod error;
pub mod normalizer;
pub mod supervisor;
pub mod transport;
pub mod types;

// Re-export commonly used types for external API
pub use broker::{SubscribeOptions, Subscription, SyncBroker};
pub use cache::{CacheStore, StaleMark};
pub use consumers::{
    AgentSessions, AgentSessionsState, ConnectionState, ConnectionStatus, RecentMemories,
    RecentMemoriesState, SidebarCrons, SidebarCronsState, SidebarSkills, SidebarSkillsState,
    SidebarTasks, SidebarTasksState, SyncMeta, SystemStatusState, SystemStatusView,
};
pub use decode::{PayloadOrigin, decode_payload};
pub use error::{ErrorKind, Result, SyncError};
pub use normalizer::{group_sessions, normalize, task_counts, tasks_from_sessions};
pub use supervisor::{Backoff, ConnectionSupervisor, SnapshotSink, SupervisorState};
#[cfg(feature = "http")]
pub use transport::HttpTransport;
pub use transport::{EventStream, GatewayTransport, NoopTransport, SseDecoder, SseEvent};

// Re-export type submodules for flat public API
pub use types::catalog::{AgentNodeConfig, Catalog, Position, default_catalog};
pub use types::gateway::{
    AgentTask, CronJob, GatewaySession, RawAgentRecord, RecentMemory, SessionStatus, Skill,
    SystemStatus, TaskCounts, TaskStatus,
};
pub use types::identifiers::{AgentId, Domain};
pub use types::node::{AgentNodeState, AgentStatus};
pub use types::options::{DomainConfig, SyncOptions, SyncOptionsBuilder, TransportKind};
pub use types::snapshot::{AgentSessionsData, ConnectionType, DomainData, Snapshot, SnapshotSource};

/// Version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

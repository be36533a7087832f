//! Per-domain connection supervision
//!
//! This module is organized into logical submodules:
//! - `core`: The `ConnectionSupervisor` handle with start/stop lifecycle
//! - `state`: Observable supervisor states and the tagged transport state
//! - `commands`: Command protocol between the handle and its background task
//! - `background`: Shared task context and the transport state machine
//! - `stream`: Push stream handling
//! - `poll`: Interval polling and stream upgrade attempts
//! - `backoff`: Capped exponential reconnect delay
//! - `sink`: Where accepted snapshots go

mod background;
mod backoff;
mod commands;
mod core;
mod poll;
mod sink;
mod state;
mod stream;

pub use backoff::Backoff;
pub use self::core::ConnectionSupervisor;
pub use sink::SnapshotSink;
pub use state::SupervisorState;

//! Supervisor state types

use std::fmt;

use tokio::time::Interval;

use crate::transport::EventStream;

/// Observable lifecycle state of a supervisor
///
/// `Idle → Connecting → {Streaming | Polling} → Reconnecting → … → Stopped`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupervisorState {
    /// Created, never started
    Idle,
    /// First transport attempt in progress
    Connecting,
    /// Push stream open and healthy
    Streaming,
    /// Interval polling, possibly retrying the stream in the background
    Polling,
    /// Stream lost or a stream retry in progress
    Reconnecting,
    /// Stopped by its owner
    Stopped,
}

impl SupervisorState {
    /// Whether a background task is running in this state
    #[must_use]
    pub fn is_active(self) -> bool {
        !matches!(self, Self::Idle | Self::Stopped)
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Streaming => "streaming",
            Self::Polling => "polling",
            Self::Reconnecting => "reconnecting",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Transport owned by the background task
///
/// Exactly one of these is live at a time; each variant carries the resource
/// it owns so switching transports drops the previous one.
pub(super) enum TransportState {
    /// No transport yet; next step is a stream attempt (or polling)
    Idle,
    /// Push stream open
    Sse(EventStream),
    /// Polling on a ticker
    Poll(Interval),
}

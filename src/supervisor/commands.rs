//! Command protocol for supervisor background tasks
//!
//! The handle never touches transport state directly; it sends one of these
//! and the background task applies it between events.

use std::time::Duration;

/// Commands that can be sent to a supervisor background task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum SupervisorCommand {
    /// Run one out-of-band fetch without disturbing the transport
    Refresh,

    /// Change the poll interval; takes effect from the next tick
    SetPollInterval(Duration),
}

//! Push stream handling for supervisors

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;

use super::background::{StreamExit, SupervisorContext};
use super::backoff::Backoff;
use super::commands::SupervisorCommand;
use crate::decode::{PayloadOrigin, decode_payload};
use crate::error::{ErrorKind, SyncError};
use crate::transport::{EventStream, SseEvent};
use crate::types::snapshot::{ConnectionType, Snapshot};

// ============================================================================
// CONTROL EVENTS
// ============================================================================

/// Sent by the gateway once the stream is established
const EVENT_CONNECTED: &str = "connected";

/// Sent by the gateway when the client should reopen the stream
const EVENT_RECONNECT: &str = "reconnect";

// ============================================================================
// STREAM IMPLEMENTATION
// ============================================================================

impl SupervisorContext {
    /// Try to open the push stream within the open timeout
    ///
    /// Returns `None` when the domain has no stream or the attempt failed.
    pub async fn open_stream(&self) -> Option<EventStream> {
        if !self.config.prefers_stream() {
            return None;
        }
        let url = self.stream_url.as_deref()?;

        match tokio::time::timeout(
            self.stream_open_timeout,
            self.transport.open_stream(url, self.max_event_size),
        )
        .await
        {
            Ok(Ok(stream)) => {
                log::info!("[{}] push stream open at {}", self.domain, url);
                Some(stream)
            }
            Ok(Err(e)) => {
                log::warn!("[{}] push stream unavailable: {}", self.domain, e);
                None
            }
            Err(_) => {
                log::warn!(
                    "[{}] push stream did not open within {:?}",
                    self.domain,
                    self.stream_open_timeout
                );
                None
            }
        }
    }

    /// Consume the stream until it fails, asks for a reconnect, or the handle
    /// goes away
    pub(super) async fn stream_phase(
        self: &Arc<Self>,
        stream: &mut EventStream,
        commands: &mut mpsc::UnboundedReceiver<SupervisorCommand>,
        poll_interval: &mut Duration,
        backoff: &mut Backoff,
    ) -> StreamExit {
        loop {
            tokio::select! {
                event = stream.next_event() => match event {
                    Some(Ok(event)) => {
                        if event.event == EVENT_RECONNECT {
                            log::info!("[{}] gateway requested reconnect", self.domain);
                            return StreamExit::Reconnect;
                        }
                        self.handle_event(&event);
                    }
                    Some(Err(e)) if e.kind() == ErrorKind::Decode => {
                        log::warn!("[{}] discarding malformed event: {}", self.domain, e);
                    }
                    Some(Err(e)) => return StreamExit::Failed(e),
                    None => {
                        return StreamExit::Failed(SyncError::stream("event stream ended"));
                    }
                },
                command = commands.recv() => match command {
                    Some(SupervisorCommand::Refresh) => self.spawn_refresh(),
                    Some(SupervisorCommand::SetPollInterval(period)) => {
                        // Nothing is ticking; remembered for the next fallback
                        *poll_interval = period;
                        backoff.set_cap(period);
                    }
                    None => return StreamExit::Closed,
                },
            }
        }
    }

    /// Apply one push event
    ///
    /// The sequence number is taken on receipt, which orders it after any
    /// poll already in flight.
    fn handle_event(&self, event: &SseEvent) {
        if event.event == EVENT_CONNECTED {
            log::debug!("[{}] stream confirmed by gateway", self.domain);
            return;
        }
        if !self.config.accepts_event(&event.event) {
            return;
        }

        let seq = self.sink.next_seq();
        match decode_payload(self.domain, &self.catalog, &event.data, PayloadOrigin::Stream) {
            Ok(Some(decoded)) => {
                let snapshot = Snapshot::live(
                    decoded.data,
                    seq,
                    decoded.timestamp.unwrap_or_else(Utc::now),
                    ConnectionType::Sse,
                );
                self.publish(snapshot);
            }
            Ok(None) => {
                log::trace!(
                    "[{}] '{}' event carried nothing for this domain",
                    self.domain,
                    event.event
                );
            }
            Err(e) => self.record_failure(seq, ConnectionType::Sse, &e),
        }
    }

    /// Out-of-band fetch while the stream stays open
    fn spawn_refresh(self: &Arc<Self>) {
        let ctx = Arc::clone(self);
        tokio::spawn(async move {
            let connection = ctx.connection();
            tokio::select! {
                () = ctx.cancel.cancelled() => {}
                () = ctx.poll_once(connection) => {}
            }
        });
    }
}

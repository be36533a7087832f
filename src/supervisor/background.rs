//! Background task for a domain supervisor
//!
//! One task per running supervisor owns the transport and drives the state
//! machine. Everything it shares with the handle lives in
//! [`SupervisorContext`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior, interval, interval_at};
use tokio_util::sync::CancellationToken;

use super::backoff::Backoff;
use super::commands::SupervisorCommand;
use super::sink::SnapshotSink;
use super::state::{SupervisorState, TransportState};
use crate::cache::StaleMark;
use crate::decode::{PayloadOrigin, decode_payload};
use crate::error::SyncError;
use crate::transport::{EventStream, GatewayTransport};
use crate::types::catalog::Catalog;
use crate::types::identifiers::Domain;
use crate::types::options::DomainConfig;
use crate::types::snapshot::{ConnectionType, Snapshot};

/// Shared state for one run of a supervisor
pub(super) struct SupervisorContext {
    pub domain: Domain,
    pub config: DomainConfig,
    pub stream_url: Option<String>,
    pub poll_url: String,
    pub request_timeout: Duration,
    pub stream_open_timeout: Duration,
    pub reconnect_base: Duration,
    pub max_event_size: usize,
    pub catalog: Arc<Catalog>,
    pub transport: Arc<dyn GatewayTransport>,
    pub sink: Arc<dyn SnapshotSink>,
    pub state: Arc<RwLock<SupervisorState>>,
    pub connection: Arc<RwLock<ConnectionType>>,
    pub active: Arc<AtomicBool>,
    pub cancel: CancellationToken,
}

/// How a stream phase ended
pub(super) enum StreamExit {
    /// Gateway asked for a reconnect; reopen without falling back
    Reconnect,
    /// Stream errored or closed; fall back to polling
    Failed(SyncError),
    /// Handle dropped; shut down
    Closed,
}

/// How a poll phase ended
pub(super) enum PollExit {
    /// A stream retry succeeded
    Upgrade(EventStream),
    /// Handle dropped; shut down
    Closed,
}

/// Spawn the background task for one supervisor run
pub(super) fn spawn_supervisor_task(
    ctx: Arc<SupervisorContext>,
    command_rx: mpsc::UnboundedReceiver<SupervisorCommand>,
    poll_interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let cancel = ctx.cancel.clone();
        tokio::select! {
            () = cancel.cancelled() => {
                log::debug!("[{}] supervisor task cancelled", ctx.domain);
            }
            () = Arc::clone(&ctx).run(command_rx, poll_interval) => {
                log::debug!("[{}] supervisor task finished", ctx.domain);
            }
        }
    })
}

impl SupervisorContext {
    /// Whether results may still be published
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst) && !self.cancel.is_cancelled()
    }

    pub fn set_state(&self, state: SupervisorState) {
        if !self.is_active() {
            return;
        }
        let mut current = self.state.write();
        if *current != state {
            log::debug!("[{}] {} -> {}", self.domain, *current, state);
            *current = state;
        }
    }

    pub fn set_connection(&self, connection: ConnectionType) {
        if self.is_active() {
            *self.connection.write() = connection;
        }
    }

    pub fn connection(&self) -> ConnectionType {
        *self.connection.read()
    }

    /// Drive the transport state machine until the handle goes away
    async fn run(
        self: Arc<Self>,
        mut commands: mpsc::UnboundedReceiver<SupervisorCommand>,
        mut poll_interval: Duration,
    ) {
        let mut backoff = Backoff::new(self.reconnect_base, poll_interval);
        let mut transport = TransportState::Idle;
        self.set_state(SupervisorState::Connecting);

        loop {
            transport = match transport {
                TransportState::Idle => match self.open_stream().await {
                    Some(stream) => TransportState::Sse(stream),
                    None => TransportState::Poll(poll_ticker(poll_interval, false)),
                },
                TransportState::Sse(mut stream) => {
                    self.set_state(SupervisorState::Streaming);
                    self.set_connection(ConnectionType::Sse);
                    backoff.reset();

                    let exit = self
                        .stream_phase(&mut stream, &mut commands, &mut poll_interval, &mut backoff)
                        .await;
                    stream.close();

                    match exit {
                        StreamExit::Reconnect => {
                            self.set_state(SupervisorState::Reconnecting);
                            tokio::time::sleep(self.reconnect_base).await;
                            TransportState::Idle
                        }
                        StreamExit::Failed(e) => {
                            log::warn!("[{}] push stream lost, polling: {}", self.domain, e);
                            self.set_state(SupervisorState::Reconnecting);
                            TransportState::Poll(poll_ticker(poll_interval, false))
                        }
                        StreamExit::Closed => return,
                    }
                }
                TransportState::Poll(ticker) => {
                    self.set_state(SupervisorState::Polling);
                    self.set_connection(ConnectionType::Poll);

                    match self
                        .poll_phase(ticker, &mut commands, &mut poll_interval, &mut backoff)
                        .await
                    {
                        PollExit::Upgrade(stream) => {
                            log::info!("[{}] push stream restored", self.domain);
                            TransportState::Sse(stream)
                        }
                        PollExit::Closed => return,
                    }
                }
            };
        }
    }

    /// One request/response fetch, published as a snapshot
    ///
    /// The sequence number is taken when the request is issued, so a slow
    /// response can never overwrite a newer one.
    pub async fn poll_once(&self, connection: ConnectionType) {
        let seq = self.sink.next_seq();
        let started = Instant::now();

        let result = match tokio::time::timeout(
            self.request_timeout,
            self.transport.fetch(&self.poll_url, self.request_timeout),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(SyncError::timeout(format!(
                "{} did not answer within {:?}",
                self.poll_url, self.request_timeout
            ))),
        };

        if !self.is_active() {
            log::debug!("[{}] dropping response that arrived after stop", self.domain);
            return;
        }

        let decoded = result.and_then(|body| {
            decode_payload(self.domain, &self.catalog, &body, PayloadOrigin::Poll)
        });

        match decoded {
            Ok(Some(decoded)) => {
                let snapshot = Snapshot::live(
                    decoded.data,
                    seq,
                    decoded.timestamp.unwrap_or_else(Utc::now),
                    connection,
                )
                .with_latency(started.elapsed());
                self.publish(snapshot);
            }
            Ok(None) => {}
            Err(e) => self.record_failure(seq, connection, &e),
        }
    }

    pub fn publish(&self, snapshot: Snapshot) {
        if !self.is_active() {
            return;
        }
        let seq = snapshot.seq;
        if self.sink.publish(snapshot) {
            log::trace!("[{}] published seq {}", self.domain, seq);
        }
    }

    /// Fall back to cached data after a failed request
    ///
    /// With nothing cached yet, emits an empty snapshot marked as cache so
    /// consumers can leave their loading state.
    pub fn record_failure(&self, failed_seq: u64, connection: ConnectionType, error: &SyncError) {
        if !self.is_active() {
            return;
        }
        log::warn!("[{}] {}; serving cached data", self.domain, error);

        if self.sink.current().is_none() {
            let placeholder = Snapshot::unavailable(
                self.domain,
                &self.catalog,
                failed_seq,
                connection,
                error.to_string(),
            );
            self.sink.publish(placeholder);
            return;
        }

        self.sink.publish_stale(StaleMark {
            failed_seq: Some(failed_seq),
            error: Some(error.to_string()),
            connection_type: Some(connection),
        });
    }
}

/// Poll ticker that does not burst after a stall
///
/// With `delayed` the first tick is one period out; otherwise it fires at once.
pub(super) fn poll_ticker(period: Duration, delayed: bool) -> tokio::time::Interval {
    let mut ticker = if delayed {
        interval_at(Instant::now() + period, period)
    } else {
        interval(period)
    };
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

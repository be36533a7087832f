//! Supervisor handle and lifecycle management
//!
//! A `ConnectionSupervisor` owns the transport for exactly one domain. It is
//! cheap while idle; `start` spawns the background task and `stop` cancels it.
//! After `stop`, nothing the old task produces reaches the sink.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::background::{SupervisorContext, spawn_supervisor_task};
use super::commands::SupervisorCommand;
use super::sink::SnapshotSink;
use super::state::SupervisorState;
use crate::error::{Result, SyncError};
use crate::transport::GatewayTransport;
use crate::types::catalog::Catalog;
use crate::types::identifiers::Domain;
use crate::types::options::{DomainConfig, SyncOptions};
use crate::types::snapshot::ConnectionType;

/// A running background task and its controls
struct RunHandle {
    command_tx: mpsc::UnboundedSender<SupervisorCommand>,
    active: Arc<AtomicBool>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Transport owner for one domain
pub struct ConnectionSupervisor {
    domain: Domain,
    config: DomainConfig,
    stream_url: Option<String>,
    poll_url: String,
    request_timeout: Duration,
    stream_open_timeout: Duration,
    reconnect_base: Duration,
    max_event_size: usize,
    catalog: Arc<Catalog>,
    transport: Arc<dyn GatewayTransport>,
    sink: Arc<dyn SnapshotSink>,
    state: Arc<RwLock<SupervisorState>>,
    connection: Arc<RwLock<ConnectionType>>,
    run: Option<RunHandle>,
}

impl ConnectionSupervisor {
    /// Create an idle supervisor for a domain
    ///
    /// # Errors
    /// Returns `InvalidConfig` if the domain is not configured or its
    /// configuration is unusable
    pub fn new(
        domain: Domain,
        options: &SyncOptions,
        transport: Arc<dyn GatewayTransport>,
        sink: Arc<dyn SnapshotSink>,
    ) -> Result<Self> {
        let config = options.domain_config(domain)?.clone();
        config.validate(domain)?;

        Ok(Self {
            domain,
            stream_url: config.stream_path.as_deref().map(|p| options.resolve(p)),
            poll_url: options.resolve(&config.poll_path),
            config,
            request_timeout: options.request_timeout,
            stream_open_timeout: options.stream_open_timeout,
            reconnect_base: options.reconnect_base,
            max_event_size: options.max_event_size,
            catalog: Arc::clone(&options.catalog),
            transport,
            sink,
            state: Arc::new(RwLock::new(SupervisorState::Idle)),
            connection: Arc::new(RwLock::new(ConnectionType::None)),
            run: None,
        })
    }

    /// Domain this supervisor serves
    #[must_use]
    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> SupervisorState {
        *self.state.read()
    }

    /// Transport currently producing data
    #[must_use]
    pub fn connection_type(&self) -> ConnectionType {
        *self.connection.read()
    }

    /// Whether a background task is running
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    /// Poll interval the next (or current) run uses
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.config.poll_interval
    }

    /// Start supervising; a no-op if already running
    ///
    /// # Errors
    /// Returns `InvalidConfig` when called outside a tokio runtime
    pub fn start(&mut self) -> Result<()> {
        if self.run.is_some() {
            return Ok(());
        }
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(SyncError::invalid_config(format!(
                "supervisor for {} must be started inside a tokio runtime",
                self.domain
            )));
        }

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let active = Arc::new(AtomicBool::new(true));
        let cancel = CancellationToken::new();

        let ctx = Arc::new(SupervisorContext {
            domain: self.domain,
            config: self.config.clone(),
            stream_url: self.stream_url.clone(),
            poll_url: self.poll_url.clone(),
            request_timeout: self.request_timeout,
            stream_open_timeout: self.stream_open_timeout,
            reconnect_base: self.reconnect_base,
            max_event_size: self.max_event_size,
            catalog: Arc::clone(&self.catalog),
            transport: Arc::clone(&self.transport),
            sink: Arc::clone(&self.sink),
            state: Arc::clone(&self.state),
            connection: Arc::clone(&self.connection),
            active: Arc::clone(&active),
            cancel: cancel.clone(),
        });

        log::info!(
            "[{}] supervisor starting (poll every {:?})",
            self.domain,
            self.config.poll_interval
        );
        let task = spawn_supervisor_task(ctx, command_rx, self.config.poll_interval);

        self.run = Some(RunHandle {
            command_tx,
            active,
            cancel,
            task,
        });
        Ok(())
    }

    /// Stop supervising; a no-op if not running
    ///
    /// Closes the transport and guarantees that late responses from this run
    /// are dropped.
    pub fn stop(&mut self) {
        let Some(run) = self.run.take() else {
            return;
        };

        run.active.store(false, Ordering::SeqCst);
        run.cancel.cancel();
        run.task.abort();

        *self.state.write() = SupervisorState::Stopped;
        *self.connection.write() = ConnectionType::None;
        log::info!("[{}] supervisor stopped", self.domain);
    }

    /// Fetch once, out of band, without disturbing the transport
    pub fn refresh(&self) {
        match &self.run {
            Some(run) => {
                let _ = run.command_tx.send(SupervisorCommand::Refresh);
            }
            None => log::debug!("[{}] refresh ignored, supervisor not running", self.domain),
        }
    }

    /// Change the poll interval
    ///
    /// Takes effect from the next tick of a running supervisor, or from the
    /// next `start`.
    pub fn set_poll_interval(&mut self, period: Duration) {
        if period.is_zero() || period == self.config.poll_interval {
            return;
        }
        self.config.poll_interval = period;
        if let Some(run) = &self.run {
            let _ = run.command_tx.send(SupervisorCommand::SetPollInterval(period));
        }
    }
}

impl std::fmt::Debug for ConnectionSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSupervisor")
            .field("domain", &self.domain)
            .field("state", &self.state())
            .field("connection_type", &self.connection_type())
            .field("poll_interval", &self.config.poll_interval)
            .finish()
    }
}

impl Drop for ConnectionSupervisor {
    fn drop(&mut self) {
        self.stop();
    }
}

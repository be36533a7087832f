//! Synchronization options and configuration
//!
//! This module contains the configuration for the sync layer, including a
//! builder pattern for easy configuration and per-domain transport settings.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::catalog::{Catalog, default_catalog};
use super::identifiers::Domain;
use crate::error::{Result, SyncError};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Default gateway base URL
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000";

/// Shared sidebar event stream
pub const SIDEBAR_STREAM_PATH: &str = "/api/sidebar/stream";

/// Bound on a single poll request (10 seconds)
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Bound on opening the push stream (5 seconds)
pub const DEFAULT_STREAM_OPEN_TIMEOUT: Duration = Duration::from_secs(5);

/// Delay between last unsubscribe and supervisor teardown (1 second)
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(1);

/// First reconnect delay; doubles up to the poll interval (1 second)
pub const DEFAULT_RECONNECT_BASE: Duration = Duration::from_secs(1);

/// Maximum size of a single SSE event (1MB)
pub const DEFAULT_MAX_EVENT_SIZE: usize = 1024 * 1024;

// ============================================================================
// Domain configuration
// ============================================================================

/// Transport kind, in preference order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// Server-sent event stream
    Sse,
    /// Interval polling
    Poll,
}

/// Per-domain transport configuration
#[derive(Debug, Clone, PartialEq)]
pub struct DomainConfig {
    /// Transports in preference order
    pub transports: Vec<TransportKind>,
    /// Path of the push stream, relative to the base URL
    pub stream_path: Option<String>,
    /// SSE event names that carry this domain's payload
    pub stream_events: Vec<String>,
    /// Path of the poll endpoint, relative to the base URL
    pub poll_path: String,
    /// Poll interval (also the reconnect backoff cap)
    pub poll_interval: Duration,
}

impl DomainConfig {
    /// A domain served only by polling
    pub fn poll_only(path: impl Into<String>, interval: Duration) -> Self {
        Self {
            transports: vec![TransportKind::Poll],
            stream_path: None,
            stream_events: Vec::new(),
            poll_path: path.into(),
            poll_interval: interval,
        }
    }

    /// Prefer a push stream, keeping polling as fallback
    #[must_use]
    pub fn with_stream<I, S>(mut self, path: impl Into<String>, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.transports = vec![TransportKind::Sse, TransportKind::Poll];
        self.stream_path = Some(path.into());
        self.stream_events = events.into_iter().map(Into::into).collect();
        self
    }

    /// Override the poll interval
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Built-in configuration for a domain
    #[must_use]
    pub fn defaults_for(domain: Domain) -> Self {
        match domain {
            Domain::AgentSessions => Self::poll_only("/api/agents", Duration::from_secs(5))
                .with_stream(SIDEBAR_STREAM_PATH, ["initial", "sessions"]),
            Domain::Tasks => Self::poll_only("/api/agents", Duration::from_secs(5))
                .with_stream(SIDEBAR_STREAM_PATH, ["initial", "sessions"]),
            Domain::Crons => Self::poll_only("/api/crons", Duration::from_secs(5))
                .with_stream(SIDEBAR_STREAM_PATH, ["initial", "crons"]),
            Domain::Skills => Self::poll_only("/tools/list", Duration::from_secs(30))
                .with_stream(SIDEBAR_STREAM_PATH, ["initial", "skills"]),
            Domain::SystemStatus => Self::poll_only("/api/status", Duration::from_secs(30)),
            Domain::Memories => {
                Self::poll_only("/api/memory/recent?limit=10", Duration::from_secs(60))
            }
        }
    }

    /// Whether the supervisor should try the push stream first
    #[must_use]
    pub fn prefers_stream(&self) -> bool {
        self.transports.first() == Some(&TransportKind::Sse) && self.stream_path.is_some()
    }

    /// Whether an SSE event name carries this domain's payload
    #[must_use]
    pub fn accepts_event(&self, event: &str) -> bool {
        self.stream_events.is_empty() || self.stream_events.iter().any(|e| e == event)
    }

    /// Validate the configuration
    ///
    /// # Errors
    /// Returns `InvalidConfig` describing the first problem found
    pub fn validate(&self, domain: Domain) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(SyncError::invalid_config(format!(
                "[{domain}] poll interval must be non-zero"
            )));
        }
        if self.poll_path.trim().is_empty() {
            return Err(SyncError::invalid_config(format!(
                "[{domain}] poll path is empty"
            )));
        }
        if !self.transports.contains(&TransportKind::Poll) {
            return Err(SyncError::invalid_config(format!(
                "[{domain}] polling must remain available as a fallback"
            )));
        }
        if self.transports.contains(&TransportKind::Sse) && self.stream_path.is_none() {
            return Err(SyncError::invalid_config(format!(
                "[{domain}] stream transport requested without a stream path"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Sync options
// ============================================================================

/// Main options for the sync layer
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Gateway base URL
    pub base_url: String,
    /// Bound on a single poll request
    pub request_timeout: Duration,
    /// Bound on opening the push stream
    pub stream_open_timeout: Duration,
    /// Delay between last unsubscribe and teardown
    pub grace_period: Duration,
    /// First reconnect delay
    pub reconnect_base: Duration,
    /// Maximum SSE event size in bytes
    pub max_event_size: usize,
    /// Per-domain configuration
    pub domains: HashMap<Domain, DomainConfig>,
    /// Agent catalog
    pub catalog: Arc<Catalog>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            stream_open_timeout: DEFAULT_STREAM_OPEN_TIMEOUT,
            grace_period: DEFAULT_GRACE_PERIOD,
            reconnect_base: DEFAULT_RECONNECT_BASE,
            max_event_size: DEFAULT_MAX_EVENT_SIZE,
            domains: Domain::ALL
                .iter()
                .map(|d| (*d, DomainConfig::defaults_for(*d)))
                .collect(),
            catalog: default_catalog(),
        }
    }
}

impl SyncOptions {
    /// Create a new builder for `SyncOptions`
    #[must_use]
    pub fn builder() -> SyncOptionsBuilder {
        SyncOptionsBuilder::default()
    }

    /// Options from the environment, falling back to defaults
    ///
    /// Reads `LIVE_STATUS_GATEWAY_URL`, `LIVE_STATUS_REQUEST_TIMEOUT_MS` and
    /// `LIVE_STATUS_POLL_MS` (poll interval for agent sessions, tasks and
    /// crons).
    ///
    /// # Errors
    /// Returns `InvalidConfig` if a numeric variable does not parse
    pub fn from_env() -> Result<Self> {
        let mut builder = Self::builder();

        if let Ok(url) = std::env::var("LIVE_STATUS_GATEWAY_URL") {
            builder = builder.base_url(url);
        }
        if let Some(ms) = env_millis("LIVE_STATUS_REQUEST_TIMEOUT_MS")? {
            builder = builder.request_timeout(ms);
        }
        if let Some(interval) = env_millis("LIVE_STATUS_POLL_MS")? {
            builder = builder
                .poll_interval(Domain::AgentSessions, interval)
                .poll_interval(Domain::Tasks, interval)
                .poll_interval(Domain::Crons, interval);
        }

        Ok(builder.build())
    }

    /// Configuration for a domain
    ///
    /// # Errors
    /// Returns `InvalidConfig` if the domain has no configuration
    pub fn domain_config(&self, domain: Domain) -> Result<&DomainConfig> {
        self.domains.get(&domain).ok_or_else(|| {
            SyncError::invalid_config(format!("no configuration for domain '{domain}'"))
        })
    }

    /// Join a path onto the base URL
    #[must_use]
    pub fn resolve(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn env_millis(key: &str) -> Result<Option<Duration>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(|ms| Some(Duration::from_millis(ms)))
            .map_err(|e| SyncError::invalid_config(format!("{key}={raw}: {e}"))),
        Err(_) => Ok(None),
    }
}

// ============================================================================
// Builder for SyncOptions
// ============================================================================

/// Builder for `SyncOptions`
#[derive(Debug, Default)]
pub struct SyncOptionsBuilder {
    options: SyncOptions,
}

impl SyncOptionsBuilder {
    /// Set gateway base URL
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.options.base_url = url.into();
        self
    }

    /// Set poll request timeout
    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.options.request_timeout = timeout;
        self
    }

    /// Set stream open timeout
    #[must_use]
    pub const fn stream_open_timeout(mut self, timeout: Duration) -> Self {
        self.options.stream_open_timeout = timeout;
        self
    }

    /// Set teardown grace period
    #[must_use]
    pub const fn grace_period(mut self, grace: Duration) -> Self {
        self.options.grace_period = grace;
        self
    }

    /// Set first reconnect delay
    #[must_use]
    pub const fn reconnect_base(mut self, base: Duration) -> Self {
        self.options.reconnect_base = base;
        self
    }

    /// Set maximum SSE event size
    #[must_use]
    pub const fn max_event_size(mut self, bytes: usize) -> Self {
        self.options.max_event_size = bytes;
        self
    }

    /// Replace a domain's configuration
    #[must_use]
    pub fn domain(mut self, domain: Domain, config: DomainConfig) -> Self {
        self.options.domains.insert(domain, config);
        self
    }

    /// Remove a domain's configuration
    #[must_use]
    pub fn without_domain(mut self, domain: Domain) -> Self {
        self.options.domains.remove(&domain);
        self
    }

    /// Override a domain's poll interval
    #[must_use]
    pub fn poll_interval(mut self, domain: Domain, interval: Duration) -> Self {
        self.options
            .domains
            .entry(domain)
            .or_insert_with(|| DomainConfig::defaults_for(domain))
            .poll_interval = interval;
        self
    }

    /// Set agent catalog
    #[must_use]
    pub fn catalog(mut self, catalog: Arc<Catalog>) -> Self {
        self.options.catalog = catalog;
        self
    }

    /// Build the options
    #[must_use]
    pub fn build(self) -> SyncOptions {
        self.options
    }
}

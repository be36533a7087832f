//! Subscription broker
//!
//! The single entry point consumers use. Each domain gets one supervisor,
//! shared by every subscriber of that domain:
//! - the first subscriber starts it
//! - later subscribers get the cached snapshot at once
//! - the fastest requested poll interval wins
//! - the supervisor stops once the last subscriber has been gone for the
//!   grace period, so quick remounts do not restart it

mod hub;
mod subscription;

pub use hub::UpdateCallback;
pub use subscription::{SubscribeOptions, Subscription};

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::cache::CacheStore;
use crate::error::{Result, SyncError};
use crate::supervisor::{ConnectionSupervisor, SnapshotSink, SupervisorState};
use crate::transport::GatewayTransport;
use crate::types::catalog::Catalog;
use crate::types::identifiers::Domain;
use crate::types::options::SyncOptions;
use crate::types::snapshot::Snapshot;
use hub::{DomainHub, Subscriber};

/// Process-wide broker
static GLOBAL: OnceLock<SyncBroker> = OnceLock::new();

/// Broker state for one domain with at least one subscriber (or a pending stop)
struct DomainEntry {
    hub: Arc<DomainHub>,
    supervisor: ConnectionSupervisor,
    refcount: usize,
    /// Requested poll intervals by subscription id
    intervals: HashMap<u64, Duration>,
    default_interval: Duration,
    /// Bumped whenever the refcount drops to zero; a pending stop only fires
    /// if the generation it captured is still current
    generation: u64,
    pending_stop: Option<JoinHandle<()>>,
}

impl DomainEntry {
    /// Fastest requested interval, or the domain default
    fn effective_interval(&self) -> Duration {
        self.intervals
            .values()
            .copied()
            .min()
            .unwrap_or(self.default_interval)
    }

    fn apply_interval(&mut self) {
        let interval = self.effective_interval();
        self.supervisor.set_poll_interval(interval);
    }
}

pub(crate) struct BrokerInner {
    options: SyncOptions,
    transport: Arc<dyn GatewayTransport>,
    cache: Arc<CacheStore>,
    domains: Mutex<HashMap<Domain, DomainEntry>>,
    next_subscription_id: AtomicU64,
}

/// Multiplexes consumer subscriptions onto per-domain supervisors
///
/// Cloning is cheap; clones share all state.
#[derive(Clone)]
pub struct SyncBroker {
    inner: Arc<BrokerInner>,
}

impl SyncBroker {
    /// Create a broker
    #[must_use]
    pub fn new(options: SyncOptions, transport: Arc<dyn GatewayTransport>) -> Self {
        Self::with_cache(options, transport, Arc::new(CacheStore::new()))
    }

    /// Create a broker over an existing cache
    #[must_use]
    pub fn with_cache(
        options: SyncOptions,
        transport: Arc<dyn GatewayTransport>,
        cache: Arc<CacheStore>,
    ) -> Self {
        Self {
            inner: Arc::new(BrokerInner {
                options,
                transport,
                cache,
                domains: Mutex::new(HashMap::new()),
                next_subscription_id: AtomicU64::new(1),
            }),
        }
    }

    /// Install the process-wide broker
    ///
    /// # Errors
    /// Returns `InvalidConfig` if a global broker already exists
    pub fn install_global(broker: SyncBroker) -> Result<&'static SyncBroker> {
        GLOBAL
            .set(broker)
            .map_err(|_| SyncError::invalid_config("a global broker is already installed"))?;
        GLOBAL
            .get()
            .ok_or_else(|| SyncError::invalid_config("global broker vanished after install"))
    }

    /// The process-wide broker, created on first use
    ///
    /// Configured from the environment and talks HTTP. Falls back to the
    /// default configuration if the environment is invalid.
    #[cfg(feature = "http")]
    pub fn global() -> Result<&'static SyncBroker> {
        if let Some(broker) = GLOBAL.get() {
            return Ok(broker);
        }

        let options = SyncOptions::from_env().unwrap_or_else(|e| {
            log::warn!("ignoring live status environment: {}", e);
            SyncOptions::default()
        });
        let transport = crate::transport::HttpTransport::new()?;
        Ok(GLOBAL.get_or_init(|| SyncBroker::new(options, Arc::new(transport))))
    }

    /// The process-wide broker, if one has been installed
    #[must_use]
    pub fn try_global() -> Option<&'static SyncBroker> {
        GLOBAL.get()
    }

    /// Configuration this broker was built with
    #[must_use]
    pub fn options(&self) -> &SyncOptions {
        &self.inner.options
    }

    /// Agent catalog
    #[must_use]
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.inner.options.catalog
    }

    /// Shared cache
    #[must_use]
    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.inner.cache
    }

    /// Cached snapshot for a domain
    #[must_use]
    pub fn snapshot(&self, domain: Domain) -> Option<Arc<Snapshot>> {
        self.inner.cache.get(domain)
    }

    /// Subscribe with the domain's default options
    ///
    /// The callback runs synchronously with the cached snapshot (if any),
    /// then with every later snapshot in sequence order. It may subscribe or
    /// unsubscribe from inside, but must not block.
    ///
    /// # Errors
    /// Returns `InvalidConfig` if the domain is not configured or no tokio
    /// runtime is available
    pub fn subscribe<F>(&self, domain: Domain, on_update: F) -> Result<Subscription>
    where
        F: Fn(&Arc<Snapshot>) + Send + Sync + 'static,
    {
        self.subscribe_with(domain, SubscribeOptions::default(), on_update)
    }

    /// Subscribe with explicit options
    ///
    /// # Errors
    /// Returns `InvalidConfig` if the domain is not configured, the requested
    /// interval is zero, or no tokio runtime is available
    pub fn subscribe_with<F>(
        &self,
        domain: Domain,
        options: SubscribeOptions,
        on_update: F,
    ) -> Result<Subscription>
    where
        F: Fn(&Arc<Snapshot>) + Send + Sync + 'static,
    {
        if options.poll_interval.is_some_and(|d| d.is_zero()) {
            return Err(SyncError::invalid_config(format!(
                "poll interval for {domain} must be positive"
            )));
        }
        let callback: UpdateCallback = Arc::new(on_update);
        self.inner.subscribe(domain, options, callback)
    }

    /// Fetch a domain once, out of band
    ///
    /// A no-op if nobody is subscribed to the domain.
    pub fn refresh(&self, domain: Domain) {
        if let Some(entry) = self.inner.domains.lock().get(&domain) {
            entry.supervisor.refresh();
        }
    }

    /// Number of live subscriptions for a domain
    #[must_use]
    pub fn subscriber_count(&self, domain: Domain) -> usize {
        self.inner
            .domains
            .lock()
            .get(&domain)
            .map_or(0, |entry| entry.refcount)
    }

    /// Whether a supervisor is running for a domain
    #[must_use]
    pub fn is_running(&self, domain: Domain) -> bool {
        self.inner
            .domains
            .lock()
            .get(&domain)
            .is_some_and(|entry| entry.supervisor.is_running())
    }

    /// Supervisor state for a domain, if a supervisor exists
    #[must_use]
    pub fn supervisor_state(&self, domain: Domain) -> Option<SupervisorState> {
        self.inner
            .domains
            .lock()
            .get(&domain)
            .map(|entry| entry.supervisor.state())
    }

    /// Poll interval currently in effect for a domain
    #[must_use]
    pub fn effective_poll_interval(&self, domain: Domain) -> Option<Duration> {
        self.inner
            .domains
            .lock()
            .get(&domain)
            .map(DomainEntry::effective_interval)
    }

    /// Stop every supervisor immediately
    ///
    /// Existing subscriptions stay valid but receive nothing further.
    pub fn shutdown(&self) {
        let entries: Vec<(Domain, DomainEntry)> = self.inner.domains.lock().drain().collect();
        for (domain, mut entry) in entries {
            if let Some(pending) = entry.pending_stop.take() {
                pending.abort();
            }
            entry.supervisor.stop();
            log::debug!("[{}] shut down with {} subscriber(s)", domain, entry.hub.len());
        }
    }
}

impl std::fmt::Debug for SyncBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let domains: Vec<Domain> = self.inner.domains.lock().keys().copied().collect();
        f.debug_struct("SyncBroker")
            .field("base_url", &self.inner.options.base_url)
            .field("domains", &domains)
            .finish()
    }
}

// ============================================================================
// REFERENCE COUNTING
// ============================================================================

impl BrokerInner {
    fn subscribe(
        self: &Arc<Self>,
        domain: Domain,
        options: SubscribeOptions,
        callback: UpdateCallback,
    ) -> Result<Subscription> {
        let id = self.next_subscription_id.fetch_add(1, Ordering::SeqCst);

        let hub = {
            let mut domains = self.domains.lock();
            let entry = match domains.entry(domain) {
                Entry::Occupied(occupied) => occupied.into_mut(),
                Entry::Vacant(vacant) => {
                    let hub = Arc::new(DomainHub::new(domain, Arc::clone(&self.cache)));
                    let sink: Arc<dyn SnapshotSink> = hub.clone();
                    let supervisor = ConnectionSupervisor::new(
                        domain,
                        &self.options,
                        Arc::clone(&self.transport),
                        sink,
                    )?;
                    let default_interval = supervisor.poll_interval();
                    vacant.insert(DomainEntry {
                        hub,
                        supervisor,
                        refcount: 0,
                        intervals: HashMap::new(),
                        default_interval,
                        generation: 0,
                        pending_stop: None,
                    })
                }
            };

            if let Some(pending) = entry.pending_stop.take() {
                pending.abort();
                log::debug!("[{}] resubscribed within grace period", domain);
            }
            if let Some(interval) = options.poll_interval {
                entry.intervals.insert(id, interval);
            }
            entry.apply_interval();
            if let Err(e) = entry.supervisor.start() {
                entry.intervals.remove(&id);
                if entry.refcount == 0 {
                    domains.remove(&domain);
                }
                return Err(e);
            }
            entry.refcount += 1;

            Arc::clone(&entry.hub)
        };

        // Outside the domain lock so the initial delivery may call back in
        hub.add(Arc::new(Subscriber::new(id, callback)));

        Ok(Subscription::new(id, domain, Arc::downgrade(self)))
    }

    pub(super) fn release(self: &Arc<Self>, domain: Domain, id: u64) {
        let mut domains = self.domains.lock();
        let Some(entry) = domains.get_mut(&domain) else {
            return;
        };
        if !entry.hub.remove(id) {
            return;
        }

        entry.refcount = entry.refcount.saturating_sub(1);
        entry.intervals.remove(&id);
        if entry.refcount > 0 {
            entry.apply_interval();
            return;
        }

        entry.generation += 1;
        let generation = entry.generation;
        let grace = self.options.grace_period;

        let runtime = tokio::runtime::Handle::try_current();
        match runtime {
            Ok(runtime) if !grace.is_zero() => {
                log::debug!("[{}] last subscriber left, stopping in {:?}", domain, grace);
                let broker = Arc::downgrade(self);
                entry.pending_stop = Some(runtime.spawn(async move {
                    tokio::time::sleep(grace).await;
                    if let Some(broker) = broker.upgrade() {
                        broker.finish_stop(domain, generation);
                    }
                }));
            }
            _ => {
                if let Some(mut entry) = domains.remove(&domain) {
                    entry.supervisor.stop();
                }
            }
        }
    }

    /// Tear down a domain whose grace period ran out
    fn finish_stop(&self, domain: Domain, generation: u64) {
        let mut domains = self.domains.lock();
        let still_idle = domains
            .get(&domain)
            .is_some_and(|entry| entry.refcount == 0 && entry.generation == generation);
        if !still_idle {
            return;
        }
        if let Some(mut entry) = domains.remove(&domain) {
            // This task is the pending stop; detach rather than abort it
            drop(entry.pending_stop.take());
            entry.supervisor.stop();
        }
    }
}

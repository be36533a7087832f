//! Transport for running without a gateway
//!
//! Every operation fails immediately, so each domain settles on a cached,
//! empty snapshot. Presentation code can treat that as its cue to show demo
//! content; nothing demo-specific lives in the sync layer.

use std::time::Duration;

use futures::future::BoxFuture;

use crate::error::{Result, SyncError};

use super::{EventStream, GatewayTransport};

/// Transport that never connects
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTransport;

impl GatewayTransport for NoopTransport {
    fn open_stream<'a>(
        &'a self,
        url: &'a str,
        _max_event_size: usize,
    ) -> BoxFuture<'a, Result<EventStream>> {
        Box::pin(async move { Err(SyncError::connection(format!("no gateway for {url}"))) })
    }

    fn fetch<'a>(&'a self, url: &'a str, _timeout: Duration) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move { Err(SyncError::connection(format!("no gateway for {url}"))) })
    }
}

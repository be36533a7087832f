//! Transport layer for communicating with the gateway
//!
//! This module provides the transport abstraction and its implementations:
//! an HTTP transport (push stream + request/response polling) and a no-op
//! transport used when no gateway is present.

#[cfg(feature = "http")]
pub mod http;
pub mod noop;
pub mod sse;

use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::Result;

pub use sse::{SseDecoder, SseEvent};

/// Transport trait for talking to the gateway
///
/// Implementations only move bytes; decoding, ordering and fallback live in
/// the supervisor.
pub trait GatewayTransport: Send + Sync {
    /// Open a push stream
    ///
    /// Resolves once the stream is established. Events are delivered through
    /// the returned [`EventStream`]; a stream error or close arrives as an
    /// `Err` item or as the end of the stream.
    ///
    /// # Errors
    /// Returns error if the stream cannot be opened
    fn open_stream<'a>(
        &'a self,
        url: &'a str,
        max_event_size: usize,
    ) -> BoxFuture<'a, Result<EventStream>>;

    /// Perform one request/response fetch and return the body
    ///
    /// # Errors
    /// Returns error on connection failure, timeout or non-2xx status
    fn fetch<'a>(&'a self, url: &'a str, timeout: Duration) -> BoxFuture<'a, Result<String>>;
}

/// An open push stream
///
/// Wraps the receiving end of a background reader task. Dropping the stream
/// aborts the reader, closing the underlying connection.
pub struct EventStream {
    rx: mpsc::UnboundedReceiver<Result<SseEvent>>,
    reader_task: Option<JoinHandle<()>>,
}

impl EventStream {
    /// A stream fed by an external sender, with no reader task
    #[must_use]
    pub fn from_receiver(rx: mpsc::UnboundedReceiver<Result<SseEvent>>) -> Self {
        Self {
            rx,
            reader_task: None,
        }
    }

    /// A stream fed by a background reader task
    #[must_use]
    pub fn with_task(rx: mpsc::UnboundedReceiver<Result<SseEvent>>, task: JoinHandle<()>) -> Self {
        Self {
            rx,
            reader_task: Some(task),
        }
    }

    /// Next event; `None` once the stream has ended
    pub async fn next_event(&mut self) -> Option<Result<SseEvent>> {
        self.rx.recv().await
    }

    /// Close the stream and stop the reader
    pub fn close(&mut self) {
        self.rx.close();
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for EventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream")
            .field("reader_task", &self.reader_task.as_ref().map(|_| "<task>"))
            .finish()
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(feature = "http")]
pub use http::HttpTransport;
pub use noop::NoopTransport;

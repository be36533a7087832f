//! HTTP transport using reqwest
//!
//! The push stream is a long-lived `GET` with `Accept: text/event-stream`,
//! read by a background task. Polls are plain `GET`s with a per-request
//! timeout. The client itself carries no global timeout, since that would cap
//! the lifetime of the stream.

use std::time::Duration;

use futures::StreamExt;
use futures::future::BoxFuture;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use tokio::sync::mpsc;

use crate::error::{Result, SyncError};

use super::sse::{SseDecoder, SseEvent};
use super::{EventStream, GatewayTransport};

/// Gateway transport over HTTP
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with a default client
    ///
    /// # Errors
    /// Returns error if the TLS backend cannot be initialized
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("kodegen-live-status/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SyncError::invalid_config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Use an existing client
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl GatewayTransport for HttpTransport {
    fn open_stream<'a>(
        &'a self,
        url: &'a str,
        max_event_size: usize,
    ) -> BoxFuture<'a, Result<EventStream>> {
        Box::pin(async move {
            let response = self
                .client
                .get(url)
                .header(ACCEPT, "text/event-stream")
                .header(CACHE_CONTROL, "no-cache")
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(SyncError::http(status.as_u16(), url));
            }

            let (tx, rx) = mpsc::unbounded_channel();
            let task = tokio::spawn(read_event_stream(response, tx, max_event_size));
            Ok(EventStream::with_task(rx, task))
        })
    }

    fn fetch<'a>(&'a self, url: &'a str, timeout: Duration) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let response = self
                .client
                .get(url)
                .header(ACCEPT, "application/json")
                .timeout(timeout)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(SyncError::http(status.as_u16(), url));
            }

            Ok(response.text().await?)
        })
    }
}

/// Pump the response body through the SSE decoder until it ends
async fn read_event_stream(
    response: reqwest::Response,
    tx: mpsc::UnboundedSender<Result<SseEvent>>,
    max_event_size: usize,
) {
    let mut decoder = SseDecoder::new(max_event_size);
    let mut body = response.bytes_stream();

    while let Some(chunk) = body.next().await {
        match chunk {
            Ok(bytes) => match decoder.feed(&bytes) {
                Ok(events) => {
                    for event in events {
                        if tx.send(Ok(event)).is_err() {
                            // Receiver dropped, stop reading
                            return;
                        }
                    }
                }
                Err(e) => {
                    // Oversized event was discarded; keep the stream alive
                    if tx.send(Err(e)).is_err() {
                        return;
                    }
                }
            },
            Err(e) => {
                let _ = tx.send(Err(SyncError::stream(e.to_string())));
                return;
            }
        }
    }

    let _ = tx.send(Err(SyncError::stream("event stream closed by gateway")));
}

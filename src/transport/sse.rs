//! Server-sent event framing
//!
//! Incremental decoder for `text/event-stream` bodies. Input arrives in
//! arbitrary chunks (which may split lines or UTF-8 sequences); complete
//! events are returned as soon as their terminating blank line is seen.

use crate::error::{Result, SyncError};

/// Event name used when the server does not send an `event:` field
pub const DEFAULT_EVENT: &str = "message";

/// One dispatched server-sent event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Event name
    pub event: String,
    /// Data lines joined with `\n`
    pub data: String,
    /// Last event id, if the server sent one
    pub id: Option<String>,
}

impl SseEvent {
    /// Build an event
    pub fn new(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: data.into(),
            id: None,
        }
    }
}

/// Incremental SSE decoder
#[derive(Debug)]
pub struct SseDecoder {
    pending: Vec<u8>,
    event: Option<String>,
    data: String,
    has_data: bool,
    last_id: Option<String>,
    max_event_size: usize,
}

impl SseDecoder {
    /// Create a decoder that rejects events larger than `max_event_size` bytes
    #[must_use]
    pub fn new(max_event_size: usize) -> Self {
        Self {
            pending: Vec::new(),
            event: None,
            data: String::new(),
            has_data: false,
            last_id: None,
            max_event_size,
        }
    }

    /// Feed a chunk of the body
    ///
    /// # Errors
    /// Returns `BufferOverflow` if the event being assembled grows past the
    /// limit. The partial event is discarded and decoding can continue.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<SseEvent>> {
        self.pending.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw[..raw.len() - 1]);
            let line = line.strip_suffix('\r').unwrap_or(&line);
            if let Some(event) = self.process_line(line) {
                events.push(event);
            }
        }

        if self.pending.len() + self.data.len() > self.max_event_size {
            self.reset();
            return Err(SyncError::BufferOverflow(self.max_event_size));
        }

        Ok(events)
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => {
                if self.has_data {
                    self.data.push('\n');
                }
                self.data.push_str(value);
                self.has_data = true;
            }
            "id" if !value.contains('\0') => self.last_id = Some(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        if !self.has_data {
            return None;
        }
        self.has_data = false;
        Some(SseEvent {
            event: event
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| DEFAULT_EVENT.to_string()),
            data: std::mem::take(&mut self.data),
            id: self.last_id.clone(),
        })
    }

    fn reset(&mut self) {
        self.pending.clear();
        self.event = None;
        self.data.clear();
        self.has_data = false;
    }
}

//! Error types for the live status synchronization layer

use thiserror::Error;

/// Main error type for the live status layer
#[derive(Error, Debug)]
pub enum SyncError {
    /// Connection to the gateway could not be established
    #[error("Connection error: {0}")]
    Connection(String),

    /// Gateway answered with a non-success HTTP status
    #[error("HTTP {status} from {url}")]
    Http {
        /// Response status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// Transport layer error (request failed mid-flight, stream broke)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Push stream closed or reported an error
    #[error("Stream error: {0}")]
    Stream(String),

    /// Timeout error
    #[error("Timeout: {0}")]
    Timeout(String),

    /// JSON decode error when parsing a gateway payload
    #[error("JSON decode error: {0}")]
    JsonDecode(#[from] serde_json::Error),

    /// Payload was valid JSON but did not have the expected shape
    #[error("Payload error: {message}")]
    Payload {
        /// Error message
        message: String,
        /// Raw payload that failed to decode
        data: Option<serde_json::Value>,
    },

    /// A single SSE event exceeded the configured buffer size
    #[error("SSE event exceeded maximum buffer size of {0} bytes")]
    BufferOverflow(usize),

    /// Domain name is not known to this crate
    #[error("Unknown domain: {0}")]
    UnknownDomain(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for live status operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Coarse classification used to pick a recovery strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network-level failure; recovered by falling back to cached data
    Transport,
    /// Malformed payload; the message is discarded and treated like a transport failure
    Decode,
    /// Build-time mistake; reported synchronously to the caller
    Programmer,
}

impl SyncError {
    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create an HTTP status error
    pub fn http(status: u16, url: impl Into<String>) -> Self {
        Self::Http {
            status,
            url: url.into(),
        }
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a stream error
    pub fn stream(msg: impl Into<String>) -> Self {
        Self::Stream(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create a payload shape error
    pub fn payload(msg: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self::Payload {
            message: msg.into(),
            data,
        }
    }

    /// Create an unknown domain error
    pub fn unknown_domain(name: impl Into<String>) -> Self {
        Self::UnknownDomain(name.into())
    }

    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Classify this error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection(_)
            | Self::Http { .. }
            | Self::Transport(_)
            | Self::Stream(_)
            | Self::Timeout(_) => ErrorKind::Transport,
            Self::JsonDecode(_) | Self::Payload { .. } | Self::BufferOverflow(_) => {
                ErrorKind::Decode
            }
            Self::UnknownDomain(_) | Self::InvalidConfig(_) => ErrorKind::Programmer,
        }
    }

    /// Whether this error is recovered locally (never surfaced to consumers)
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Programmer)
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Connection(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Http {
                status: status.as_u16(),
                url: err.url().map(ToString::to_string).unwrap_or_default(),
            }
        } else {
            Self::Transport(err.to_string())
        }
    }
}

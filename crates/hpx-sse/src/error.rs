//! Error taxonomy for SSE sessions.
//!
//! Every variant is surfaced to the application as a
//! [`SessionEvent::Error`](crate::SessionEvent::Error); the session itself never
//! returns these from its event loop.

use bytes_utils::Str;
use thiserror::Error;

/// Boxed error type carried by transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result alias used by fallible constructors in this crate.
pub type SseResult<T> = Result<T, SseError>;

/// Errors reported by an SSE session.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SseError {
    /// The underlying connection failed (DNS, TLS, reset, ...).
    #[error("transport error: {source}")]
    Transport {
        #[source]
        source: BoxError,
    },

    /// The transport reported a failure without attaching a cause.
    #[error("connection failed without a specific cause")]
    UndefinedConnection,

    /// The server answered with a status outside 2xx.
    #[error("connection error: status={status}, body={body}")]
    ConnectionError {
        status: http::StatusCode,
        body: Str,
    },

    /// The session's event sequence already has (or had) a consumer.
    #[error("event stream already consumed")]
    AlreadyConsumed,

    /// No transport notification arrived within the configured interval.
    #[error("no data received for {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Invalid configuration or request template.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl SseError {
    /// Create a transport error from any error cause.
    pub fn transport(source: impl Into<BoxError>) -> Self {
        Self::Transport {
            source: source.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(duration: std::time::Duration) -> Self {
        Self::Timeout { duration }
    }

    /// Create a protocol error from a non-2xx status and its response body.
    pub fn connection_error(status: http::StatusCode, body: impl Into<Str>) -> Self {
        Self::ConnectionError {
            status,
            body: body.into(),
        }
    }

    /// Whether a reconnect may recover from this error.
    ///
    /// Protocol errors and consumer misuse are final; network-level failures
    /// are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::UndefinedConnection | Self::Timeout { .. }
        )
    }

    /// HTTP status carried by a [`ConnectionError`](Self::ConnectionError).
    pub fn status(&self) -> Option<http::StatusCode> {
        match self {
            Self::ConnectionError { status, .. } => Some(*status),
            _ => None,
        }
    }
}

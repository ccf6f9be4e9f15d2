//! Core type definitions for SSE sessions.

use std::fmt;

use crate::{error::SseError, parse::Event};

/// Readiness of a session.
///
/// Moves `None → Connecting → Open`, may fall back to `Connecting` while
/// reconnecting, and ends in `Closed`, which is terminal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReadyState {
    /// Created but never started.
    #[default]
    None,
    /// A request is in flight, or a reconnect is pending.
    Connecting,
    /// A 2xx response was accepted; events are flowing.
    Open,
    /// Terminated; no further events and no reconnects.
    Closed,
}

impl ReadyState {
    /// Returns `true` if events are flowing.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Returns `true` if the session is in its terminal state.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Open => write!(f, "Open"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

/// What a session reports to its consumer.
#[derive(Debug)]
pub enum SessionEvent {
    /// The session transitioned to [`ReadyState::Open`].
    Open,
    /// A parsed event.
    Message(Event),
    /// A failure. May be followed by a reconnect or by [`Closed`](Self::Closed).
    Error(SseError),
    /// The session terminated.
    Closed,
}

impl SessionEvent {
    /// The parsed event, if this is a message.
    pub fn as_message(&self) -> Option<&Event> {
        match self {
            Self::Message(event) => Some(event),
            _ => None,
        }
    }

    /// Consume into the parsed event, if this is a message.
    pub fn into_message(self) -> Option<Event> {
        match self {
            Self::Message(event) => Some(event),
            _ => None,
        }
    }

    /// The error, if this is an error notification.
    pub fn as_error(&self) -> Option<&SseError> {
        match self {
            Self::Error(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes_utils::Str;

    use super::*;

    #[test]
    fn test_ready_state_predicates() {
        assert_eq!(ReadyState::default(), ReadyState::None);
        assert!(ReadyState::Open.is_open());
        assert!(!ReadyState::Connecting.is_open());
        assert!(ReadyState::Closed.is_closed());
        assert!(!ReadyState::None.is_closed());
    }

    #[test]
    fn test_ready_state_display() {
        assert_eq!(ReadyState::None.to_string(), "None");
        assert_eq!(ReadyState::Connecting.to_string(), "Connecting");
        assert_eq!(ReadyState::Open.to_string(), "Open");
        assert_eq!(ReadyState::Closed.to_string(), "Closed");
    }

    #[test]
    fn test_session_event_accessors() {
        let event = Event {
            data: Some(Str::from("hello")),
            ..Default::default()
        };
        let message = SessionEvent::Message(event.clone());
        assert_eq!(message.as_message(), Some(&event));
        assert!(message.as_error().is_none());
        assert_eq!(message.into_message(), Some(event));

        let error = SessionEvent::Error(SseError::UndefinedConnection);
        assert!(matches!(error.as_error(), Some(SseError::UndefinedConnection)));
        assert!(error.into_message().is_none());
        assert!(SessionEvent::Open.as_message().is_none());
    }
}

//! Extension points of a session.
//!
//! [`EventParser`] is the byte-to-event capability a session drives;
//! [`SseProtocolHandler`] hooks into the connection lifecycle, decides on
//! reconnects, and supplies a fresh parser for every transport binding.

use crate::{
    error::SseError,
    parse::{Event, ParseMode, ServerEventParser},
};

/// Incremental conversion from response body chunks to events.
///
/// Implementations own any buffering state. A session creates one parser per
/// transport binding and never shares it.
pub trait EventParser: Send + 'static {
    /// Consume one body chunk and return the events it completed.
    fn parse(&mut self, chunk: &[u8]) -> Vec<Event>;

    /// Called once when the body ends; returns any events still pending.
    fn finish(&mut self) -> Vec<Event> {
        Vec::new()
    }
}

/// Lifecycle hooks and policy for an SSE session.
pub trait SseProtocolHandler: Send + Sync + 'static {
    /// Build the parser used for a new transport binding.
    ///
    /// Default implementation returns the standard [`ServerEventParser`].
    fn new_parser(&self, mode: ParseMode) -> Box<dyn EventParser> {
        Box::new(ServerEventParser::new(mode))
    }

    /// Called every time the session transitions to open.
    ///
    /// Default implementation does nothing.
    fn on_open(&self) {}

    /// Called when a transport binding ends, for whatever reason.
    ///
    /// Default implementation does nothing.
    fn on_disconnect(&self) {}

    /// Determine whether the session may reconnect after the given error.
    ///
    /// Only consulted while reconnect attempts remain. Default implementation
    /// defers to [`SseError::is_retryable`].
    fn should_retry(&self, error: &SseError) -> bool {
        error.is_retryable()
    }
}

//! Generic SSE protocol handler implementation.

use tracing::debug;

use crate::protocol::SseProtocolHandler;

/// Handler for plain SSE streams.
///
/// Uses the standard parser and retries only on network-level failures.
#[derive(Clone, Debug, Default)]
pub struct GenericSseHandler;

impl GenericSseHandler {
    /// Create a new generic SSE handler.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl SseProtocolHandler for GenericSseHandler {
    fn on_open(&self) {
        debug!("SSE session open");
    }

    fn on_disconnect(&self) {
        debug!("SSE transport binding ended");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{error::SseError, parse::ParseMode, protocol::EventParser};

    #[test]
    fn test_default_should_retry() {
        let handler = GenericSseHandler::new();
        assert!(handler.should_retry(&SseError::transport("reset")));
        assert!(handler.should_retry(&SseError::UndefinedConnection));
        assert!(handler.should_retry(&SseError::timeout(Duration::from_secs(1))));
        assert!(!handler.should_retry(&SseError::AlreadyConsumed));
    }

    #[test]
    fn test_default_parser_follows_mode() {
        let handler = GenericSseHandler::new();

        let mut parser = handler.new_parser(ParseMode::DataOnly);
        let events = parser.parse(b"id: 7\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data(), Some("id: 7"));
        assert_eq!(events[0].id, None);

        let mut parser = handler.new_parser(ParseMode::Default);
        let events = parser.parse(b"id: 7\n\n");
        assert_eq!(events[0].id(), Some("7"));
    }
}

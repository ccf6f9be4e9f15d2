//! # hpx-sse
//!
//! Client-side Server-Sent Events: an incremental `text/event-stream` parser
//! and a reconnecting session state machine on top of it.
//!
//! ## Features
//!
//! - **Chunking-invariant parsing**: frames split across reads, every
//!   `\n`/`\r\n`/`\r` convention, multi-line `data`, comments
//! - **Session state machine**: `None → Connecting → Open → Closed` with
//!   `Last-Event-ID` resumption and exponential backoff
//! - **Pluggable transport**: sessions speak to a [`Transport`] trait; a
//!   `reqwest` implementation ships behind the `http` feature
//! - **Observability**: structured `tracing` logs for every state change
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use futures_util::StreamExt;
//! use hpx_sse::{HttpTransport, SessionEvent, SseConfig, SseSession};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SseConfig::new("https://stream.example.com/events").reconnect_max_attempts(5);
//!     let session = SseSession::new(config, HttpTransport::new())?;
//!
//!     let mut events = session.events();
//!     while let Some(event) = events.next().await {
//!         if let SessionEvent::Message(message) = event {
//!             println!("{:?}: {:?}", message.event_type(), message.data());
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod parse;
pub mod protocol;
mod reconnect;
pub mod session;
pub mod transport;
pub mod types;

#[cfg(feature = "http")]
pub mod http;

// Re-export commonly used types
pub use config::SseConfig;
pub use error::{BoxError, SseError, SseResult};
pub use handlers::GenericSseHandler;
#[cfg(feature = "http")]
pub use crate::http::HttpTransport;
pub use parse::{Event, EventStream, FrameSplitter, ParseMode, ServerEventParser, parse_frame};
pub use protocol::{EventParser, SseProtocolHandler};
pub use session::{SessionEvents, SseSession};
pub use transport::{
    Disposition, PendingDecision, ResponseDecision, ResponseHead, SseRequest, Transport,
    TransportBinding, TransportEvent, TransportSink,
};
pub use types::{ReadyState, SessionEvent};

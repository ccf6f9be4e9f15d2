//! Incremental SSE parsing.
//!
//! Bytes flow through a [`FrameSplitter`], which cuts them into frames at
//! blank lines, and then through [`parse_frame`], which applies the field
//! grammar of the
//! [HTML Living Standard](https://html.spec.whatwg.org/multipage/server-sent-events.html).
//! [`ServerEventParser`] bundles the two; [`EventStream`] drives it from any
//! byte stream.

pub(crate) mod constants;
pub(crate) mod errors;
pub mod event;
pub mod event_parser;
pub mod event_stream;
pub(crate) mod parser;
pub mod splitter;

pub use errors::EventStreamError;
pub use event::Event;
pub use event_parser::ServerEventParser;
pub use event_stream::EventStream;
pub(crate) use parser::decode_lossy;
pub use parser::{ParseMode, parse_frame};
pub use splitter::FrameSplitter;

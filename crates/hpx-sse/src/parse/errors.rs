//! Error type of [`EventStream`](super::event_stream::EventStream).

use core::fmt::{Display, Formatter};

/// Errors produced by [`EventStream`](super::event_stream::EventStream).
///
/// Parsing itself never fails (undecodable bytes are replaced), so the only
/// failure is the underlying stream's.
#[derive(Debug, PartialEq)]
pub enum EventStreamError<E> {
    /// Something went wrong with the underlying stream.
    Transport(E),
}

impl<E> Display for EventStreamError<E>
where
    E: Display,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Transport(e) => e.fmt(f),
        }
    }
}

impl<E> core::error::Error for EventStreamError<E> where E: core::error::Error {}

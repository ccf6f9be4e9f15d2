//! [`Stream`] that converts a stream of
//! [`Bytes`](bytes::Bytes) chunks into [`Event`]s.
//!
//! This is the session-less way to use the parser: no reconnects, no
//! lifecycle events, just parsed events from a body you already hold.

use core::{
    pin::Pin,
    task::{Context, Poll, ready},
};
use std::collections::VecDeque;

use bytes_utils::Str;
use futures_core::Stream;

use super::{
    errors::EventStreamError,
    event::Event,
    event_parser::ServerEventParser,
    parser::ParseMode,
};
use crate::protocol::EventParser;

pin_project_lite::pin_project! {
    /// A [`Stream`] that converts a stream of byte chunks into parsed SSE
    /// [`Event`]s.
    #[project = EventStreamProjection]
    #[derive(Debug)]
    pub struct EventStream<S> {
        #[pin]
        stream: S,
        parser: ServerEventParser,
        pending: VecDeque<Event>,
        terminated: bool,
        last_event_id: Option<Str>,
    }
}

impl<S> EventStream<S> {
    /// Create a new [`EventStream`] from an underlying byte stream.
    pub fn new(stream: S) -> Self {
        Self::with_mode(stream, ParseMode::Default)
    }

    /// Create a new [`EventStream`] that parses frames with `mode`.
    pub fn with_mode(stream: S, mode: ParseMode) -> Self {
        Self {
            stream,
            parser: ServerEventParser::new(mode),
            pending: VecDeque::new(),
            terminated: false,
            last_event_id: None,
        }
    }

    /// The `id` of the most recent event that carried one.
    pub fn last_event_id(&self) -> Option<&str> {
        self.last_event_id.as_deref()
    }
}

impl<S, E, B> Stream for EventStream<S>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    type Item = Result<Event, EventStreamError<E>>;

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<<Self as Stream>::Item>> {
        let mut this = self.project();

        loop {
            if let Some(event) = this.pending.pop_front() {
                if let Some(id) = &event.id {
                    *this.last_event_id = Some(id.clone());
                }
                return Poll::Ready(Some(Ok(event)));
            }

            if *this.terminated {
                return Poll::Ready(None);
            }

            match ready!(this.stream.as_mut().poll_next(cx)) {
                Some(Ok(chunk)) => this.pending.extend(this.parser.parse(chunk.as_ref())),
                Some(Err(e)) => return Poll::Ready(Some(Err(EventStreamError::Transport(e)))),
                None => {
                    *this.terminated = true;
                    this.pending.extend(this.parser.finish());
                }
            }
        }
    }
}

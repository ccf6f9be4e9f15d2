//! The default [`EventParser`]: frame splitting followed by field parsing.

use super::{
    event::Event,
    parser::{ParseMode, parse_frame},
    splitter::FrameSplitter,
};
use crate::protocol::EventParser;

/// Standard SSE parser combining a [`FrameSplitter`] with [`parse_frame`].
#[derive(Debug, Default)]
pub struct ServerEventParser {
    splitter: FrameSplitter,
    mode: ParseMode,
}

impl ServerEventParser {
    /// Create a parser for the given mode.
    pub fn new(mode: ParseMode) -> Self {
        Self {
            splitter: FrameSplitter::new(),
            mode,
        }
    }

    /// The mode this parser interprets frames with.
    pub fn mode(&self) -> ParseMode {
        self.mode
    }
}

impl EventParser for ServerEventParser {
    fn parse(&mut self, chunk: &[u8]) -> Vec<Event> {
        self.splitter
            .feed(chunk)
            .into_iter()
            .filter_map(|frame| parse_frame(frame, self.mode))
            .collect()
    }

    fn finish(&mut self) -> Vec<Event> {
        self.splitter
            .finish()
            .into_iter()
            .filter_map(|frame| parse_frame(frame, self.mode))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(parser: &mut ServerEventParser, chunks: &[&[u8]]) -> Vec<Event> {
        let mut events = Vec::new();
        for chunk in chunks {
            events.extend(parser.parse(chunk));
        }
        events.extend(parser.finish());
        events
    }

    #[test]
    fn test_two_events_in_one_chunk() {
        let mut parser = ServerEventParser::new(ParseMode::Default);
        let events = run(&mut parser, &[
            b"data: test 1\n\ndata: test 2\ndata: continued\n\n",
        ]);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data(), Some("test 1"));
        assert_eq!(events[1].data(), Some("test 2\ncontinued"));
    }

    #[test]
    fn test_field_split_across_chunks() {
        let mut parser = ServerEventParser::new(ParseMode::Default);
        let events = run(&mut parser, &[b"event: add\n", b"\ndata: test 1\n\n"]);
        // The first chunk completes a frame carrying only `event`.
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type(), Some("add"));
        assert_eq!(events[0].data, None);
        assert_eq!(events[1].data(), Some("test 1"));
    }

    #[test]
    fn test_event_fields_across_chunks() {
        let mut parser = ServerEventParser::new(ParseMode::Default);
        let events = run(&mut parser, &[b"event: add\n", b"data: test 1\n\n"]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), Some("add"));
        assert_eq!(events[0].data(), Some("test 1"));
    }

    #[test]
    fn test_field_and_terminator_across_chunks() {
        let mut parser = ServerEventParser::new(ParseMode::Default);
        let events = run(&mut parser, &[b"event: add\ndata: te", b"st 1\n", b"\n"]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), Some("add"));
        assert_eq!(events[0].data(), Some("test 1"));
    }

    #[test]
    fn test_cr_only_event_is_parsed_without_more_input() {
        let mut parser = ServerEventParser::new(ParseMode::Default);
        let events = parser.parse(b"data: a\r\r");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data(), Some("a"));

        let events = parser.parse(b"\ndata: b\r\r");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data(), Some("b"));
        assert!(parser.finish().is_empty());
    }

    #[test]
    fn test_comment_frames_produce_nothing() {
        let mut parser = ServerEventParser::new(ParseMode::Default);
        let events = run(&mut parser, &[b": keep-alive\n\n:\n\n", b": another\r\n\r\n"]);
        assert!(events.is_empty());
    }

    #[test]
    fn test_chunking_invariance() {
        let input: &[u8] = b"id: 1\nevent: add\ndata: 73857293\n\n: c\n\n\
              event: remove\r\ndata: 2153\r\n\r\ndata: YHOO\rdata: +2\rdata: 10\r\r";
        let whole = run(&mut ServerEventParser::new(ParseMode::Default), &[input]);
        assert_eq!(whole.len(), 3);
        assert_eq!(whole[2].data(), Some("YHOO\n+2\n10"));

        for split in 0..=input.len() {
            let (a, b) = input.split_at(split);
            let mut parser = ServerEventParser::new(ParseMode::Default);
            assert_eq!(run(&mut parser, &[a, b]), whole, "split at {split}");
        }
    }

    #[test]
    fn test_data_only_mode() {
        let mut parser = ServerEventParser::new(ParseMode::DataOnly);
        assert_eq!(parser.mode(), ParseMode::DataOnly);
        let events = run(&mut parser, &[b"data: {\"a\":1}\n\n{\"b\":2}\n\n"]);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data(), Some("data: {\"a\":1}"));
        assert_eq!(events[1].data(), Some("{\"b\":2}"));
    }
}

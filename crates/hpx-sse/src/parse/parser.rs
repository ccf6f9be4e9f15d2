//! Field parser: turns one complete frame into an [`Event`].

use std::collections::BTreeMap;

use bytes::Bytes;
use bytes_utils::{Str, StrMut};

use super::{
    constants::{COLON, CR, LF},
    event::Event,
};

/// How the bytes of a frame are interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParseMode {
    /// Standard `field: value` grammar.
    #[default]
    Default,
    /// The whole frame is one opaque `data` payload. For providers that send
    /// raw payloads between delimiters instead of SSE fields.
    DataOnly,
}

/// A single line of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RawEventLine<'a> {
    /// Blank line or a lone `:`.
    Skip,
    /// `name: value`, both trimmed.
    Field { name: &'a [u8], value: &'a [u8] },
    /// Non-empty line with no separator, kept verbatim.
    Bare(&'a [u8]),
}

#[derive(Debug, Clone, Copy)]
enum FieldName {
    Id,
    Event,
    Data,
    Time,
    Ignored,
}

impl FieldName {
    fn from_bytes(name: &[u8]) -> Self {
        match name {
            b"id" => Self::Id,
            b"event" => Self::Event,
            b"data" => Self::Data,
            b"time" => Self::Time,
            _ => Self::Ignored,
        }
    }
}

/// Trim spaces and tabs on both ends.
fn trim(bytes: &[u8]) -> &[u8] {
    let is_blank = |b: &u8| *b == b' ' || *b == b'\t';
    let start = bytes.iter().position(|b| !is_blank(b)).unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|b| !is_blank(b)).map_or(start, |i| i + 1);
    &bytes[start..end]
}

fn read_line(line: &[u8]) -> RawEventLine<'_> {
    match memchr::memchr(COLON, line) {
        Some(0) if line.len() == 1 => RawEventLine::Skip,
        Some(colon_pos) => RawEventLine::Field {
            name: trim(&line[..colon_pos]),
            value: trim(&line[colon_pos + 1..]),
        },
        None if line.is_empty() => RawEventLine::Skip,
        None => RawEventLine::Bare(line),
    }
}

/// Finds the next end-of-line in `bytes`.
///
/// Returns `(line_end, remainder_start)`. The frame is complete, so a CR at
/// the very end is a line ending on its own.
fn find_eol(bytes: &[u8]) -> Option<(usize, usize)> {
    let pos = memchr::memchr2(CR, LF, bytes)?;
    if bytes[pos] == CR && bytes.get(pos + 1) == Some(&LF) {
        Some((pos, pos + 2))
    } else {
        Some((pos, pos + 1))
    }
}

/// Iterator over the lines of a frame, split at `\n`, `\r\n` or `\r`.
struct Lines<'a> {
    rest: Option<&'a [u8]>,
}

impl<'a> Iterator for Lines<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.rest?;
        match find_eol(rest) {
            Some((line_end, rem_start)) => {
                self.rest = Some(&rest[rem_start..]);
                Some(&rest[..line_end])
            }
            None => {
                self.rest = None;
                Some(rest)
            }
        }
    }
}

fn lines(frame: &[u8]) -> Lines<'_> {
    Lines { rest: Some(frame) }
}

/// Decode bytes as UTF-8, replacing invalid sequences.
///
/// Valid input is shared with `bytes` without copying.
pub(crate) fn decode_lossy(bytes: Bytes) -> Str {
    match Str::from_inner(bytes) {
        Ok(s) => s,
        Err(e) => Str::from(String::from_utf8_lossy(&e.into_inner()).into_owned()),
    }
}

/// Data buffer that avoids copying in the common single-`data:` case.
#[derive(Debug, Default)]
enum DataBuffer {
    #[default]
    Uninit,
    Immutable(Str),
    Mutable(StrMut),
}

impl DataBuffer {
    fn push_str(&mut self, s: Str) {
        match self {
            Self::Uninit => *self = Self::Immutable(s),
            Self::Immutable(first) => {
                let mut buf = StrMut::new();
                buf.push_str(first);
                buf.push('\n');
                buf.push_str(&s);
                *self = Self::Mutable(buf);
            }
            Self::Mutable(buf) => {
                buf.push('\n');
                buf.push_str(&s);
            }
        }
    }

    fn freeze(self) -> Option<Str> {
        match self {
            Self::Uninit => None,
            Self::Immutable(s) => Some(s),
            Self::Mutable(s) => Some(s.freeze()),
        }
    }
}

#[derive(Debug, Default)]
struct EventBuilder {
    id: Option<Str>,
    event: Option<Str>,
    data: DataBuffer,
    other: BTreeMap<Str, Str>,
    time: Option<Str>,
}

impl EventBuilder {
    fn add(&mut self, frame: &Bytes, line: RawEventLine<'_>) {
        match line {
            RawEventLine::Skip => {}
            RawEventLine::Bare(line) => {
                self.other
                    .insert(decode_lossy(frame.slice_ref(line)), Str::default());
            }
            RawEventLine::Field { name, value } => {
                let decode = || decode_lossy(frame.slice_ref(value));
                match FieldName::from_bytes(name) {
                    FieldName::Id => {
                        // An id containing NUL is ignored, like browsers do.
                        if memchr::memchr(0, value).is_none() {
                            self.id = Some(decode());
                        }
                    }
                    FieldName::Event => self.event = Some(decode()),
                    FieldName::Data => self.data.push_str(decode()),
                    FieldName::Time => self.time = Some(decode()),
                    FieldName::Ignored => {}
                }
            }
        }
    }

    fn build(self) -> Option<Event> {
        let event = Event {
            id: self.id,
            event: self.event,
            data: self.data.freeze(),
            other: (!self.other.is_empty()).then_some(self.other),
            time: self.time,
        };
        (!event.is_empty()).then_some(event)
    }
}

/// Parse one frame (terminator already stripped) into an [`Event`].
///
/// Returns `None` when the frame carries no field at all, e.g. a frame made
/// only of comments.
pub fn parse_frame(frame: Bytes, mode: ParseMode) -> Option<Event> {
    if frame.is_empty() {
        return None;
    }

    match mode {
        ParseMode::DataOnly => Some(Event {
            data: Some(decode_lossy(frame)),
            ..Default::default()
        }),
        ParseMode::Default => {
            let mut builder = EventBuilder::default();
            for line in lines(&frame) {
                builder.add(&frame, read_line(line));
            }
            builder.build()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(frame: &'static [u8]) -> Option<Event> {
        parse_frame(Bytes::from_static(frame), ParseMode::Default)
    }

    #[test]
    fn test_single_data_line() {
        let event = parse(b"data: test 1").expect("event");
        assert_eq!(event.data(), Some("test 1"));
        assert_eq!(event.id, None);
        assert_eq!(event.event, None);
        assert_eq!(event.other, None);
    }

    #[test]
    fn test_multi_line_data_joined_in_order() {
        let event = parse(b"data: test 2\ndata: continued\ndata: third").expect("event");
        assert_eq!(event.data(), Some("test 2\ncontinued\nthird"));
    }

    #[test]
    fn test_all_recognised_fields() {
        let event = parse(b"id: 7\nevent: add\ndata: 73857293\ntime: 2024-01-01T00:00:00Z")
            .expect("event");
        assert_eq!(event.id(), Some("7"));
        assert_eq!(event.event_type(), Some("add"));
        assert_eq!(event.data(), Some("73857293"));
        assert_eq!(event.time(), Some("2024-01-01T00:00:00Z"));
    }

    #[test]
    fn test_values_and_keys_are_trimmed() {
        let event = parse(b"  event \t:\t update  \ndata:no-space").expect("event");
        assert_eq!(event.event_type(), Some("update"));
        assert_eq!(event.data(), Some("no-space"));
    }

    #[test]
    fn test_comment_only_frame_is_suppressed() {
        assert_eq!(parse(b":"), None);
        assert_eq!(parse(b": keep-alive"), None);
        assert_eq!(parse(b":\n: heartbeat\n\n"), None);
    }

    #[test]
    fn test_empty_values_are_suppressed() {
        assert_eq!(parse(b"data:"), None);
        assert_eq!(parse(b"id:\nevent:"), None);
        assert_eq!(parse(b""), None);
    }

    #[test]
    fn test_two_empty_data_lines_produce_newline() {
        let event = parse(b"data:\ndata:").expect("event");
        assert_eq!(event.data(), Some("\n"));
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let event = parse(b"retry: 3000\nfoo: bar\ndata: x").expect("event");
        assert_eq!(event.data(), Some("x"));
        assert_eq!(event.other, None);
        assert_eq!(parse(b"retry: 3000"), None);
    }

    #[test]
    fn test_bare_line_recorded_in_other() {
        let event = parse(b"done\ndata: [DONE]").expect("event");
        let other = event.other.as_ref().expect("other");
        assert_eq!(other.len(), 1);
        assert_eq!(other.get("done").map(|v| &**v), Some(""));
        assert_eq!(event.data(), Some("[DONE]"));

        let bare_only = parse(b"PING").expect("event");
        assert!(bare_only.has_other("PING"));
        assert_eq!(bare_only.data, None);
    }

    #[test]
    fn test_bare_line_key_is_the_full_line() {
        let event = parse(b"  keep alive \t\ndata: x").expect("event");
        assert!(event.has_other("  keep alive \t"));
        assert!(!event.has_other("keep alive"));
        assert_eq!(event.data(), Some("x"));
    }

    #[test]
    fn test_separator_with_blank_name_is_ignored() {
        assert_eq!(parse(b" : value"), None);
        assert_eq!(parse(b"\t:"), None);
    }

    #[test]
    fn test_crlf_and_cr_line_endings() {
        let event = parse(b"event: add\r\ndata: a\rdata: b\r").expect("event");
        assert_eq!(event.event_type(), Some("add"));
        assert_eq!(event.data(), Some("a\nb"));
    }

    #[test]
    fn test_id_with_nul_is_ignored() {
        let event = parse(b"id: a\0b\ndata: x").expect("event");
        assert_eq!(event.id, None);
        assert_eq!(event.data(), Some("x"));
    }

    #[test]
    fn test_last_id_and_event_win() {
        let event = parse(b"id: 1\nid: 2\nevent: a\nevent: b\ndata: x").expect("event");
        assert_eq!(event.id(), Some("2"));
        assert_eq!(event.event_type(), Some("b"));
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let event = parse(b"data: caf\xE9").expect("event");
        assert_eq!(event.data(), Some("caf\u{FFFD}"));
    }

    #[test]
    fn test_data_only_keeps_frame_verbatim() {
        let event =
            parse_frame(Bytes::from_static(b"data: {\"a\":1}"), ParseMode::DataOnly).expect("event");
        assert_eq!(event.data(), Some("data: {\"a\":1}"));
        assert_eq!(event.id, None);
        assert_eq!(event.event, None);

        let multi = parse_frame(Bytes::from_static(b"{\"a\":\n1}"), ParseMode::DataOnly)
            .expect("event");
        assert_eq!(multi.data(), Some("{\"a\":\n1}"));
    }

    #[test]
    fn test_data_only_empty_frame_is_suppressed() {
        assert_eq!(parse_frame(Bytes::new(), ParseMode::DataOnly), None);
    }

    #[test]
    fn test_trim_helper() {
        assert_eq!(trim(b"  a b\t"), b"a b");
        assert_eq!(trim(b" \t "), b"");
        assert_eq!(trim(b""), b"");
    }
}

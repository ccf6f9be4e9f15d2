//! Frame splitter: accumulates inbound bytes and cuts complete frames out of
//! them, keeping the unterminated tail for the next chunk.

use bytes::{Buf, Bytes, BytesMut};
use tracing::debug;

use super::constants::{BOM, CR, LF, MAX_TERMINATOR_LEN, TERMINATORS};

/// Length of the longest terminator starting at `pos`, if any.
fn terminator_at(buf: &[u8], pos: usize) -> Option<usize> {
    let rest = &buf[pos..];
    TERMINATORS
        .iter()
        .find(|term| rest.starts_with(term))
        .map(|term| term.len())
}

/// End offset of the last terminator in `buf` ending after `from`.
///
/// Scans backwards from the end of the buffer, so in the common case of one
/// terminator per read only the freshly appended bytes are inspected.
fn last_terminator_end(buf: &[u8], from: usize) -> Option<usize> {
    let mut end = buf.len();
    while end > from {
        let pos = from + memchr::memrchr2(CR, LF, &buf[from..end])?;
        let head = &buf[..=pos];
        if TERMINATORS.iter().any(|term| head.ends_with(term)) {
            return Some(pos + 1);
        }
        end = pos;
    }
    None
}

const fn starts_with_bom(buf: &[u8]) -> Option<bool> {
    match buf.len() {
        0 => None,
        1 => {
            if buf[0] == BOM[0] {
                None
            } else {
                Some(false)
            }
        }
        2 => {
            if buf[0] == BOM[0] && buf[1] == BOM[1] {
                None
            } else {
                Some(false)
            }
        }
        _gte_3 => {
            if buf[0] == BOM[0] && buf[1] == BOM[1] && buf[2] == BOM[2] {
                Some(true)
            } else {
                Some(false)
            }
        }
    }
}

/// Incremental demultiplexer from a byte stream to frames.
///
/// A frame is the byte span between two terminators (a blank line in any of
/// the accepted line-ending conventions). Frames are returned without their
/// terminators; empty frames are dropped.
#[derive(Debug, Default)]
pub struct FrameSplitter {
    buffer: BytesMut,
    /// No terminator ends at or before this offset of `buffer`.
    scanned: usize,
    bom_checked: bool,
    /// The last committed terminator ended the buffer with a CR; an LF
    /// arriving next belongs to that terminator.
    swallow_lf: bool,
}

impl FrameSplitter {
    /// Create an empty splitter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `bytes` and return every frame completed by them, in stream
    /// order.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Bytes> {
        if bytes.is_empty() {
            return Vec::new();
        }
        self.buffer.extend_from_slice(bytes);

        if std::mem::take(&mut self.swallow_lf) && self.buffer.first() == Some(&LF) {
            self.buffer.advance(1);
        }
        if !self.strip_bom() {
            return Vec::new();
        }
        self.split()
    }

    /// Signal end of stream.
    ///
    /// Returns any complete frame still buffered and discards the
    /// unterminated remainder: an incomplete frame is never dispatched.
    pub fn finish(&mut self) -> Vec<Bytes> {
        let frames = if self.bom_checked {
            self.split()
        } else {
            Vec::new()
        };

        if !self.buffer.is_empty() {
            debug!(
                len = self.buffer.len(),
                "Discarding unterminated bytes at end of stream"
            );
        }
        self.reset();
        frames
    }

    /// Drop all buffered state, as if freshly created.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.scanned = 0;
        self.bom_checked = false;
        self.swallow_lf = false;
    }

    /// Number of bytes waiting for a terminator.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether no bytes are buffered.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Strip a leading BOM. Returns `false` while the first bytes could still
    /// turn out to be one.
    fn strip_bom(&mut self) -> bool {
        if self.bom_checked {
            return true;
        }
        match starts_with_bom(&self.buffer) {
            Some(true) => {
                self.buffer.advance(BOM.len());
                self.bom_checked = true;
                true
            }
            Some(false) => {
                self.bom_checked = true;
                true
            }
            None => false,
        }
    }

    fn split(&mut self) -> Vec<Bytes> {
        let from = self.scanned.saturating_sub(MAX_TERMINATOR_LEN - 1);
        let Some(region_end) = last_terminator_end(&self.buffer, from) else {
            self.scanned = self.buffer.len();
            return Vec::new();
        };

        // Forward pass over the complete region: longest terminator wins at
        // each position.
        let buf = &self.buffer[..];
        let mut cuts = Vec::new();
        let mut frame_start = 0;
        let mut pos = 0;
        while pos < region_end {
            let Some(offset) = memchr::memchr2(CR, LF, &buf[pos..region_end]) else {
                break;
            };
            let at = pos + offset;
            match terminator_at(buf, at) {
                Some(len) => {
                    let end = at + len;
                    // `\r\r` and `\r\n\r` at the very end grow by one LF at most.
                    self.swallow_lf = end == buf.len() && buf[end - 1] == CR;
                    cuts.push((frame_start, at));
                    frame_start = end;
                    pos = end;
                }
                None => pos = at + 1,
            }
        }

        let complete = self.buffer.split_to(frame_start).freeze();
        self.scanned = 0;

        cuts.into_iter()
            .filter(|(start, end)| end > start)
            .map(|(start, end)| complete.slice(start..end))
            .collect()
    }
}

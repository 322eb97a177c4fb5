//! Newline-delimited record codec for the upstream stream feed.
//!
//! Differs from `tokio_util::codec::LinesCodec` in two ways that matter for a
//! live feed: invalid UTF-8 is decoded lossily instead of failing the
//! connection, and an oversized line is skipped (with a console notice)
//! instead of ending the stream.

use std::cmp;
use std::io;

use hud_core::Event;
use tokio_util::bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;

use crate::record::classify_line;

/// Default upper bound for a single upstream line (1 MB).
pub const DEFAULT_MAX_LINE_LENGTH: usize = 1_048_576;

/// Decodes upstream bytes into classified events, one per non-blank line.
#[derive(Debug, Clone)]
pub struct RecordCodec {
    max_length: usize,
    /// Index up to which `buf` is known to contain no newline
    next_index: usize,
    /// Bytes dropped so far from an oversized line, while skipping it
    discarding: Option<usize>,
}

impl RecordCodec {
    /// Creates a codec with the default line limit.
    pub fn new() -> Self {
        Self::with_max_length(DEFAULT_MAX_LINE_LENGTH)
    }

    /// Creates a codec that skips lines longer than `max_length` bytes.
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            max_length: max_length.max(1),
            next_index: 0,
            discarding: None,
        }
    }

    /// Returns the line limit in bytes.
    pub fn max_length(&self) -> usize {
        self.max_length
    }
}

impl Default for RecordCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn classify_bytes(line: &[u8]) -> Option<Event> {
    classify_line(&String::from_utf8_lossy(line))
}

fn oversized_notice(dropped: usize) -> Event {
    Event::console(format!("[relay] dropped oversized upstream line ({dropped} bytes)"))
}

impl Decoder for RecordCodec {
    type Item = Event;
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Event>, io::Error> {
        loop {
            let read_to = cmp::min(self.max_length.saturating_add(1), buf.len());
            let newline = buf
                .get(self.next_index..read_to)
                .and_then(|window| window.iter().position(|b| *b == b'\n'));

            match (self.discarding, newline) {
                (Some(dropped), Some(offset)) => {
                    let end = self.next_index + offset + 1;
                    buf.advance(end);
                    self.next_index = 0;
                    self.discarding = None;
                    return Ok(Some(oversized_notice(dropped + end)));
                }
                (Some(dropped), None) => {
                    buf.advance(read_to);
                    self.next_index = 0;
                    self.discarding = Some(dropped + read_to);
                    if buf.is_empty() {
                        return Ok(None);
                    }
                }
                (None, Some(offset)) => {
                    let end = self.next_index + offset;
                    self.next_index = 0;
                    let line = buf.split_to(end + 1);
                    if let Some(event) = line.get(..end).and_then(classify_bytes) {
                        return Ok(Some(event));
                    }
                    // blank line, keep scanning
                }
                (None, None) if buf.len() > self.max_length => {
                    self.next_index = 0;
                    self.discarding = Some(0);
                }
                (None, None) => {
                    self.next_index = read_to;
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Event>, io::Error> {
        if let Some(event) = self.decode(buf)? {
            return Ok(Some(event));
        }

        self.next_index = 0;
        if let Some(dropped) = self.discarding.take() {
            let dropped = dropped + buf.len();
            buf.clear();
            return Ok(Some(oversized_notice(dropped)));
        }

        if buf.is_empty() {
            return Ok(None);
        }

        // Trailing record without a final newline
        let line = buf.split();
        Ok(classify_bytes(&line))
    }
}

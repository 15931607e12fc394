//! Chunk-to-line decoding and the typed event stream adapter.
//!
//! Transport chunks may split lines (and UTF-8 sequences) anywhere. Bytes are
//! buffered until a newline so the frame parser only ever sees whole lines,
//! which makes the decoded event sequence independent of chunking.

use bytes::Bytes;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use std::collections::VecDeque;
use tracing::warn;

use super::event::StageRunEvent;
use super::parser::EventStreamParser;
use crate::errors::StagerunError;

/// Splits a byte stream into lines.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    /// Creates an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a chunk and returns every line it completed.
    ///
    /// Line terminators (`\n`, and a preceding `\r`) are stripped.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(decode_line(line));
        }
        lines
    }

    /// Returns the trailing unterminated line, if any.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let mut line = std::mem::take(&mut self.buffer);
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(decode_line(line))
    }
}

fn decode_line(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(line) => line,
        Err(e) => {
            warn!(error = %e, "Stream line is not valid UTF-8; decoding lossily");
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    }
}

/// Line decoder and frame parser combined: bytes in, events out.
#[derive(Debug, Default)]
pub struct EventStreamDecoder {
    lines: LineDecoder,
    parser: EventStreamParser,
}

impl EventStreamDecoder {
    /// Creates an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a transport chunk and returns the events it completed.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<StageRunEvent> {
        self.lines
            .push(chunk)
            .iter()
            .filter_map(|line| self.parser.push_line(line))
            .collect()
    }

    /// Flushes the trailing line at end of input.
    ///
    /// A frame is only emitted once a blank line closes it, so an
    /// unterminated final frame yields nothing.
    pub fn finish(&mut self) -> Vec<StageRunEvent> {
        let trailing = self.lines.finish();
        let events = trailing
            .and_then(|line| self.parser.push_line(&line))
            .into_iter()
            .collect();
        self.parser.reset();
        events
    }

    /// Frames dropped so far because their payload did not decode.
    #[must_use]
    pub fn dropped_frames(&self) -> u64 {
        self.parser.dropped_frames()
    }
}

struct DecodeState {
    inner: BoxStream<'static, Result<Bytes, StagerunError>>,
    decoder: EventStreamDecoder,
    ready: VecDeque<StageRunEvent>,
    done: bool,
}

/// Adapts a stream of transport chunks into a stream of typed events.
///
/// Transport errors are passed through; the stream ends when the transport
/// does.
pub fn decode_event_stream<S>(chunks: S) -> BoxStream<'static, Result<StageRunEvent, StagerunError>>
where
    S: Stream<Item = Result<Bytes, StagerunError>> + Send + 'static,
{
    let state = DecodeState {
        inner: chunks.boxed(),
        decoder: EventStreamDecoder::new(),
        ready: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.ready.pop_front() {
                return Some((Ok(event), state));
            }
            if state.done {
                return None;
            }
            match state.inner.next().await {
                Some(Ok(chunk)) => {
                    let events = state.decoder.push_chunk(&chunk);
                    state.ready.extend(events);
                }
                Some(Err(e)) => {
                    state.done = true;
                    return Some((Err(e), state));
                }
                None => {
                    state.done = true;
                    let events = state.decoder.finish();
                    state.ready.extend(events);
                }
            }
        }
    })
    .boxed()
}

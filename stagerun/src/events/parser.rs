//! Server-sent event frame parser.
//!
//! Lines accumulate an event type (`event:`) and a payload (`data:`) until a
//! blank line closes the frame. A closed frame with both parts yields one
//! typed event; unknown event types and undecodable payloads are dropped
//! without stopping the stream.

use tracing::{debug, warn};

use super::event::{EventKind, StageRunEvent};

/// Incremental line-oriented frame parser.
#[derive(Debug, Default)]
pub struct EventStreamParser {
    event_type: Option<String>,
    data: Option<String>,
    dropped_frames: u64,
}

impl EventStreamParser {
    /// Creates an empty parser.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one line (without its terminator).
    ///
    /// Returns an event when the line closes a complete, decodable frame.
    pub fn push_line(&mut self, line: &str) -> Option<StageRunEvent> {
        let line = line.strip_suffix('\r').unwrap_or(line);

        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event_type = Some(value.trim().to_string()),
            "data" => match self.data {
                Some(ref mut data) => {
                    data.push('\n');
                    data.push_str(value);
                }
                None => self.data = Some(value.to_string()),
            },
            _ => {}
        }
        None
    }

    /// Feeds several lines, collecting every completed event in order.
    pub fn feed<'a, I>(&mut self, lines: I) -> Vec<StageRunEvent>
    where
        I: IntoIterator<Item = &'a str>,
    {
        lines
            .into_iter()
            .filter_map(|line| self.push_line(line))
            .collect()
    }

    /// Number of frames dropped because their payload did not decode.
    #[must_use]
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames
    }

    /// Returns true if a frame is partially buffered.
    #[must_use]
    pub fn has_pending_frame(&self) -> bool {
        self.event_type.is_some() || self.data.is_some()
    }

    /// Discards any partially buffered frame.
    pub fn reset(&mut self) {
        self.event_type = None;
        self.data = None;
    }

    fn dispatch(&mut self) -> Option<StageRunEvent> {
        let event_type = self.event_type.take();
        let data = self.data.take();

        let (Some(event_type), Some(data)) = (event_type, data) else {
            return None;
        };

        let Some(kind) = EventKind::parse(&event_type) else {
            debug!(event_type = %event_type, "Ignoring unknown stream event");
            return None;
        };

        match StageRunEvent::decode(kind, &data) {
            Ok(event) => {
                debug!(event_type = %kind, agent_id = ?event.agent_id(), "Parsed stream event");
                Some(event)
            }
            Err(e) => {
                self.dropped_frames += 1;
                warn!(
                    event_type = %kind,
                    error = %e,
                    "Dropping stream frame with malformed payload"
                );
                None
            }
        }
    }
}

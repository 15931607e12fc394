//! Stage run event stream: typed events, frame parsing and notice sinks.
//!
//! Bytes from the stream endpoint pass through [`LineDecoder`] and
//! [`EventStreamParser`] (combined in [`EventStreamDecoder`]) to become
//! [`StageRunEvent`]s for the reducer. Lifecycle notices about runs go to an
//! [`EventSink`].

mod decoder;
mod event;
mod parser;
mod sink;

pub use decoder::{decode_event_stream, EventStreamDecoder, LineDecoder};
pub use event::{EventKind, StageRunEvent};
pub use parser::EventStreamParser;
pub use sink::{names, CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, RunNotice};

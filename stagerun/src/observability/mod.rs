//! Tracing support for stage runs.

mod tracing;

pub use self::tracing::{init_tracing, LogFormat, RunSpanAttributes, SpanTimer};

//! Result export functionality
//!
//! One record per completed experiment, in completion order. Sinks format
//! the records (CSV rows or a JSON document); the emitter thread owns the
//! sink so the scheduler never blocks beyond the channel hand-off.

pub mod emitter;

pub use emitter::{CsvSink, JsonSink, ResultEmitter, ResultSink};

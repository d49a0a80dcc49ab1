//! Structured error types for quicken
//!
//! Using thiserror for automatic Display implementation and error chaining.

use thiserror::Error;

/// Fatal configuration problems, reported once at attach time before any
/// profiled thread is interfered with.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid location \"{0}\" (expected container:line)")]
    InvalidLocation(String),

    #[error("No search scope configured and no fixed experiment pinned")]
    EmptyScope,

    #[error("No progress point configured (set a location or end-to-end mode)")]
    MissingProgressPoint,

    #[error("Unknown agent option \"{0}\"")]
    UnknownOption(String),

    #[error("Invalid value for {option}: \"{value}\"")]
    InvalidValue { option: String, value: String },

    #[error("Minimum experiment time {min_ms} ms exceeds maximum {max_ms} ms")]
    InvertedDurationBounds { min_ms: u64, max_ms: u64 },

    #[error("Empty speedup step set")]
    EmptySpeedupSteps,
}

/// A thread's stack could not be captured this tick.
///
/// Always transient: the sample is skipped, never the run.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Thread not in a capturable state")]
    UnsafeState,

    #[error("Stack capture failed: {0}")]
    Failed(String),
}

/// A raw frame could not be turned into a location.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Symbol unavailable for {0:#x}")]
    SymbolUnavailable(u64),

    #[error("Resolver failure: {0}")]
    Failed(String),
}

/// Emitter I/O failures. Surfaced to the emitter thread, logged, and the
/// engine keeps running; a dropped record is acceptable, a corrupt one is not.
#[derive(Error, Debug)]
pub enum EmitError {
    #[error("Failed to serialize result record: {0}")]
    SerializationFailed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

//! External collaborator seams for the sampling path
//!
//! The engine does not know how a stack frame is captured or what a raw
//! program-counter token means; both concerns live behind these traits.
//! The profiled runtime's attachment layer provides the implementations.

use crate::domain::{CaptureError, Location, RawFrame, ResolveError};

/// Per-thread stack capture facility.
///
/// Called on the profiled thread itself at interrupt-like points, so
/// implementations must be cheap and must never block indefinitely. A
/// transient failure is reported as [`CaptureError`] and the tick is
/// retried a bounded number of times before being abandoned.
pub trait StackSource {
    /// Capture the current call stack, innermost frame first, up to
    /// `max_frames` entries.
    fn capture(&mut self, max_frames: usize) -> Result<Vec<RawFrame>, CaptureError>;
}

/// Translates a raw captured execution position into a resolved location.
///
/// Shared by all profiled threads; implementations must be `Send + Sync`
/// and cheap enough to call for every frame of every sample. A frame whose
/// symbol is unavailable is skipped, not fatal.
pub trait FrameResolver: Send + Sync {
    fn resolve(&self, frame: RawFrame) -> Result<Location, ResolveError>;
}

impl<F> FrameResolver for F
where
    F: Fn(RawFrame) -> Result<Location, ResolveError> + Send + Sync,
{
    fn resolve(&self, frame: RawFrame) -> Result<Location, ResolveError> {
        self(frame)
    }
}

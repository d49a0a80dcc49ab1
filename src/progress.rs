//! Progress points: the throughput proxy measured across experiments
//!
//! Exactly one progress point is active per run, fixed at startup. Its
//! counter only ever grows; the scheduler reads deltas at experiment
//! boundaries instead of resetting, so increments racing with a boundary
//! read are never lost.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::Location;

/// What counts as progress for this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressPointSpec {
    /// A single increment at process completion (latency-style runs).
    EndToEnd,
    /// An increment every time the designated location executes
    /// (throughput-style runs).
    Point(Location),
}

impl ProgressPointSpec {
    /// The location pinned by this progress point, if any.
    #[must_use]
    pub fn location(&self) -> Option<&Location> {
        match self {
            ProgressPointSpec::EndToEnd => None,
            ProgressPointSpec::Point(loc) => Some(loc),
        }
    }
}

/// Monotone progress counter, shared by all profiled threads.
///
/// Increments are lock-free and never lost; reads are wait-free and may be
/// concurrent with increments. The counter is never reset during a run.
#[derive(Debug)]
pub struct ProgressTracker {
    spec: ProgressPointSpec,
    counter: AtomicU64,
}

impl ProgressTracker {
    #[must_use]
    pub fn new(spec: ProgressPointSpec) -> Self {
        Self { spec, counter: AtomicU64::new(0) }
    }

    #[must_use]
    pub fn spec(&self) -> &ProgressPointSpec {
        &self.spec
    }

    /// Unconditional increment. Used for the end-to-end marker and by
    /// instrumentation that already knows it sits on the progress point.
    pub fn record(&self) {
        self.counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-mode increment: counts only if `location` is the configured
    /// progress point. Returns whether it counted.
    pub fn record_at(&self, location: &Location) -> bool {
        match &self.spec {
            ProgressPointSpec::Point(pp) if pp == location => {
                self.counter.fetch_add(1, Ordering::Relaxed);
                true
            }
            _ => false,
        }
    }

    /// Latest counter value visible to this thread. Wait-free.
    #[must_use]
    pub fn read(&self) -> u64 {
        self.counter.load(Ordering::Acquire)
    }
}

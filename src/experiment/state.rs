//! Experiment state shared with the sampling hot path, and the result record
//!
//! An [`ExperimentSpec`] is created once per experiment by the scheduler and
//! published wholesale through the delay injector's atomic slot; profiled
//! threads read it with a single atomic load and never observe a torn
//! (candidate, percentage) pair. Its interior counters are the only fields
//! touched from the hot path.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

use crate::domain::{Location, SpeedupPct};

/// One experiment's fixed parameters plus its hot-path counters.
#[derive(Debug)]
pub struct ExperimentSpec {
    /// The location under virtual speedup.
    pub candidate: Location,
    /// Speedup percentage, fixed for the window.
    pub speedup_pct: SpeedupPct,
    /// Monotone experiment number; lets per-thread delay state detect a new
    /// experiment and reset lazily, without any cross-thread signal.
    pub epoch: u64,
    /// Delay charged to the global figure per candidate-hit sample, in ns.
    /// Zero for control runs (0%).
    pub delay_per_hit_ns: u64,

    /// Total delay owed by every thread since the experiment started.
    global_delay_ns: AtomicU64,
    /// Samples observed landing on the candidate during the window.
    candidate_samples: AtomicU64,
}

impl ExperimentSpec {
    #[must_use]
    pub fn new(
        candidate: Location,
        speedup_pct: SpeedupPct,
        epoch: u64,
        sample_interval: Duration,
    ) -> Self {
        // If the candidate were pct% faster, each sampled tick spent inside
        // it would save pct% of the sampling interval; everyone else is
        // slowed by that amount instead.
        let delay_per_hit_ns =
            sample_interval.as_nanos() as u64 * u64::from(speedup_pct.get()) / 100;
        Self {
            candidate,
            speedup_pct,
            epoch,
            delay_per_hit_ns,
            global_delay_ns: AtomicU64::new(0),
            candidate_samples: AtomicU64::new(0),
        }
    }

    /// Record one candidate-hit sample; returns the updated global figure.
    pub fn charge_hit(&self) -> u64 {
        self.candidate_samples.fetch_add(1, Ordering::Relaxed);
        if self.delay_per_hit_ns == 0 {
            return self.global_delay_ns.load(Ordering::Acquire);
        }
        self.global_delay_ns.fetch_add(self.delay_per_hit_ns, Ordering::Release)
            + self.delay_per_hit_ns
    }

    /// Current global delay figure in nanoseconds.
    #[must_use]
    pub fn global_delay_ns(&self) -> u64 {
        self.global_delay_ns.load(Ordering::Acquire)
    }

    /// Samples that landed on the candidate so far.
    #[must_use]
    pub fn candidate_samples(&self) -> u64 {
        self.candidate_samples.load(Ordering::Relaxed)
    }
}

/// Immutable record of one completed experiment, emitted in completion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExperimentResult {
    /// Candidate identity.
    pub candidate: Location,
    /// Speedup percentage the window ran at.
    pub speedup_pct: SpeedupPct,
    /// Observed window length in milliseconds.
    pub duration_ms: u64,
    /// Progress-counter delta over the window. Never negative: the counter
    /// is monotone and snapshots are taken by the single scheduler thread.
    pub progress_delta: u64,
    /// Candidate samples observed; consumers use this to judge support.
    pub candidate_samples: u64,
}

//! Delay injection: turning "candidate C is P% faster" into slowdowns
//! everywhere else
//!
//! The injector holds the single shared piece of hot-path state: the
//! currently active [`ExperimentSpec`], published wholesale through an
//! `ArcSwapOption` so readers take one atomic load per sample and can never
//! observe a torn (candidate, percentage) pair.
//!
//! Accounting is the global-vs-local scheme: a sample landing on the
//! candidate adds `delay_per_hit` to the experiment's global figure and
//! credits the hitting thread (its own time inside the candidate is exactly
//! what the virtual speedup would have saved). Every other thread, at its
//! next safe point, owes the difference between the global figure and its
//! thread-local figure and sleeps it off. No lock is shared across threads;
//! the only blocking operation is that local sleep.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;

use super::state::ExperimentSpec;

/// Thread-owned delay bookkeeping. Written only by its owning thread.
///
/// `epoch` tags the figure with the experiment it belongs to, so state
/// carried across experiment boundaries resets lazily on first use instead
/// of requiring a cross-thread reset.
#[derive(Debug, Default)]
pub struct DelayState {
    epoch: u64,
    local_delay_ns: u64,
}

impl DelayState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulated delay credited/served within the current experiment.
    #[must_use]
    pub fn local_delay_ns(&self) -> u64 {
        self.local_delay_ns
    }

    /// Per-sample accounting for the owning thread. Returns the delay the
    /// thread must now serve at its safe point (zero when exempt, when the
    /// thread is already caught up, or during a 0% control run).
    #[must_use]
    pub fn process_sample(&mut self, spec: &ExperimentSpec, candidate_hit: bool) -> Duration {
        if self.epoch != spec.epoch {
            self.epoch = spec.epoch;
            self.local_delay_ns = 0;
        }

        if candidate_hit {
            // Exempt for this tick only: charge the global figure and credit
            // ourselves for exactly our own hit. Delay owed from earlier
            // off-candidate ticks stays owed until the next miss.
            spec.charge_hit();
            self.local_delay_ns += spec.delay_per_hit_ns;
            return Duration::ZERO;
        }

        let global = spec.global_delay_ns();
        let owed = global.saturating_sub(self.local_delay_ns);
        self.local_delay_ns = global;
        Duration::from_nanos(owed)
    }
}

/// Process-wide injector: one atomic experiment slot shared by all threads.
#[derive(Debug, Default)]
pub struct DelayInjector {
    active: ArcSwapOption<ExperimentSpec>,
}

impl DelayInjector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a new experiment. Called only by the scheduler thread.
    pub fn install(&self, spec: Arc<ExperimentSpec>) {
        self.active.store(Some(spec));
    }

    /// Disable injection. Called by the scheduler when draining and on
    /// shutdown, always before any result snapshot is taken.
    pub fn clear(&self) {
        self.active.store(None);
    }

    /// Snapshot of the active experiment, if any. One atomic load.
    #[must_use]
    pub fn current(&self) -> Option<Arc<ExperimentSpec>> {
        self.active.load_full()
    }
}

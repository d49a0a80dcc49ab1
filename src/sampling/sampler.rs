//! Per-thread sampling path
//!
//! The sampler runs *on* the profiled thread at interrupt-like safe points
//! (the host calls [`ThreadSampler::sample_point`] from its instrumentation
//! hook). Everything here is budgeted for that context: one atomic load for
//! the experiment snapshot, allocation only for the captured frame vector,
//! and no locks. The one blocking operation — serving an owed delay — is
//! the virtual-speedup mechanism itself and runs after all bookkeeping.
//!
//! ## Failure handling
//!
//! A tick whose stack cannot be captured is retried a few times and then
//! abandoned; the run continues. A streak of abandoned ticks on one thread
//! is reported once per streak via `log::warn!` and stays non-fatal to
//! every other thread.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use log::warn;

use crate::config::{CAPTURE_RETRIES_PER_TICK, MAX_CONSECUTIVE_CAPTURE_FAILURES};
use crate::domain::{Location, RawFrame};
use crate::experiment::{DelayInjector, DelayState};
use crate::scope::ScopeFilter;

use super::resolver::{FrameResolver, StackSource};

/// Per-thread counters, written only by the owning thread and published
/// for eventual (unsynchronized) diagnostic reads.
#[derive(Debug, Default)]
pub struct ThreadStats {
    samples: AtomicU64,
    capture_failures: AtomicU64,
    injected_delay_ns: AtomicU64,
}

/// Plain-value copy of one thread's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadStatsSnapshot {
    pub samples: u64,
    pub capture_failures: u64,
    pub injected_delay_ns: u64,
}

impl ThreadStats {
    #[must_use]
    pub fn snapshot(&self) -> ThreadStatsSnapshot {
        ThreadStatsSnapshot {
            samples: self.samples.load(Ordering::Relaxed),
            capture_failures: self.capture_failures.load(Ordering::Relaxed),
            injected_delay_ns: self.injected_delay_ns.load(Ordering::Relaxed),
        }
    }
}

/// Sampling handle owned by one profiled thread.
///
/// Created by [`Profiler::register_thread`](crate::Profiler::register_thread)
/// and moved into the thread it samples. Not `Sync` by design: all mutable
/// state is thread-owned.
pub struct ThreadSampler {
    source: Box<dyn StackSource + Send>,
    resolver: Arc<dyn FrameResolver>,
    scope: Arc<ScopeFilter>,
    injector: Arc<DelayInjector>,
    observations: Sender<Location>,
    stop: Arc<AtomicBool>,
    stats: Arc<ThreadStats>,

    sample_interval: Duration,
    max_frames: usize,

    delay_state: DelayState,
    last_tick: Option<Instant>,
    consecutive_failures: u32,
}

impl ThreadSampler {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        source: Box<dyn StackSource + Send>,
        resolver: Arc<dyn FrameResolver>,
        scope: Arc<ScopeFilter>,
        injector: Arc<DelayInjector>,
        observations: Sender<Location>,
        stop: Arc<AtomicBool>,
        stats: Arc<ThreadStats>,
        sample_interval: Duration,
        max_frames: usize,
    ) -> Self {
        Self {
            source,
            resolver,
            scope,
            injector,
            observations,
            stop,
            stats,
            sample_interval,
            max_frames,
            delay_state: DelayState::new(),
            last_tick: None,
            consecutive_failures: 0,
        }
    }

    /// Cadence-gated sampling entry point. Call from the host's safe-point
    /// hook as often as convenient; ticks fire at most once per configured
    /// sampling interval.
    pub fn sample_point(&mut self) {
        let now = Instant::now();
        if let Some(last) = self.last_tick {
            if now.duration_since(last) < self.sample_interval {
                return;
            }
        }
        self.last_tick = Some(now);
        self.sample_now();
    }

    /// Run one sampling tick unconditionally. Used by hosts that drive the
    /// cadence themselves (timer signals) and by tests.
    pub fn sample_now(&mut self) {
        let Some(frames) = self.capture_with_retry() else {
            self.note_failed_tick();
            return;
        };

        // One atomic load; the snapshot stays consistent for the whole tick.
        let spec = self.injector.current();

        let mut top_in_scope: Option<Location> = None;
        let mut candidate_hit = false;
        let mut resolved_any = false;

        for &frame in &frames {
            let Ok(location) = self.resolver.resolve(frame) else { continue };
            resolved_any = true;
            if let Some(spec) = spec.as_deref() {
                if spec.candidate == location {
                    candidate_hit = true;
                }
            }
            if top_in_scope.is_none() && self.scope.in_scope(&location) {
                top_in_scope = Some(location);
            }
        }

        // A sample with no resolvable frame tells us nothing; count it with
        // the capture failures so persistent symbol trouble gets reported.
        if !resolved_any {
            self.note_failed_tick();
            return;
        }

        self.consecutive_failures = 0;
        self.stats.samples.fetch_add(1, Ordering::Relaxed);

        if let Some(location) = top_in_scope {
            // Full channel: drop the observation. The scheduler only needs
            // a sample of the candidate universe, never a complete stream.
            let _ = self.observations.try_send(location);
        }

        if let Some(spec) = spec {
            let owed = self.delay_state.process_sample(&spec, candidate_hit);
            if !owed.is_zero() && !self.stop.load(Ordering::Relaxed) {
                self.stats.injected_delay_ns.fetch_add(owed.as_nanos() as u64, Ordering::Relaxed);
                std::thread::sleep(owed);
            }
        }
    }

    /// Accumulated delay served/credited within the current experiment.
    #[must_use]
    pub fn local_delay_ns(&self) -> u64 {
        self.delay_state.local_delay_ns()
    }

    fn capture_with_retry(&mut self) -> Option<Vec<RawFrame>> {
        for _ in 0..CAPTURE_RETRIES_PER_TICK {
            match self.source.capture(self.max_frames) {
                Ok(frames) if !frames.is_empty() => return Some(frames),
                Ok(_) | Err(_) => {}
            }
        }
        None
    }

    fn note_failed_tick(&mut self) {
        self.consecutive_failures += 1;
        self.stats.capture_failures.fetch_add(1, Ordering::Relaxed);
        // Warn once per streak, at the threshold crossing
        if self.consecutive_failures == MAX_CONSECUTIVE_CAPTURE_FAILURES {
            let thread = std::thread::current();
            warn!(
                "thread {:?}: {} consecutive failed sampling ticks, stack may be uncapturable",
                thread.name().unwrap_or("<unnamed>"),
                self.consecutive_failures
            );
        }
    }
}

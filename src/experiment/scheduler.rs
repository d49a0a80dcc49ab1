//! Experiment lifecycle state machine
//!
//! Runs on its own control thread (never subject to delay injection) and is
//! the sole owner of experiment state: nothing else starts or stops an
//! experiment, which is what guarantees that experiments never overlap.
//!
//! ```text
//! Warmup → Selecting → Running → Draining
//!              ↑                     │
//!              └─────────────────────┘        (stop signal → Stopped)
//! ```
//!
//! - **Warmup**: injection disabled, nothing emitted; lets the profiled
//!   program reach steady state.
//! - **Selecting**: pick the next (candidate, percentage) from the observed
//!   in-scope pool, or the pinned location under fix-exp. An empty pool is
//!   reported once and polled, never fatal.
//! - **Running**: injector armed, candidate samples accumulating; the
//!   window length adapts via [`AdaptivePolicy`].
//! - **Draining**: injector disarmed *before* the end snapshot, delta
//!   computed from counter reads (never resets), record handed off.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::ProfilerConfig;
use crate::domain::{Location, SpeedupPct};
use crate::progress::ProgressTracker;

use super::delay::DelayInjector;
use super::policy::{AdaptivePolicy, WindowVerdict};
use super::state::{ExperimentResult, ExperimentSpec};

pub struct ExperimentScheduler {
    policy: AdaptivePolicy,
    speedup_steps: Vec<u8>,
    warmup: Duration,
    poll_interval: Duration,
    sample_interval: Duration,
    fixed_experiment: Option<Location>,
    /// The progress point's own location is never a candidate.
    excluded: Option<Location>,

    injector: Arc<DelayInjector>,
    progress: Arc<ProgressTracker>,
    observations: Receiver<Location>,
    results: Sender<ExperimentResult>,
    stop: Arc<AtomicBool>,

    rng: StdRng,
    pool: Vec<Location>,
    seen: HashSet<Location>,
    next_target: Duration,
    epoch: u64,
    warned_empty_pool: bool,
}

impl ExperimentScheduler {
    pub(crate) fn new(
        config: &ProfilerConfig,
        injector: Arc<DelayInjector>,
        progress: Arc<ProgressTracker>,
        observations: Receiver<Location>,
        results: Sender<ExperimentResult>,
        stop: Arc<AtomicBool>,
    ) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let excluded = config.progress_point.as_ref().and_then(|pp| pp.location().cloned());
        Self {
            policy: AdaptivePolicy {
                min: config.min_exp_time,
                max: config.max_exp_time,
                inc_threshold: config.inc_exp_time_threshold,
                dec_threshold: config.dec_exp_time_threshold,
            },
            speedup_steps: config.speedup_steps.clone(),
            warmup: config.warmup,
            poll_interval: config.poll_interval,
            sample_interval: config.sample_interval,
            fixed_experiment: config.fixed_experiment.clone(),
            excluded,
            injector,
            progress,
            observations,
            results,
            stop,
            rng,
            pool: Vec::new(),
            seen: HashSet::new(),
            next_target: config.min_exp_time,
            epoch: 0,
            warned_empty_pool: false,
        }
    }

    /// Run the state machine to completion. Consumes the scheduler; returns
    /// when the stop flag is observed.
    pub fn run(mut self) {
        if !self.warmup.is_zero() {
            info!("warmup: {} ms before first experiment", self.warmup.as_millis());
            if !self.sleep_checking_stop(self.warmup) {
                self.injector.clear();
                info!("scheduler stopped during warmup");
                return;
            }
        }

        while !self.stopped() {
            let Some((candidate, pct)) = self.select() else { break };
            self.run_experiment(candidate, pct);
        }

        // Teardown invariant: injection is off before any thread runs past
        // its next sample point.
        self.injector.clear();
        info!("scheduler stopped after {} experiment(s)", self.epoch);
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Sleep in poll-interval slices; false if stop was observed.
    fn sleep_checking_stop(&self, total: Duration) -> bool {
        let deadline = Instant::now() + total;
        loop {
            if self.stopped() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep(self.poll_interval.min(deadline - now));
        }
    }

    /// Pull newly observed in-scope locations into the candidate pool.
    fn drain_observations(&mut self) {
        while let Ok(location) = self.observations.try_recv() {
            if self.excluded.as_ref() == Some(&location) {
                continue;
            }
            if self.seen.insert(location.clone()) {
                self.pool.push(location);
            }
        }
    }

    /// `Selecting`: choose the next candidate and percentage.
    ///
    /// Returns `None` when stop was requested while waiting for a
    /// non-empty pool.
    fn select(&mut self) -> Option<(Location, SpeedupPct)> {
        let candidate = match self.fixed_experiment.clone() {
            Some(pinned) => pinned,
            None => loop {
                if self.stopped() {
                    return None;
                }
                self.drain_observations();
                if self.pool.is_empty() {
                    if !self.warned_empty_pool {
                        warn!(
                            "no in-scope locations observed yet; waiting for the \
                             profiled program to exercise scoped code"
                        );
                        self.warned_empty_pool = true;
                    }
                    std::thread::sleep(self.poll_interval);
                    continue;
                }
                let idx = self.rng.gen_range(0..self.pool.len());
                break self.pool[idx].clone();
            },
        };
        let pct = self.speedup_steps[self.rng.gen_range(0..self.speedup_steps.len())];
        Some((candidate, SpeedupPct::new(pct)))
    }

    /// `Running` + `Draining` for one experiment.
    fn run_experiment(&mut self, candidate: Location, pct: SpeedupPct) {
        self.epoch += 1;
        let spec =
            Arc::new(ExperimentSpec::new(candidate, pct, self.epoch, self.sample_interval));
        let mut target = self.next_target;
        debug!(
            "experiment {}: candidate {} speedup {} target {} ms",
            self.epoch,
            spec.candidate,
            pct,
            target.as_millis()
        );

        let start_progress = self.progress.read();
        let started = Instant::now();
        self.injector.install(Arc::clone(&spec));

        let mut partial = false;
        loop {
            std::thread::sleep(self.poll_interval);
            self.drain_observations();
            if self.stopped() {
                partial = true;
                break;
            }
            match self.policy.assess(started.elapsed(), target, spec.candidate_samples()) {
                WindowVerdict::Continue => {}
                WindowVerdict::Extend(extended) => {
                    debug!(
                        "experiment {}: extending window {} ms -> {} ms ({} candidate samples)",
                        self.epoch,
                        target.as_millis(),
                        extended.as_millis(),
                        spec.candidate_samples()
                    );
                    target = extended;
                }
                WindowVerdict::Finish => break,
            }
        }

        // Draining: injection off before the end snapshot, so no thread is
        // stranded mid-delay and the delta covers exactly the window.
        self.injector.clear();
        let end_progress = self.progress.read();
        let elapsed = started.elapsed();
        let candidate_samples = spec.candidate_samples();

        let result = ExperimentResult {
            candidate: spec.candidate.clone(),
            speedup_pct: pct,
            duration_ms: elapsed.as_millis() as u64,
            progress_delta: end_progress - start_progress,
            candidate_samples,
        };
        if partial {
            debug!("experiment {}: finalized early on stop request", self.epoch);
        }
        match self.results.try_send(result) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("result channel full, dropping experiment {} record", self.epoch);
            }
            Err(TrySendError::Disconnected(_)) => {
                warn!("result sink disconnected, dropping experiment {} record", self.epoch);
            }
        }

        self.next_target = self.policy.next_target(target, candidate_samples);
    }
}

//! Profiler facade: wiring, lifecycle, and the public attach surface
//!
//! [`Profiler::attach`] validates configuration (failing *before* any
//! profiled-thread interference), spawns the control and emitter threads,
//! and hands out per-thread sampling handles. The facade owns shutdown:
//! a stop request disarms delay injection via the scheduler, and
//! [`Profiler::join`] guarantees every emitted record is flushed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{bounded, Sender};
use log::{info, LevelFilter};

use crate::config::ProfilerConfig;
use crate::domain::{ConfigError, Location};
use crate::experiment::{DelayInjector, ExperimentScheduler};
use crate::export::{ResultEmitter, ResultSink};
use crate::progress::{ProgressPointSpec, ProgressTracker};
use crate::sampling::{
    FrameResolver, StackSource, ThreadSampler, ThreadStats, ThreadStatsSnapshot,
};
use crate::scope::ScopeFilter;

/// Newly observed in-scope locations in flight to the scheduler. Overflow
/// drops observations, never blocks a profiled thread.
const OBSERVATION_CHANNEL_CAPACITY: usize = 1024;

/// Completed records in flight to the emitter thread.
const RESULT_CHANNEL_CAPACITY: usize = 256;

/// An attached causal-profiler engine.
pub struct Profiler {
    config: ProfilerConfig,
    scope: Arc<ScopeFilter>,
    progress: Arc<ProgressTracker>,
    injector: Arc<DelayInjector>,
    resolver: Arc<dyn FrameResolver>,
    stop: Arc<AtomicBool>,
    observations: Sender<Location>,
    thread_stats: Mutex<Vec<Arc<ThreadStats>>>,
    scheduler: Option<JoinHandle<()>>,
    emitter: Option<ResultEmitter>,
}

impl std::fmt::Debug for Profiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Profiler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Profiler {
    /// Validate `config` and start the engine.
    ///
    /// Fatal configuration errors surface here, with a non-started engine —
    /// no thread has been delayed and nothing has been written.
    pub fn attach(
        config: ProfilerConfig,
        resolver: Arc<dyn FrameResolver>,
        sink: Box<dyn ResultSink + Send>,
    ) -> Result<Self> {
        init_logging(config.log_level);
        config.validate().context("invalid profiler configuration")?;

        let progress_spec: ProgressPointSpec =
            config.progress_point.clone().ok_or(ConfigError::MissingProgressPoint)?;

        let scope = Arc::new(ScopeFilter::new(&config.search_scopes, &config.ignored_scopes));
        let progress = Arc::new(ProgressTracker::new(progress_spec));
        let injector = Arc::new(DelayInjector::new());
        let stop = Arc::new(AtomicBool::new(false));

        let (obs_tx, obs_rx) = bounded(OBSERVATION_CHANNEL_CAPACITY);
        let (res_tx, res_rx) = bounded(RESULT_CHANNEL_CAPACITY);

        let emitter = ResultEmitter::spawn(sink, res_rx).context("failed to spawn emitter")?;

        let scheduler = ExperimentScheduler::new(
            &config,
            Arc::clone(&injector),
            Arc::clone(&progress),
            obs_rx,
            res_tx,
            Arc::clone(&stop),
        );
        let scheduler = std::thread::Builder::new()
            .name("quicken-scheduler".into())
            .spawn(move || scheduler.run())
            .context("failed to spawn scheduler thread")?;

        info!(
            "attached: {} search scope(s), {} ignore scope(s), progress point {}",
            config.search_scopes.len(),
            config.ignored_scopes.len(),
            match progress.spec() {
                ProgressPointSpec::EndToEnd => "end-to-end".to_string(),
                ProgressPointSpec::Point(loc) => loc.to_string(),
            }
        );

        Ok(Self {
            config,
            scope,
            progress,
            injector,
            resolver,
            stop,
            observations: obs_tx,
            thread_stats: Mutex::new(Vec::new()),
            scheduler: Some(scheduler),
            emitter: Some(emitter),
        })
    }

    /// Create the sampling handle for the calling (or a soon-to-spawn)
    /// profiled thread. The handle is moved into that thread and driven
    /// from its safe-point hook.
    pub fn register_thread(&self, source: Box<dyn StackSource + Send>) -> ThreadSampler {
        let stats = Arc::new(ThreadStats::default());
        if let Ok(mut registry) = self.thread_stats.lock() {
            registry.push(Arc::clone(&stats));
        }
        ThreadSampler::new(
            source,
            Arc::clone(&self.resolver),
            Arc::clone(&self.scope),
            Arc::clone(&self.injector),
            self.observations.clone(),
            Arc::clone(&self.stop),
            stats,
            self.config.sample_interval,
            self.config.max_frames,
        )
    }

    /// Point-mode progress instrumentation: increments iff `location` is
    /// the configured progress point. Returns whether it counted.
    pub fn progress_hit(&self, location: &Location) -> bool {
        self.progress.record_at(location)
    }

    /// Unconditional progress increment, for instrumentation placed
    /// directly on the progress point.
    pub fn record_progress(&self) {
        self.progress.record();
    }

    /// End-to-end completion: one final progress increment (in end-to-end
    /// mode) and a stop request.
    pub fn mark_complete(&self) {
        if matches!(self.progress.spec(), ProgressPointSpec::EndToEnd) {
            self.progress.record();
        }
        self.request_stop();
    }

    /// Request graceful shutdown. Observed by the control thread within one
    /// polling interval; delay injection is disarmed before teardown.
    pub fn request_stop(&self) {
        if !self.stop.swap(true, Ordering::SeqCst) {
            info!("stop requested");
        }
    }

    /// Current progress-counter value.
    #[must_use]
    pub fn progress_count(&self) -> u64 {
        self.progress.read()
    }

    /// Eventual-consistency snapshot of per-thread sampling diagnostics.
    #[must_use]
    pub fn thread_stats(&self) -> Vec<ThreadStatsSnapshot> {
        self.thread_stats
            .lock()
            .map(|registry| registry.iter().map(|s| s.snapshot()).collect())
            .unwrap_or_default()
    }

    /// Stop the engine and wait for the scheduler to finish and the emitter
    /// to flush every record handed off before shutdown.
    pub fn join(mut self) -> Result<()> {
        self.request_stop();
        if let Some(handle) = self.scheduler.take() {
            handle.join().map_err(|_| anyhow!("scheduler thread panicked"))?;
        }
        // The scheduler owned the only result sender; its exit closes the
        // channel, so shutdown below drains and flushes.
        if let Some(emitter) = self.emitter.take() {
            emitter.shutdown();
        }
        Ok(())
    }
}

impl Drop for Profiler {
    fn drop(&mut self) {
        // A dropped-without-join profiler must still stop delaying threads.
        self.stop.store(true, Ordering::SeqCst);
    }
}

fn init_logging(level: Option<LevelFilter>) {
    let mut builder = env_logger::Builder::from_default_env();
    if let Some(level) = level {
        builder.filter_level(level);
    }
    // Host application may already own the global logger
    let _ = builder.try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RawFrame, ResolveError};
    use crate::export::CsvSink;

    fn null_resolver() -> Arc<dyn FrameResolver> {
        Arc::new(|frame: RawFrame| -> Result<Location, ResolveError> {
            Err(ResolveError::SymbolUnavailable(frame.0))
        })
    }

    fn null_sink() -> Box<dyn ResultSink + Send> {
        Box::new(CsvSink::new(Vec::new()))
    }

    #[test]
    fn test_attach_rejects_invalid_config_before_starting() {
        let config = ProfilerConfig::new(); // no progress point, no scope
        let err = Profiler::attach(config, null_resolver(), null_sink()).unwrap_err();
        assert!(err.to_string().contains("invalid profiler configuration"));
    }

    #[test]
    fn test_attach_and_join() {
        let config = ProfilerConfig::new().search_scope("com.example").end_to_end();
        let profiler = Profiler::attach(config, null_resolver(), null_sink()).unwrap();
        assert_eq!(profiler.progress_count(), 0);
        profiler.mark_complete();
        profiler.join().unwrap();
    }

    #[test]
    fn test_mark_complete_increments_end_to_end_counter_once() {
        let config = ProfilerConfig::new().search_scope("com.example").end_to_end();
        let profiler = Profiler::attach(config, null_resolver(), null_sink()).unwrap();
        profiler.mark_complete();
        assert_eq!(profiler.progress_count(), 1);
        profiler.join().unwrap();
    }

    #[test]
    fn test_registered_threads_appear_in_diagnostics() {
        struct EmptySource;
        impl StackSource for EmptySource {
            fn capture(
                &mut self,
                _max_frames: usize,
            ) -> Result<Vec<RawFrame>, crate::domain::CaptureError> {
                Ok(vec![])
            }
        }

        let config = ProfilerConfig::new().search_scope("com.example").end_to_end();
        let profiler = Profiler::attach(config, null_resolver(), null_sink()).unwrap();
        let _a = profiler.register_thread(Box::new(EmptySource));
        let _b = profiler.register_thread(Box::new(EmptySource));
        assert_eq!(profiler.thread_stats().len(), 2);
        profiler.mark_complete();
        profiler.join().unwrap();
    }
}

//! Profiler configuration
//!
//! All engine knobs live here, read-only after [`ProfilerConfig::validate`]
//! passes at attach time. Defaults mirror the reference agent's tuning:
//! 1 ms sampling cadence, 5 s minimum / 80 s maximum experiment windows,
//! and the 5/20 low/high confidence sample thresholds.
//!
//! Two construction paths:
//! - builder-style setters for embedding the engine from Rust;
//! - [`ProfilerConfig::from_agent_args`] for the `'_'`-separated agent
//!   option string (`pkg=com.example_progress-point=Main:42_warmup=5000`).

use std::time::Duration;

use log::LevelFilter;

use crate::domain::{ConfigError, Location};
use crate::progress::ProgressPointSpec;

/// Default sampling cadence: one sample per millisecond per thread.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(1);

/// Default cap on captured stack depth.
pub const DEFAULT_MAX_FRAMES: usize = 200;

/// Default minimum experiment window.
pub const MIN_EXP_TIME: Duration = Duration::from_millis(5_000);

/// Default maximum experiment window after extensions.
pub const MAX_EXP_TIME: Duration = Duration::from_millis(80_000);

/// Below this many candidate samples at window end, the window is extended.
pub const INC_EXP_TIME_THRESHOLD: u64 = 5;

/// At or above this many candidate samples, the window may end early.
pub const DEC_EXP_TIME_THRESHOLD: u64 = 20;

/// Consecutive capture failures on one thread before a warning is logged.
pub const MAX_CONSECUTIVE_CAPTURE_FAILURES: u32 = 10;

/// Capture attempts within a single tick before the tick is abandoned.
pub const CAPTURE_RETRIES_PER_TICK: u32 = 3;

/// How often the scheduler's control thread re-checks elapsed time,
/// sample counts, and the stop flag.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Default speedup step set: 0%, 5%, ..., 100%.
fn default_speedup_steps() -> Vec<u8> {
    (0..=20).map(|i| i * 5).collect()
}

/// Engine configuration, immutable once validated.
#[derive(Debug, Clone)]
pub struct ProfilerConfig {
    /// Container-name patterns defining the candidate search scope.
    pub search_scopes: Vec<String>,
    /// Container-name patterns excluded from the search scope.
    pub ignored_scopes: Vec<String>,
    /// The run's single progress point. `None` is a fatal config error.
    pub progress_point: Option<ProgressPointSpec>,
    /// Pin every experiment to this candidate, skipping search entirely.
    pub fixed_experiment: Option<Location>,
    /// Measurement-free settling period after attach. Zero disables warmup.
    pub warmup: Duration,
    /// Per-thread sampling cadence.
    pub sample_interval: Duration,
    /// Bounded stack capture depth.
    pub max_frames: usize,
    /// Initial (and floor) experiment window length.
    pub min_exp_time: Duration,
    /// Ceiling on the adaptively extended window length.
    pub max_exp_time: Duration,
    /// Candidate-sample count below which a window gets extended.
    pub inc_exp_time_threshold: u64,
    /// Candidate-sample count at which a window may end early.
    pub dec_exp_time_threshold: u64,
    /// Speedup percentages drawn from during selection.
    pub speedup_steps: Vec<u8>,
    /// Control-thread polling interval.
    pub poll_interval: Duration,
    /// Diagnostics verbosity; `None` leaves the logger untouched.
    pub log_level: Option<LevelFilter>,
    /// Fixed RNG seed for reproducible candidate selection.
    pub rng_seed: Option<u64>,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            search_scopes: Vec::new(),
            ignored_scopes: Vec::new(),
            progress_point: None,
            fixed_experiment: None,
            warmup: Duration::ZERO,
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            max_frames: DEFAULT_MAX_FRAMES,
            min_exp_time: MIN_EXP_TIME,
            max_exp_time: MAX_EXP_TIME,
            inc_exp_time_threshold: INC_EXP_TIME_THRESHOLD,
            dec_exp_time_threshold: DEC_EXP_TIME_THRESHOLD,
            speedup_steps: default_speedup_steps(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            log_level: None,
            rng_seed: None,
        }
    }
}

impl ProfilerConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn search_scope(mut self, pattern: impl Into<String>) -> Self {
        self.search_scopes.push(pattern.into());
        self
    }

    #[must_use]
    pub fn ignore_scope(mut self, pattern: impl Into<String>) -> Self {
        self.ignored_scopes.push(pattern.into());
        self
    }

    #[must_use]
    pub fn progress_point(mut self, location: Location) -> Self {
        self.progress_point = Some(ProgressPointSpec::Point(location));
        self
    }

    #[must_use]
    pub fn end_to_end(mut self) -> Self {
        self.progress_point = Some(ProgressPointSpec::EndToEnd);
        self
    }

    #[must_use]
    pub fn fix_experiment(mut self, location: Location) -> Self {
        self.fixed_experiment = Some(location);
        self
    }

    #[must_use]
    pub fn warmup(mut self, warmup: Duration) -> Self {
        self.warmup = warmup;
        self
    }

    #[must_use]
    pub fn experiment_window(mut self, min: Duration, max: Duration) -> Self {
        self.min_exp_time = min;
        self.max_exp_time = max;
        self
    }

    #[must_use]
    pub fn rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// Parse the agent option string: `'_'`-separated `key=value` pairs
    /// (bare `end-to-end` takes no value). Recognized keys:
    /// `pkg`/`package`/`search`, `ignore`, `progress-point`, `end-to-end`,
    /// `warmup` (ms), `fix-exp`, `logging-level`.
    pub fn from_agent_args(args: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for token in args.split('_').filter(|t| !t.is_empty()) {
            let (key, value) = match token.split_once('=') {
                Some((k, v)) => (k, Some(v)),
                None => (token, None),
            };
            match key {
                "pkg" | "package" | "search" => {
                    config.search_scopes.push(required(key, value)?.to_string());
                }
                "ignore" => {
                    config.ignored_scopes.push(required(key, value)?.to_string());
                }
                "progress-point" => {
                    let loc: Location = required(key, value)?.parse()?;
                    config.progress_point = Some(ProgressPointSpec::Point(loc));
                }
                "end-to-end" => {
                    config.progress_point = Some(ProgressPointSpec::EndToEnd);
                }
                "warmup" => {
                    let raw = required(key, value)?;
                    let ms: u64 = raw.parse().map_err(|_| ConfigError::InvalidValue {
                        option: key.to_string(),
                        value: raw.to_string(),
                    })?;
                    config.warmup = Duration::from_millis(ms);
                }
                "fix-exp" => {
                    config.fixed_experiment = Some(required(key, value)?.parse()?);
                }
                "logging-level" => {
                    config.log_level = Some(parse_logging_level(required(key, value)?)?);
                }
                other => return Err(ConfigError::UnknownOption(other.to_string())),
            }
        }
        Ok(config)
    }

    /// Fatal startup checks. Must pass before any delay injection can begin.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.progress_point.is_none() {
            return Err(ConfigError::MissingProgressPoint);
        }
        if self.search_scopes.is_empty() && self.fixed_experiment.is_none() {
            return Err(ConfigError::EmptyScope);
        }
        if self.min_exp_time > self.max_exp_time {
            return Err(ConfigError::InvertedDurationBounds {
                min_ms: self.min_exp_time.as_millis() as u64,
                max_ms: self.max_exp_time.as_millis() as u64,
            });
        }
        if self.speedup_steps.is_empty() {
            return Err(ConfigError::EmptySpeedupSteps);
        }
        Ok(())
    }
}

fn required<'a>(key: &str, value: Option<&'a str>) -> Result<&'a str, ConfigError> {
    value.filter(|v| !v.is_empty()).ok_or_else(|| ConfigError::InvalidValue {
        option: key.to_string(),
        value: String::new(),
    })
}

fn parse_logging_level(raw: &str) -> Result<LevelFilter, ConfigError> {
    match raw {
        "trace" => Ok(LevelFilter::Trace),
        "debug" => Ok(LevelFilter::Debug),
        "info" => Ok(LevelFilter::Info),
        "warn" => Ok(LevelFilter::Warn),
        // The reference agent distinguished error/critical; both map to Error
        "error" | "critical" => Ok(LevelFilter::Error),
        "off" => Ok(LevelFilter::Off),
        other => Err(ConfigError::InvalidValue {
            option: "logging-level".to_string(),
            value: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_tuning() {
        let config = ProfilerConfig::default();
        assert_eq!(config.sample_interval, Duration::from_millis(1));
        assert_eq!(config.min_exp_time, Duration::from_millis(5_000));
        assert_eq!(config.max_exp_time, Duration::from_millis(80_000));
        assert_eq!(config.inc_exp_time_threshold, 5);
        assert_eq!(config.dec_exp_time_threshold, 20);
        assert_eq!(config.max_frames, 200);
        assert_eq!(config.warmup, Duration::ZERO);
        assert_eq!(config.speedup_steps.first(), Some(&0));
        assert_eq!(config.speedup_steps.last(), Some(&100));
        assert_eq!(config.speedup_steps.len(), 21);
    }

    #[test]
    fn test_agent_args_full_string() {
        let config = ProfilerConfig::from_agent_args(
            "pkg=com.example_ignore=com.example.generated_progress-point=com.example.Main:42_warmup=5000_logging-level=debug",
        )
        .unwrap();
        assert_eq!(config.search_scopes, vec!["com.example"]);
        assert_eq!(config.ignored_scopes, vec!["com.example.generated"]);
        assert_eq!(
            config.progress_point,
            Some(ProgressPointSpec::Point(Location::new("com.example.Main", 42)))
        );
        assert_eq!(config.warmup, Duration::from_millis(5_000));
        assert_eq!(config.log_level, Some(LevelFilter::Debug));
        config.validate().unwrap();
    }

    #[test]
    fn test_agent_args_end_to_end_and_fix_exp() {
        let config = ProfilerConfig::from_agent_args(
            "search=com.example_end-to-end_fix-exp=com.example.Hot:7",
        )
        .unwrap();
        assert_eq!(config.progress_point, Some(ProgressPointSpec::EndToEnd));
        assert_eq!(config.fixed_experiment, Some(Location::new("com.example.Hot", 7)));
        config.validate().unwrap();
    }

    #[test]
    fn test_agent_args_rejects_unknown_option() {
        let err = ProfilerConfig::from_agent_args("frobnicate=yes").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownOption(_)));
    }

    #[test]
    fn test_validate_requires_progress_point() {
        let config = ProfilerConfig::new().search_scope("com.example");
        assert!(matches!(config.validate(), Err(ConfigError::MissingProgressPoint)));
    }

    #[test]
    fn test_validate_requires_scope_or_pinned_candidate() {
        let config = ProfilerConfig::new().end_to_end();
        assert!(matches!(config.validate(), Err(ConfigError::EmptyScope)));

        // A pinned candidate makes an empty search scope legal
        let config =
            ProfilerConfig::new().end_to_end().fix_experiment(Location::new("Hot", 7));
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_inverted_bounds() {
        let config = ProfilerConfig::new()
            .search_scope("com.example")
            .end_to_end()
            .experiment_window(Duration::from_millis(100), Duration::from_millis(10));
        assert!(matches!(config.validate(), Err(ConfigError::InvertedDurationBounds { .. })));
    }
}

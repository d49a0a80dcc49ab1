//! Adaptive experiment-window duration policy
//!
//! Rarely-hit candidates need longer windows to accumulate statistical
//! signal; frequently-hit candidates can finish early. The policy is kept
//! separate from the scheduler so the step function is testable on its own
//! and tunable without touching lifecycle code.
//!
//! Step function: double to extend, halve to shrink, clamp to [min, max].

use std::time::Duration;

/// Verdict for a running window at one polling tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowVerdict {
    /// Keep running.
    Continue,
    /// Window elapsed with too little signal; run on with a longer target.
    Extend(Duration),
    /// Enough signal (or out of road): finish the experiment.
    Finish,
}

/// The two named thresholds plus the window bounds.
#[derive(Debug, Clone, Copy)]
pub struct AdaptivePolicy {
    pub min: Duration,
    pub max: Duration,
    /// Below this sample count at window end, extend.
    pub inc_threshold: u64,
    /// At or above this sample count, end early.
    pub dec_threshold: u64,
}

impl AdaptivePolicy {
    /// Judge a running window given elapsed time, the current target
    /// duration, and the candidate samples observed so far.
    #[must_use]
    pub fn assess(
        &self,
        elapsed: Duration,
        target: Duration,
        candidate_samples: u64,
    ) -> WindowVerdict {
        // High confidence: end early, but never before the minimum window
        // (the progress delta needs a meaningful measurement interval).
        if elapsed >= self.min && candidate_samples >= self.dec_threshold {
            return WindowVerdict::Finish;
        }
        if elapsed < target {
            return WindowVerdict::Continue;
        }
        // Window elapsed. Low confidence and road left: extend.
        if candidate_samples < self.inc_threshold && target < self.max {
            let extended = (target * 2).min(self.max);
            return WindowVerdict::Extend(extended);
        }
        WindowVerdict::Finish
    }

    /// Starting target for the next experiment, given how the last window
    /// ended. Growth persists (a rarely-hit program stays rarely hit);
    /// a high-confidence window shrinks the target back toward the minimum.
    #[must_use]
    pub fn next_target(&self, final_target: Duration, candidate_samples: u64) -> Duration {
        let next = if candidate_samples >= self.dec_threshold {
            final_target / 2
        } else {
            final_target
        };
        next.clamp(self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> AdaptivePolicy {
        AdaptivePolicy {
            min: Duration::from_millis(5_000),
            max: Duration::from_millis(80_000),
            inc_threshold: 5,
            dec_threshold: 20,
        }
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_continue_before_target() {
        let p = policy();
        assert_eq!(p.assess(ms(1_000), ms(5_000), 3), WindowVerdict::Continue);
    }

    #[test]
    fn test_low_samples_extend_beyond_minimum() {
        let p = policy();
        // 3 samples by MIN_EXP_TIME: must grow past the minimum
        assert_eq!(p.assess(ms(5_000), ms(5_000), 3), WindowVerdict::Extend(ms(10_000)));
        assert_eq!(p.assess(ms(10_000), ms(10_000), 3), WindowVerdict::Extend(ms(20_000)));
    }

    #[test]
    fn test_extension_never_exceeds_maximum() {
        let p = policy();
        // Doubling from 50s clamps to the 80s ceiling
        assert_eq!(p.assess(ms(50_000), ms(50_000), 0), WindowVerdict::Extend(ms(80_000)));
        // At the ceiling with no signal, the window finishes anyway
        assert_eq!(p.assess(ms(80_000), ms(80_000), 0), WindowVerdict::Finish);
    }

    #[test]
    fn test_high_samples_end_early() {
        let p = policy();
        // 25 samples well before the 80s maximum: finish as soon as the
        // minimum window has elapsed
        assert_eq!(p.assess(ms(4_000), ms(80_000), 25), WindowVerdict::Continue);
        assert_eq!(p.assess(ms(5_000), ms(80_000), 25), WindowVerdict::Finish);
    }

    #[test]
    fn test_moderate_samples_finish_at_target() {
        let p = policy();
        // Between the thresholds: no extension, no early end
        assert_eq!(p.assess(ms(5_000), ms(5_000), 10), WindowVerdict::Finish);
    }

    #[test]
    fn test_next_target_persists_growth() {
        let p = policy();
        assert_eq!(p.next_target(ms(40_000), 4), ms(40_000));
    }

    #[test]
    fn test_next_target_shrinks_after_high_confidence() {
        let p = policy();
        assert_eq!(p.next_target(ms(40_000), 30), ms(20_000));
        // Shrinking floors at the minimum
        assert_eq!(p.next_target(ms(5_000), 30), ms(5_000));
    }
}

//! Experiment engine modules
//!
//! - `state`: the shared experiment snapshot and the immutable result record
//! - `delay`: per-thread virtual-speedup delay accounting
//! - `policy`: adaptive experiment-window duration policy
//! - `scheduler`: the experiment lifecycle state machine

pub mod delay;
pub mod policy;
pub mod scheduler;
pub mod state;

// Re-export common types
pub use delay::{DelayInjector, DelayState};
pub use policy::{AdaptivePolicy, WindowVerdict};
pub use scheduler::ExperimentScheduler;
pub use state::{ExperimentResult, ExperimentSpec};

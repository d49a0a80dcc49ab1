//! Sampling core modules
//!
//! This module contains the per-thread sampling path:
//! - External collaborator traits (stack capture, frame resolution)
//! - The thread sampler invoked at interrupt-like safe points
//! - Per-thread diagnostics published for aggregation

pub mod resolver;
pub mod sampler;

// Re-export common types
pub use resolver::{FrameResolver, StackSource};
pub use sampler::{ThreadSampler, ThreadStats, ThreadStatsSnapshot};

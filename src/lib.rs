//! # quicken — In-Process Causal Profiler Engine
//!
//! quicken measures, for a running program, how much a hypothetical local
//! speedup of one code location would improve a global throughput or
//! latency metric — without optimizing any code. Instead of making the
//! candidate line faster (impossible to do safely at runtime), it makes
//! everything *else* proportionally slower ("virtual speedup") and watches
//! the effect on a progress counter.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  Profiled Application Threads                   │
//! │   safe-point hook → ThreadSampler::sample_point() (inline)      │
//! └───────────┬─────────────────────────────────────┬───────────────┘
//!             │ capture + resolve                   │ serve owed delay
//!             ▼                                     ▼
//! ┌──────────────────┐  in-scope locations  ┌──────────────────┐
//! │   Scope Filter   │ ───────────────────▶ │  Delay Injector  │
//! │ (compiled rules) │   (bounded channel)  │ (atomic snapshot)│
//! └──────────────────┘                      └────────┬─────────┘
//!                                                    │ installs/clears
//! ┌──────────────────┐   before/after reads ┌────────┴─────────┐
//! │ Progress Tracker │ ◀─────────────────── │    Experiment    │
//! │ (monotone AtomicU64)                    │    Scheduler     │
//! └──────────────────┘                      │ (control thread) │
//!                                           └────────┬─────────┘
//!                                                    │ one record per
//!                                                    │ experiment
//!                                           ┌────────▼─────────┐
//!                                           │  Result Emitter  │
//!                                           │ (writer thread)  │
//!                                           └──────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`sampling`]: the per-thread sampling path and the external seams
//!   (`StackSource` for capture, `FrameResolver` for symbolization)
//! - [`scope`]: search/ignore pattern matching over container names
//! - [`progress`]: the run's single monotone progress counter
//! - [`experiment`]: delay injection, adaptive window policy, and the
//!   experiment lifecycle state machine
//! - [`export`]: CSV/JSON result sinks behind a dedicated writer thread
//! - [`config`]: engine knobs, agent-argument parsing, startup validation
//! - [`profiler`]: the attach/stop/join facade tying it all together
//! - [`domain`]: core types (`Location`, `RawFrame`, `SpeedupPct`) and errors
//!
//! ## Key Concepts
//!
//! - **Progress point**: the location (or process-completion event) whose
//!   execution count proxies throughput for the whole run
//! - **Candidate**: the location being evaluated for virtual speedup
//! - **Virtual speedup**: simulating "line L is P% faster" by delaying every
//!   other concurrently active thread proportionally
//! - **Experiment**: one adaptive-duration window pairing a fixed candidate
//!   with a fixed percentage, producing one progress-delta record
//!
//! ## Typical Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use quicken::domain::{Location, RawFrame, ResolveError};
//! use quicken::export::CsvSink;
//! use quicken::{Profiler, ProfilerConfig};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = ProfilerConfig::new()
//!     .search_scope("myapp")
//!     .end_to_end();
//!
//! // The runtime attachment layer supplies real capture + resolution.
//! let resolver = Arc::new(|frame: RawFrame| -> Result<Location, ResolveError> {
//!     Err(ResolveError::SymbolUnavailable(frame.0))
//! });
//!
//! let profiler = Profiler::attach(config, resolver, Box::new(CsvSink::new(std::io::stdout())))?;
//! // Each profiled thread: let mut sampler = profiler.register_thread(source);
//! // and call sampler.sample_point() from its safe-point hook.
//! profiler.mark_complete();
//! profiler.join()?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod domain;
pub mod experiment;
pub mod export;
pub mod profiler;
pub mod progress;
pub mod sampling;
pub mod scope;

// Re-export the attach surface
pub use config::ProfilerConfig;
pub use profiler::Profiler;

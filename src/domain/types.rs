//! Domain types providing compile-time safety and self-documentation
//!
//! These newtype wrappers prevent common bugs like passing a raw frame token
//! where a resolved location is expected, and make signatures expressive.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::errors::ConfigError;

/// Resolved identity of a code position: container (class/module signature)
/// plus line number.
///
/// This is the unit of candidate selection and of progress-point identity.
/// Immutable once resolved; the engine never re-interprets the container
/// string beyond scope matching.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Location {
    /// Fully qualified container name (e.g., "com.example.Worker" or
    /// "myapp::pipeline::stage").
    pub container: String,
    /// 1-based source line within the container.
    pub line: u32,
}

impl Location {
    pub fn new(container: impl Into<String>, line: u32) -> Self {
        Self { container: container.into(), line }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.container, self.line)
    }
}

impl FromStr for Location {
    type Err = ConfigError;

    /// Parse a `"container:line"` pair, e.g. `"com.example.Main:42"`.
    ///
    /// The line number is taken from the *last* colon so container names may
    /// themselves contain colons (Rust module paths).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (container, line) = s
            .rsplit_once(':')
            .ok_or_else(|| ConfigError::InvalidLocation(s.to_string()))?;
        if container.is_empty() {
            return Err(ConfigError::InvalidLocation(s.to_string()));
        }
        let line: u32 =
            line.parse().map_err(|_| ConfigError::InvalidLocation(s.to_string()))?;
        Ok(Location::new(container, line))
    }
}

/// Opaque raw execution position captured from a thread's stack.
///
/// The engine never interprets the value; it is handed to the external
/// [`FrameResolver`](crate::sampling::FrameResolver) which turns it into a
/// [`Location`] or reports the symbol as unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawFrame(pub u64);

impl fmt::Display for RawFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame:{:#x}", self.0)
    }
}

/// Virtual speedup percentage, always in `0..=100`.
///
/// 0% is a valid experiment: it is the control/calibration run during which
/// the delay injector must never charge any thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SpeedupPct(u8);

impl SpeedupPct {
    /// Create a percentage, clamping anything above 100.
    #[must_use]
    pub fn new(pct: u8) -> Self {
        Self(pct.min(100))
    }

    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }

    /// True for the control run (no delay ever injected).
    #[must_use]
    pub fn is_control(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for SpeedupPct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

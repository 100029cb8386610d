//! Simulation time management

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// A point in simulation time, stored as nanoseconds since the run start.
///
/// Model parameters are unitless reals mapped 1:1 onto seconds, so a mean
/// inter-arrival time of `100.0` becomes `SimTime::from_secs_f64(100.0)`.
/// Arithmetic saturates; simulation time never goes negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SimTime(u64);

impl SimTime {
    /// The run start (time zero).
    pub const fn zero() -> Self {
        SimTime(0)
    }

    /// Create a SimTime from raw nanoseconds.
    pub const fn from_nanos(nanos: u64) -> Self {
        SimTime(nanos)
    }

    /// Create a SimTime from whole seconds.
    pub const fn from_secs(secs: u64) -> Self {
        SimTime(secs * 1_000_000_000)
    }

    /// Create a SimTime from fractional seconds.
    ///
    /// Negative inputs are clamped to zero (sampled durations are clipped at
    /// zero, never rejected).
    ///
    /// # Panics
    ///
    /// Panics if `secs` is NaN or infinite; a non-finite sample indicates a
    /// broken sampler and must not advance the clock.
    pub fn from_secs_f64(secs: f64) -> Self {
        if !secs.is_finite() {
            panic!("SimTime cannot be created from non-finite value: {secs}");
        }
        if secs <= 0.0 {
            return SimTime(0);
        }
        const MAX_SECS: f64 = (u64::MAX as f64) / 1_000_000_000.0;
        if secs > MAX_SECS {
            panic!("SimTime value too large: {secs} seconds (max: {MAX_SECS} seconds)");
        }
        SimTime((secs * 1_000_000_000.0) as u64)
    }

    /// Raw nanosecond value.
    pub const fn as_nanos(&self) -> u64 {
        self.0
    }

    /// Time as fractional seconds; the natural unit for statistics.
    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / 1_000_000_000.0
    }

    /// Elapsed time since `earlier` (zero if `earlier` is later).
    pub fn since(&self, earlier: SimTime) -> SimTime {
        SimTime(self.0.saturating_sub(earlier.0))
    }
}

impl Add<SimTime> for SimTime {
    type Output = SimTime;

    fn add(self, rhs: SimTime) -> Self::Output {
        SimTime(self.0.saturating_add(rhs.0))
    }
}

impl Sub<SimTime> for SimTime {
    type Output = SimTime;

    fn sub(self, rhs: SimTime) -> Self::Output {
        self.since(rhs)
    }
}

impl Default for SimTime {
    fn default() -> Self {
        SimTime::zero()
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0 / 1_000_000_000;
        let sub_millis = (self.0 % 1_000_000_000) / 1_000_000;
        if secs > 0 || sub_millis > 0 {
            write!(f, "{secs}.{sub_millis:03}s")
        } else {
            write!(f, "{}ns", self.0)
        }
    }
}

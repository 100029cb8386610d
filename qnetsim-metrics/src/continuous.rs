//! Time-weighted recorder for state variables.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Summary of a [`ContinuousRecord`], serialisable for export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuousSummary {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub total_time: f64,
}

/// Records a state variable that changes at discrete instants: queue length,
/// clients at a station, busy-server fraction.
///
/// Each `set(time, value)` closes the previous interval, weighting the old
/// value by the elapsed span. The mean is the time integral of the value
/// divided by the total observed time; min and max are over the values seen.
/// With value recording enabled the full `(time, value)` trace is retained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContinuousRecord {
    last_time: Option<f64>,
    last_value: f64,
    total_time: f64,
    weighted_sum: f64,
    min: f64,
    max: f64,
    trace: Option<Vec<(f64, f64)>>,
}

impl Default for ContinuousRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl ContinuousRecord {
    pub fn new() -> Self {
        Self {
            last_time: None,
            last_value: 0.0,
            total_time: 0.0,
            weighted_sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            trace: None,
        }
    }

    /// Retain every `(time, value)` update in addition to the aggregates.
    pub fn with_trace() -> Self {
        let mut record = Self::new();
        record.trace = Some(Vec::new());
        record
    }

    /// Record that the variable has the given value from `time` on.
    ///
    /// Updates must arrive in non-decreasing time order; the event loop
    /// guarantees this for station recorders.
    pub fn set(&mut self, time: f64, value: f64) {
        if let Some(last_time) = self.last_time {
            let elapsed = time - last_time;
            debug_assert!(elapsed >= 0.0, "continuous record updated backwards in time");
            self.weighted_sum += self.last_value * elapsed;
            self.total_time += elapsed;
        }
        self.last_time = Some(time);
        self.last_value = value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        if let Some(trace) = &mut self.trace {
            trace.push((time, value));
        }
    }

    /// Time-weighted mean over the observed span; 0 if no time has elapsed.
    pub fn mean(&self) -> f64 {
        if self.total_time == 0.0 {
            0.0
        } else {
            self.weighted_sum / self.total_time
        }
    }

    /// Smallest value seen; 0 before any update.
    pub fn min(&self) -> f64 {
        if self.last_time.is_none() {
            0.0
        } else {
            self.min
        }
    }

    /// Largest value seen; 0 before any update.
    pub fn max(&self) -> f64 {
        if self.last_time.is_none() {
            0.0
        } else {
            self.max
        }
    }

    /// Total time covered by closed intervals.
    pub fn total_time(&self) -> f64 {
        self.total_time
    }

    /// Value currently in effect.
    pub fn current(&self) -> f64 {
        self.last_value
    }

    /// Retained trace, if value recording was enabled.
    pub fn trace(&self) -> Option<&[(f64, f64)]> {
        self.trace.as_deref()
    }

    pub fn summary(&self) -> ContinuousSummary {
        ContinuousSummary {
            mean: self.mean(),
            min: self.min(),
            max: self.max(),
            total_time: self.total_time,
        }
    }
}

impl fmt::Display for ContinuousRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mean={:.2}, min={:.2}, max={:.2}, time={:.2}",
            self.mean(),
            self.min(),
            self.max(),
            self.total_time
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_record_is_all_zero() {
        let record = ContinuousRecord::new();
        assert_eq!(record.mean(), 0.0);
        assert_eq!(record.min(), 0.0);
        assert_eq!(record.max(), 0.0);
        assert_eq!(record.total_time(), 0.0);
    }

    #[test]
    fn test_time_weighted_mean() {
        let mut record = ContinuousRecord::new();
        record.set(0.0, 0.0);
        record.set(10.0, 2.0); // value 0 held for 10
        record.set(30.0, 1.0); // value 2 held for 20
        record.set(40.0, 0.0); // value 1 held for 10
        // Integral: 0*10 + 2*20 + 1*10 = 50 over 40.
        assert!((record.mean() - 1.25).abs() < 1e-12);
        assert_eq!(record.min(), 0.0);
        assert_eq!(record.max(), 2.0);
        assert_eq!(record.total_time(), 40.0);
        assert_eq!(record.current(), 0.0);
    }

    #[test]
    fn test_single_update_has_no_elapsed_time() {
        let mut record = ContinuousRecord::new();
        record.set(5.0, 3.0);
        assert_eq!(record.mean(), 0.0);
        assert_eq!(record.max(), 3.0);
        assert_eq!(record.total_time(), 0.0);
    }

    #[test]
    fn test_same_instant_updates() {
        let mut record = ContinuousRecord::new();
        record.set(0.0, 1.0);
        record.set(0.0, 5.0);
        record.set(2.0, 0.0);
        // Only the last value at t=0 accumulates weight.
        assert!((record.mean() - 5.0).abs() < 1e-12);
        assert_eq!(record.max(), 5.0);
    }

    #[test]
    fn test_trace_retention() {
        let mut record = ContinuousRecord::with_trace();
        record.set(0.0, 1.0);
        record.set(3.0, 2.0);
        assert_eq!(record.trace().unwrap(), &[(0.0, 1.0), (3.0, 2.0)]);

        let record = ContinuousRecord::new();
        assert!(record.trace().is_none());
    }

    #[test]
    fn test_summary_matches_accessors() {
        let mut record = ContinuousRecord::new();
        record.set(0.0, 2.0);
        record.set(4.0, 6.0);
        let s = record.summary();
        assert_eq!(s.mean, record.mean());
        assert_eq!(s.min, 2.0);
        assert_eq!(s.max, 6.0);
        assert_eq!(s.total_time, 4.0);
    }
}

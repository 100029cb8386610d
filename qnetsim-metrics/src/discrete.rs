//! Recorder for streams of individual real values.

use serde::{Deserialize, Serialize};
use std::fmt;

const BIN_COUNT: usize = 128;

/// Adaptive histogram with a fixed bin count and a power-of-two bin width.
///
/// Starts with a bin width of 1. When a sample lands above the upper edge,
/// the width doubles by pairwise-summing adjacent bins into the lower half
/// and zeroing the upper half, repeated until the sample fits. No
/// reallocation ever happens; the transition is pure state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptiveHistogram {
    bins: Vec<u64>,
    width_exp: u32,
}

impl AdaptiveHistogram {
    fn new() -> Self {
        Self {
            bins: vec![0; BIN_COUNT],
            width_exp: 0,
        }
    }

    /// Current bin width (always a power of two, exact as f64).
    pub fn bin_width(&self) -> f64 {
        2.0_f64.powi(self.width_exp as i32)
    }

    /// Per-bin counts; bin `i` covers `[i * width, (i + 1) * width)`.
    pub fn bins(&self) -> &[u64] {
        &self.bins
    }

    fn add(&mut self, value: f64) {
        let value = value.max(0.0);
        let mut index = (value / self.bin_width()) as usize;
        while index >= BIN_COUNT {
            self.fold();
            index = (value / self.bin_width()) as usize;
        }
        self.bins[index] += 1;
    }

    fn fold(&mut self) {
        for i in 0..BIN_COUNT / 2 {
            self.bins[i] = self.bins[2 * i] + self.bins[2 * i + 1];
        }
        for bin in &mut self.bins[BIN_COUNT / 2..] {
            *bin = 0;
        }
        self.width_exp += 1;
    }
}

/// Summary of a [`DiscreteRecord`], serialisable for export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscreteSummary {
    pub count: u64,
    pub mean: f64,
    pub sd: f64,
    pub cv: f64,
    pub min: f64,
    pub max: f64,
}

/// Records a stream of real values: count, mean, sample standard deviation,
/// coefficient of variation, min, max, and an adaptive histogram.
///
/// Mean and sd are computed from running sums; sd uses the sample-variance
/// formula (denominator n-1). All accessors tolerate the no-data case
/// without dividing by zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscreteRecord {
    count: u64,
    sum: f64,
    sum_squared: f64,
    min: f64,
    max: f64,
    histogram: AdaptiveHistogram,
}

impl Default for DiscreteRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl DiscreteRecord {
    pub fn new() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            sum_squared: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            histogram: AdaptiveHistogram::new(),
        }
    }

    /// Record one value.
    pub fn record(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.sum_squared += value * value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.histogram.add(value);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.sum / self.count as f64
    }

    /// Sample standard deviation (denominator n-1); 0 for fewer than two
    /// values.
    pub fn sd(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        let n = self.count as f64;
        let variance = (self.sum_squared - self.sum * self.sum / n) / (n - 1.0);
        variance.max(0.0).sqrt()
    }

    /// Coefficient of variation: sd/mean, or 0 when the mean is 0.
    pub fn cv(&self) -> f64 {
        let mean = self.mean();
        if mean == 0.0 {
            0.0
        } else {
            self.sd() / mean
        }
    }

    pub fn min(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.min
        }
    }

    pub fn max(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.max
        }
    }

    pub fn histogram(&self) -> &AdaptiveHistogram {
        &self.histogram
    }

    pub fn summary(&self) -> DiscreteSummary {
        DiscreteSummary {
            count: self.count,
            mean: self.mean(),
            sd: self.sd(),
            cv: self.cv(),
            min: self.min(),
            max: self.max(),
        }
    }
}

impl fmt::Display for DiscreteRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "count={}, mean={:.2}, sd={:.2}, cv={:.2}, min={:.2}, max={:.2}",
            self.count,
            self.mean(),
            self.sd(),
            self.cv(),
            self.min(),
            self.max()
        )
    }
}

//! Counter over categorical outcomes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Counts categorical outcomes: routing exits at a decide station, the
/// success/cancel/blocked verdict at a service station.
///
/// Options are keyed by name; a BTreeMap keeps iteration (and thus Display
/// and export output) in a stable order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptionsRecord {
    counts: BTreeMap<String, u64>,
    total: u64,
}

impl OptionsRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one occurrence of `option`.
    pub fn record(&mut self, option: &str) {
        *self.counts.entry(option.to_string()).or_insert(0) += 1;
        self.total += 1;
    }

    /// Total occurrences across all options.
    pub fn count(&self) -> u64 {
        self.total
    }

    /// Occurrences of one option (0 if never seen).
    pub fn count_of(&self, option: &str) -> u64 {
        self.counts.get(option).copied().unwrap_or(0)
    }

    /// Share of one option in the total; 0 when nothing was recorded.
    pub fn share_of(&self, option: &str) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.count_of(option) as f64 / self.total as f64
        }
    }

    /// All options with their counts, in name order.
    pub fn counts(&self) -> &BTreeMap<String, u64> {
        &self.counts
    }
}

impl fmt::Display for OptionsRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "total={}", self.total)?;
        for (option, count) in &self.counts {
            write!(f, ", {option}={count}")?;
        }
        Ok(())
    }
}

//! Statistic recorders for queueing network simulations.
//!
//! Three recorder flavours cover everything a station observes:
//!
//! - [`DiscreteRecord`]: a stream of individual values (waiting times,
//!   service times) with running mean, sample sd, cv, min/max, and an
//!   adaptive power-of-two histogram.
//! - [`ContinuousRecord`]: a time-weighted state variable (queue length,
//!   clients at the station, busy-server fraction).
//! - [`OptionsRecord`]: a counter over categorical outcomes (routing exits,
//!   success/cancel/blocked verdicts).
//!
//! Every recorder tolerates the no-data case: means, deviations and shares
//! are 0 when nothing was recorded, never a division by zero. Summaries are
//! `serde`-serialisable; the [`export`] module writes them as JSON.

pub mod continuous;
pub mod discrete;
pub mod export;
pub mod options;

pub use continuous::{ContinuousRecord, ContinuousSummary};
pub use discrete::{AdaptiveHistogram, DiscreteRecord, DiscreteSummary};
pub use export::{to_json, ExportError};
pub use options::OptionsRecord;

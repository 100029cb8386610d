//! Structured logging for simulation debugging.
//!
//! Runs are silent by default. Call one of the init functions from a binary
//! or test harness to see what the engine is doing:
//!
//! - `trace`: per-event scheduling and dispatch (very verbose)
//! - `debug`: station state transitions and periodic scheduler progress
//! - `info`: run start/end
//!
//! The `RUST_LOG` environment variable takes precedence, so module-level
//! filters like `RUST_LOG=qnetsim_core::scheduler=trace` work as usual.

use tracing::info;
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging for the simulation with sensible defaults (info level).
pub fn init_simulation_logging() {
    init_simulation_logging_with_level("info")
}

/// Initialize logging with a specific level.
///
/// # Arguments
/// * `level` - Log level: "trace", "debug", "info", "warn", or "error"
pub fn init_simulation_logging_with_level(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("qnetsim_core={level},qnetsim_stations={level}").into());

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_level(true))
        .with(filter)
        .init();

    info!("Simulation logging initialized at level: {}", level);
}

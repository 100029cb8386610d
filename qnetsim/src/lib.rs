//! # QNetSim: discrete-event simulation of open queueing networks
//!
//! QNetSim is a deterministic, event-driven simulator for queueing networks
//! of arbitrary topology: sources emit clients, service stations queue and
//! serve them (with impatience, batching, priorities, capacity limits and
//! post-processing), decide stations route them, and dispose stations
//! record their trajectories.
//!
//! ## Quick Start
//!
//! ```rust
//! use qnetsim::models::mmc_model;
//! use qnetsim::prelude::*;
//!
//! let results = mmc_model(SimulationConfig::with_seed(42), 100.0, 80.0, 1, 10_000)
//!     .run()
//!     .unwrap();
//! assert_eq!(results.dispose.count(), 10_000);
//! println!("E[W] = {:.1}", results.process.station_waiting().mean());
//! ```
//!
//! ## Crates
//!
//! - [`core`]: the engine (clock, scheduler, components, samplers).
//! - [`stations`]: the station library networks are composed from.
//! - [`metrics`]: the statistic recorders stations expose.
//! - [`models`]: ready-made M/M/c and impatience/retry models.
//! - [`analytic`]: Erlang-C oracle for validating simulated means.
//! - [`study`]: thread-based parameter-study driver.

pub use qnetsim_core as core;
pub use qnetsim_metrics as metrics;
pub use qnetsim_stations as stations;

pub mod analytic;
pub mod models;
pub mod study;

pub mod prelude {
    //! Commonly used types and traits.

    pub use qnetsim_core::dists::{
        Deterministic, Empirical, Exponential, Gamma, LogNormal, Triangular, Uniform,
    };
    pub use qnetsim_core::{
        Component, ConfigError, Execute, Executor, Key, Sampler, SamplerSlot, SamplerSpec,
        Scheduler, SimTime, Simulation, SimulationConfig,
    };
    pub use qnetsim_metrics::{ContinuousRecord, DiscreteRecord, OptionsRecord};
    pub use qnetsim_stations::{
        build_network, Client, Decide, DecideClientType, DecideCondition, Delay, Dispose, Process,
        Source, StationEvent,
    };
}

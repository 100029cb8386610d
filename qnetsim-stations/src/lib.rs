//! Interconnectable station types for queueing network simulations.
//!
//! Networks are composed from a small library of stations, all speaking the
//! same [`StationEvent`] vocabulary:
//!
//! - [`Source`]: emits a bounded sequence of clients.
//! - [`Process`]: queue + parallel servers, with impatience, batching,
//!   priorities, per-type overrides, capacity limits and post-processing.
//! - [`Delay`]: pure time advance.
//! - [`Dispose`]: terminal sink recording client trajectories.
//! - [`Decide`] / [`DecideCondition`] / [`DecideClientType`]: routing by
//!   chance, by predicate, or by type tag.
//!
//! Stations are registered in a `Simulation`, wired by key (`set_next` and
//! friends), and read back out after the run for their recorders:
//!
//! ```rust
//! use qnetsim_core::dists::Exponential;
//! use qnetsim_core::Simulation;
//! use qnetsim_stations::{Dispose, Process, Source};
//!
//! let mut sim = Simulation::default();
//! let dispose = sim.add_component(Dispose::new());
//! let mut process = Process::new(Exponential::with_seed(80.0, 1), 1);
//! process.set_next(dispose);
//! let process = sim.add_component(process);
//! let mut source = Source::new(1_000, Exponential::with_seed(100.0, 2));
//! source.set_next(process);
//! let _source = sim.add_component(source);
//!
//! sim.run().unwrap();
//!
//! let dispose: Dispose = sim.remove_component(dispose).unwrap();
//! assert_eq!(dispose.count(), 1_000);
//! ```

pub mod client;
pub mod decide;
pub mod delay;
pub mod dispose;
pub mod network;
pub mod process;
pub mod source;
pub mod station;

pub use client::{Client, ClientId};
pub use decide::{Decide, DecideClientType, DecideCondition};
pub use delay::Delay;
pub use dispose::Dispose;
pub use network::build_network;
pub use process::{Discipline, PriorityFn, Process, QueueLenRef};
pub use source::Source;
pub use station::{Outlet, StationEvent};

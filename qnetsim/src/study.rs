//! Thread-based parameter-study driver.
//!
//! A parameter study runs N independent models and collects their results.
//! Each job builds and runs its own `Simulation` on its own OS thread, so
//! no simulation state ever crosses a thread boundary; only the job inputs
//! (plain data, typically [`SamplerSpec`](qnetsim_core::SamplerSpec)
//! descriptors) and the extracted results do.

use std::thread;
use tracing::info;

/// Run every job on its own thread and collect the results in submission
/// order.
///
/// # Panics
///
/// Panics if a worker panics; a failed run is an engine error, not a domain
/// outcome.
pub fn run_parallel<R, F>(jobs: Vec<F>) -> Vec<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let job_count = jobs.len();
    info!(jobs = job_count, "Starting parameter study");

    let handles: Vec<_> = jobs.into_iter().map(thread::spawn).collect();
    let results = handles
        .into_iter()
        .map(|handle| handle.join().expect("simulation worker panicked"))
        .collect();

    info!(jobs = job_count, "Parameter study completed");
    results
}

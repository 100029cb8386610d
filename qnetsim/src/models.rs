//! Ready-made models for common queueing systems.
//!
//! These helpers wire the standard textbook configurations, a plain M/M/c
//! chain and an M/M/c+M system with impatience and retries, and hand back
//! the stations after the run so their recorders can be read.

use qnetsim_core::dists::Exponential;
use qnetsim_core::{ConfigError, Key, Simulation, SimulationConfig};
use qnetsim_stations::{Decide, Delay, Dispose, Process, Source, StationEvent};

// Role salts keep the sampler streams of a model independent even when two
// roles share the same mean.
const SALT_ARRIVAL: u64 = 0x01;
const SALT_SERVICE: u64 = 0x02;
const SALT_PATIENCE: u64 = 0x03;
const SALT_RETRY_DELAY: u64 = 0x04;
const SALT_RETRY_DECIDE: u64 = 0x05;

/// A wired source -> process -> dispose chain, ready to run.
pub struct MmcModel {
    pub sim: Simulation,
    pub source: Key<StationEvent>,
    pub process: Key<StationEvent>,
    pub dispose: Key<StationEvent>,
}

/// The stations of an [`MmcModel`] after the run.
pub struct MmcResults {
    pub source: Source,
    pub process: Process,
    pub dispose: Dispose,
}

/// Build a simple M/M/c model: exponential inter-arrival times with mean
/// `mean_i`, exponential service times with mean `mean_s`, `c` servers,
/// `count` arrivals.
pub fn mmc_model(
    config: SimulationConfig,
    mean_i: f64,
    mean_s: f64,
    c: usize,
    count: u64,
) -> MmcModel {
    let mut sim = Simulation::new(config);

    let dispose = sim.add_component(Dispose::new());
    let mut process = Process::new(
        Exponential::with_seed(mean_s, config.seed ^ SALT_SERVICE),
        c,
    );
    process.set_next(dispose);
    let process = sim.add_component(process);
    let mut source = Source::new(
        count,
        Exponential::with_seed(mean_i, config.seed ^ SALT_ARRIVAL),
    );
    source.set_next(process);
    let source = sim.add_component(source);

    MmcModel {
        sim,
        source,
        process,
        dispose,
    }
}

impl MmcModel {
    /// Run to exhaustion and extract the stations.
    pub fn run(mut self) -> Result<MmcResults, ConfigError> {
        self.sim.run()?;
        Ok(MmcResults {
            source: self
                .sim
                .remove_component(self.source)
                .expect("source registered by the builder"),
            process: self
                .sim
                .remove_component(self.process)
                .expect("process registered by the builder"),
            dispose: self
                .sim
                .remove_component(self.dispose)
                .expect("dispose registered by the builder"),
        })
    }
}

/// An M/M/c+M model with impatience and an optional retry loop.
pub struct ImpatienceRetryModel {
    pub sim: Simulation,
    pub source: Key<StationEvent>,
    pub process: Key<StationEvent>,
    pub dispose: Key<StationEvent>,
    /// Cancel-path decide (exit 1 = retry via delay, exit 2 = give up);
    /// absent when the retry probability is 0.
    pub retry: Option<Key<StationEvent>>,
    pub retry_delay: Option<Key<StationEvent>>,
}

/// Build an M/M/c+M model: on patience expiry a client retries with
/// probability `retry_probability` after an exponential delay with mean
/// `mean_retry_delay`, otherwise it gives up and leaves.
pub fn impatience_retry_model(
    config: SimulationConfig,
    mean_i: f64,
    mean_s: f64,
    mean_patience: f64,
    retry_probability: f64,
    mean_retry_delay: f64,
    c: usize,
    count: u64,
) -> ImpatienceRetryModel {
    assert!(
        (0.0..1.0).contains(&retry_probability),
        "Retry probability must be in [0, 1)"
    );
    let mut sim = Simulation::new(config);

    let dispose = sim.add_component(Dispose::new());
    let mut process = Process::new(
        Exponential::with_seed(mean_s, config.seed ^ SALT_SERVICE),
        c,
    )
    .patience(Exponential::with_seed(
        mean_patience,
        config.seed ^ SALT_PATIENCE,
    ));
    process.set_next(dispose);

    let (process, retry, retry_delay) = if retry_probability > 0.0 {
        let process = sim.add_component(process);
        let mut delay = Delay::new(Exponential::with_seed(
            mean_retry_delay,
            config.seed ^ SALT_RETRY_DELAY,
        ));
        delay.set_next(process);
        let delay = sim.add_component(delay);
        let mut retry = Decide::with_seed(config.seed ^ SALT_RETRY_DECIDE);
        retry.add_next(delay, retry_probability);
        retry.add_next(dispose, 1.0 - retry_probability);
        let retry = sim.add_component(retry);
        sim.get_component_mut::<StationEvent, Process>(process)
            .expect("process registered above")
            .set_next_cancel(retry);
        (process, Some(retry), Some(delay))
    } else {
        process.set_next_cancel(dispose);
        (sim.add_component(process), None, None)
    };

    let mut source = Source::new(
        count,
        Exponential::with_seed(mean_i, config.seed ^ SALT_ARRIVAL),
    );
    source.set_next(process);
    let source = sim.add_component(source);

    ImpatienceRetryModel {
        sim,
        source,
        process,
        dispose,
        retry,
        retry_delay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mmc_model_conserves_clients() {
        let results = mmc_model(SimulationConfig::with_seed(1), 100.0, 80.0, 1, 2_000)
            .run()
            .unwrap();
        assert_eq!(results.source.count(), 2_000);
        assert_eq!(results.dispose.count(), 2_000);
        assert_eq!(results.process.pending(), 0);
    }

    #[test]
    fn test_retry_model_without_retries_wires_cancel_to_dispose() {
        let model = impatience_retry_model(
            SimulationConfig::with_seed(2),
            100.0,
            80.0,
            50.0,
            0.0,
            100.0,
            1,
            2_000,
        );
        assert!(model.retry.is_none());
        let mut sim = model.sim;
        sim.run().unwrap();
        let dispose: Dispose = sim.remove_component(model.dispose).unwrap();
        // Served and abandoned clients both end up at the sink.
        assert_eq!(dispose.count(), 2_000);
    }
}

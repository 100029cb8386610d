//! Matrix-driven wiring of source/process/dispose networks.

use crate::decide::Decide;
use crate::process::Process;
use crate::source::Source;
use crate::station::StationEvent;
use qnetsim_core::{ConfigError, Key, Simulation, SimulationConfig};

/// Wires a network of sources, processes and disposes from two transition
/// rate matrices.
///
/// - `arrival_rates` has one row per source and one column per process;
///   row `i` gives the rates at which source `i` feeds each process.
/// - `departure_rates` has one row per process and one column per process
///   followed by one column per dispose; row `j` gives the rates at which
///   process `j` feeds its successors.
///
/// Every source is wired to an auto-created [`Decide`] over its row, so the
/// exit-choice statistic exists even when only one process receives its
/// clients. A process row with exactly one positive entry is wired
/// directly; rows with several positive entries go through a Decide. The
/// routing streams are derived from the run-level seed. A row without any
/// positive entry is illegal: every station must have somewhere to send its
/// clients.
///
/// The builder has no runtime role; after it returns, the stations route on
/// their own.
pub fn build_network(
    sim: &mut Simulation,
    config: &SimulationConfig,
    sources: &[Key<StationEvent>],
    processes: &[Key<StationEvent>],
    disposes: &[Key<StationEvent>],
    arrival_rates: &[Vec<f64>],
    departure_rates: &[Vec<f64>],
) -> Result<(), ConfigError> {
    if arrival_rates.len() != sources.len() {
        return Err(dimension_error(
            "arrival_rates row count does not match the number of sources",
        ));
    }
    if departure_rates.len() != processes.len() {
        return Err(dimension_error(
            "departure_rates row count does not match the number of processes",
        ));
    }

    let mut decide_salt = 0_u64;

    for (i, row) in arrival_rates.iter().enumerate() {
        if row.len() != processes.len() {
            return Err(dimension_error(
                "arrival_rates column count does not match the number of processes",
            ));
        }
        decide_salt += 1;
        let target = decide_over_row(sim, config, row, processes, &[], decide_salt)?;
        sim.get_component_mut::<StationEvent, Source>(sources[i])
            .ok_or_else(|| dimension_error("source key does not address a Source"))?
            .set_next(target);
    }

    for (j, row) in departure_rates.iter().enumerate() {
        if row.len() != processes.len() + disposes.len() {
            return Err(dimension_error(
                "departure_rates column count does not match processes + disposes",
            ));
        }
        decide_salt += 1;
        let target = wire_row(sim, config, row, processes, disposes, decide_salt)?;
        sim.get_component_mut::<StationEvent, Process>(processes[j])
            .ok_or_else(|| dimension_error("process key does not address a Process"))?
            .set_next(target);
    }

    Ok(())
}

fn positive_entries(row: &[f64]) -> Vec<(usize, f64)> {
    row.iter()
        .enumerate()
        .filter(|(_, &rate)| rate > 0.0)
        .map(|(index, &rate)| (index, rate))
        .collect()
}

fn successor_at(
    processes: &[Key<StationEvent>],
    disposes: &[Key<StationEvent>],
    index: usize,
) -> Key<StationEvent> {
    if index < processes.len() {
        processes[index]
    } else {
        disposes[index - processes.len()]
    }
}

/// Register a Decide over all positive entries of the row, unconditionally.
fn decide_over_row(
    sim: &mut Simulation,
    config: &SimulationConfig,
    row: &[f64],
    processes: &[Key<StationEvent>],
    disposes: &[Key<StationEvent>],
    salt: u64,
) -> Result<Key<StationEvent>, ConfigError> {
    let positive = positive_entries(row);
    if positive.is_empty() {
        return Err(ConfigError::NoPositiveRate { station: "network" });
    }
    let mut decide = Decide::from_config(config, salt);
    for (index, rate) in &positive {
        decide.add_next(successor_at(processes, disposes, *index), *rate);
    }
    Ok(sim.add_component(decide))
}

/// Resolve one rate row to a target key: the single positive successor, or
/// a freshly registered Decide over all positive ones.
fn wire_row(
    sim: &mut Simulation,
    config: &SimulationConfig,
    row: &[f64],
    processes: &[Key<StationEvent>],
    disposes: &[Key<StationEvent>],
    salt: u64,
) -> Result<Key<StationEvent>, ConfigError> {
    match positive_entries(row).as_slice() {
        [] => Err(ConfigError::NoPositiveRate { station: "network" }),
        [(index, _)] => Ok(successor_at(processes, disposes, *index)),
        _ => decide_over_row(sim, config, row, processes, disposes, salt),
    }
}

fn dimension_error(message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: "network",
        reason: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispose::Dispose;
    use qnetsim_core::dists::Exponential;

    fn two_stage_model(config: SimulationConfig) -> (Simulation, Key<StationEvent>) {
        let mut sim = Simulation::new(config);
        let source = sim.add_component(Source::new(
            5_000,
            Exponential::with_seed(50.0, config.seed ^ 1),
        ));
        let p1 = sim.add_component(Process::new(
            Exponential::with_seed(20.0, config.seed ^ 2),
            1,
        ));
        let p2 = sim.add_component(Process::new(
            Exponential::with_seed(20.0, config.seed ^ 3),
            1,
        ));
        let dispose = sim.add_component(Dispose::new());

        build_network(
            &mut sim,
            &config,
            &[source],
            &[p1, p2],
            &[dispose],
            &[vec![1.0, 1.0]],
            &[vec![0.0, 0.0, 1.0], vec![0.0, 0.0, 1.0]],
        )
        .unwrap();

        (sim, dispose)
    }

    #[test]
    fn test_network_conserves_clients() {
        let (mut sim, dispose) = two_stage_model(SimulationConfig::with_seed(11));
        sim.run().unwrap();
        let dispose: Dispose = sim.remove_component(dispose).unwrap();
        assert_eq!(dispose.count(), 5_000);
    }

    #[test]
    fn test_single_entry_source_row_routes_all_clients() {
        // A source row with one positive entry still goes through a Decide.
        let config = SimulationConfig::with_seed(3);
        let mut sim = Simulation::new(config);
        let source = sim.add_component(Source::new(1_000, Exponential::with_seed(50.0, 5)));
        let process = sim.add_component(Process::new(Exponential::with_seed(20.0, 6), 1));
        let dispose = sim.add_component(Dispose::new());

        build_network(
            &mut sim,
            &config,
            &[source],
            &[process],
            &[dispose],
            &[vec![1.0]],
            &[vec![0.0, 1.0]],
        )
        .unwrap();

        sim.run().unwrap();
        let dispose: Dispose = sim.remove_component(dispose).unwrap();
        assert_eq!(dispose.count(), 1_000);
    }

    #[test]
    fn test_all_zero_row_is_rejected() {
        let config = SimulationConfig::with_seed(1);
        let mut sim = Simulation::new(config);
        let source = sim.add_component(Source::new(1, Exponential::with_seed(1.0, 1)));
        let mut process = Process::new(Exponential::with_seed(1.0, 2), 1);
        let dispose = sim.add_component(Dispose::new());
        process.set_next(dispose);
        let process = sim.add_component(process);

        let err = build_network(
            &mut sim,
            &config,
            &[source],
            &[process],
            &[dispose],
            &[vec![0.0]],
            &[vec![0.0, 1.0]],
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::NoPositiveRate { .. }));
    }

    #[test]
    fn test_dimension_mismatch_is_rejected() {
        let config = SimulationConfig::with_seed(1);
        let mut sim = Simulation::new(config);
        let source = sim.add_component(Source::new(1, Exponential::with_seed(1.0, 1)));
        let mut process = Process::new(Exponential::with_seed(1.0, 2), 1);
        let dispose = sim.add_component(Dispose::new());
        process.set_next(dispose);
        let process = sim.add_component(process);

        let err = build_network(
            &mut sim,
            &config,
            &[source],
            &[process],
            &[dispose],
            &[vec![1.0, 1.0]], // one process, two columns
            &[vec![0.0, 1.0]],
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}

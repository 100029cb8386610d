//! End-to-end scenarios validated against closed-form queueing results.
//!
//! With the fixed seeds every run is exactly reproducible; the sample sizes
//! keep the asserted tolerances comfortably away from sampling noise.

use qnetsim::analytic::ErlangC;
use qnetsim::models::{impatience_retry_model, mmc_model};
use qnetsim::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[test]
fn mm1_matches_erlang_c() {
    let results = mmc_model(SimulationConfig::with_seed(42), 100.0, 80.0, 1, 100_000)
        .run()
        .unwrap();

    assert_eq!(results.dispose.count(), 100_000);
    assert_eq!(results.process.pending(), 0);

    let erlang = ErlangC::new(1.0 / 100.0, 1.0 / 80.0, 1);
    let ew = results.process.station_waiting().mean();
    assert!((ew - erlang.ew()).abs() < 20.0, "E[W] was {ew}");

    let rho = results.process.workload().mean();
    assert!((rho - erlang.rho()).abs() < 0.03, "rho was {rho}");

    let enq = results.process.queue_length().mean();
    assert!((enq - erlang.enq()).abs() < 0.3, "E[NQ] was {enq}");
}

#[test]
fn mmc_three_servers_matches_erlang_c() {
    let results = mmc_model(SimulationConfig::with_seed(7), 100.0, 240.0, 3, 1_000_000)
        .run()
        .unwrap();

    assert_eq!(results.dispose.count(), 1_000_000);

    let erlang = ErlangC::new(1.0 / 100.0, 1.0 / 240.0, 3);
    let ew = results.process.station_waiting().mean();
    assert!(
        (ew - erlang.ew()).abs() < 0.05 * erlang.ew(),
        "E[W] was {ew}, Erlang C gives {}",
        erlang.ew()
    );

    let enq = results.process.queue_length().mean();
    assert!(
        (enq - erlang.enq()).abs() < 0.05 * erlang.enq().max(1.0),
        "E[NQ] was {enq}"
    );

    let rho = results.process.workload().mean();
    assert!((rho - erlang.rho()).abs() < 0.02, "rho was {rho}");
}

/// Run one M/M/1 with the given discipline over a fixed pair of arrival and
/// service streams, so the three runs below see the identical workload.
fn run_discipline(configure: impl FnOnce(Process) -> Process) -> Process {
    const COUNT: u64 = 500_000;
    let mut sim = Simulation::default();
    let dispose = sim.add_component(Dispose::new());
    let mut process = configure(Process::new(Exponential::with_seed(80.0, 2001), 1));
    process.set_next(dispose);
    let process = sim.add_component(process);
    let mut source = Source::new(COUNT, Exponential::with_seed(100.0, 2002));
    source.set_next(process);
    let _source = sim.add_component(source);

    sim.run().unwrap();
    let process: Process = sim.remove_component(process).unwrap();
    assert_eq!(process.station_waiting().count(), COUNT);
    process
}

#[test]
fn discipline_changes_spread_but_not_mean() {
    let fifo = run_discipline(|p| p);
    let lifo = run_discipline(|p| p.lifo());
    let mut rng = StdRng::seed_from_u64(2003);
    let random = run_discipline(move |p| p.priority(move |_, _| rng.gen::<f64>()));

    // A work-conserving single server drains the identical workload in the
    // identical busy periods, so the waiting-time SUM is discipline-free;
    // only its distribution over clients changes.
    let mean_fifo = fifo.station_waiting().mean();
    let mean_lifo = lifo.station_waiting().mean();
    let mean_random = random.station_waiting().mean();
    assert!((mean_fifo - mean_lifo).abs() / mean_fifo < 1e-3);
    assert!((mean_fifo - mean_random).abs() / mean_fifo < 1e-3);

    let sd_fifo = fifo.station_waiting().sd();
    let sd_lifo = lifo.station_waiting().sd();
    let sd_random = random.station_waiting().sd();
    assert!(
        sd_fifo < sd_random && sd_random < sd_lifo,
        "sd ordering violated: fifo={sd_fifo}, random={sd_random}, lifo={sd_lifo}"
    );
}

enum Routing {
    Chance,
    ShortestQueue,
}

/// Two parallel single-server stations behind a router; returns the sum of
/// the two mean queue lengths.
fn run_two_queues(routing: Routing) -> f64 {
    const COUNT: u64 = 100_000;
    let mut sim = Simulation::default();
    let dispose = sim.add_component(Dispose::new());

    let mut p1 = Process::new(Exponential::with_seed(80.0, 4001), 1);
    p1.set_next(dispose);
    let q1 = p1.queue_len_ref();
    let p1 = sim.add_component(p1);

    let mut p2 = Process::new(Exponential::with_seed(80.0, 4002), 1);
    p2.set_next(dispose);
    let q2 = p2.queue_len_ref();
    let p2 = sim.add_component(p2);

    let router: Key<StationEvent> = match routing {
        Routing::Chance => {
            let mut decide = Decide::with_seed(4003);
            decide.add_next(p1, 1.0);
            decide.add_next(p2, 1.0);
            sim.add_component(decide)
        }
        Routing::ShortestQueue => {
            let mut decide = DecideCondition::new();
            decide.add_next(p1);
            decide.add_next(p2);
            let mut flip = false;
            decide.set_condition(move |_| {
                if q1.len() < q2.len() {
                    0
                } else if q1.len() > q2.len() {
                    1
                } else {
                    flip = !flip;
                    usize::from(flip)
                }
            });
            sim.add_component(decide)
        }
    };

    let mut source = Source::new(COUNT, Exponential::with_seed(50.0, 4004));
    source.set_next(router);
    let _source = sim.add_component(source);

    sim.run().unwrap();

    let dispose: Dispose = sim.remove_component(dispose).unwrap();
    assert_eq!(dispose.count(), COUNT);
    let p1: Process = sim.remove_component(p1).unwrap();
    let p2: Process = sim.remove_component(p2).unwrap();
    p1.queue_length().mean() + p2.queue_length().mean()
}

#[test]
fn shortest_queue_beats_chance_routing() {
    let chance = run_two_queues(Routing::Chance);
    let shortest = run_two_queues(Routing::ShortestQueue);
    assert!(
        shortest < 0.8 * chance,
        "shortest-queue E[NQ] {shortest} not clearly below chance routing {chance}"
    );
}

#[test]
fn impatience_with_retry_conserves_clients() {
    const COUNT: u64 = 100_000;
    let model = impatience_retry_model(
        SimulationConfig::with_seed(5),
        100.0,
        80.0,
        600.0,
        0.4,
        120.0,
        1,
        COUNT,
    );
    let retry_key = model.retry.expect("retry loop configured");
    let process_key = model.process;
    let dispose_key = model.dispose;
    let mut sim = model.sim;

    sim.run().unwrap();

    let process: Process = sim.remove_component(process_key).unwrap();
    let retry: Decide = sim.remove_component(retry_key).unwrap();
    let dispose: Dispose = sim.remove_component(dispose_key).unwrap();

    // Every client eventually exits through the sink, exactly once.
    assert_eq!(dispose.count(), COUNT);
    // With no capacity limit nothing is ever blocked.
    assert_eq!(process.success().count_of("blocked"), 0);
    // Impatience fires and some of the abandoning clients retry.
    let cancels = process.success().count_of("cancel");
    assert!(cancels > 0);
    assert!(retry.options().count_of("1") > 0, "no retries happened");
    // Every cancel passes through the retry decide.
    assert_eq!(retry.options().count(), cancels);
}

#[test]
fn batch_service_queues_longer_than_two_servers() {
    const COUNT: u64 = 100_000;

    let run = |batched: bool| {
        let mut sim = Simulation::default();
        let dispose = sim.add_component(Dispose::new());
        let service = Exponential::with_seed(80.0, 6001);
        let mut process = if batched {
            Process::new(service, 1).batch_size(2)
        } else {
            Process::new(service, 2)
        };
        process.set_next(dispose);
        let process = sim.add_component(process);
        let mut source = Source::new(COUNT, Exponential::with_seed(50.0, 6002));
        source.set_next(process);
        let _source = sim.add_component(source);

        sim.run().unwrap();
        let dispose: Dispose = sim.remove_component(dispose).unwrap();
        assert_eq!(dispose.count(), COUNT);
        let process: Process = sim.remove_component(process).unwrap();
        process.queue_length().mean()
    };

    let batched = run(true);
    let two_servers = run(false);
    assert!(
        batched > 1.1 * two_servers,
        "batch E[NQ] {batched} not above two-server E[NQ] {two_servers}"
    );
}

//! Routing stations: by chance, by condition, by client type.

use crate::client::Client;
use crate::station::{Outlet, StationEvent};
use qnetsim_core::{Component, ConfigError, Key, Scheduler, SimulationConfig};
use qnetsim_metrics::OptionsRecord;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

/// Routes each arriving client to one of its exits with probabilities
/// proportional to the configured rates.
///
/// Rates are kept as a cumulative vector, maintained at configuration time;
/// a single uniform draw picks the bucket. Single-stage, no queue.
pub struct Decide {
    exits: Vec<Key<StationEvent>>,
    cumulative: Vec<f64>,
    rng: StdRng,
    options: OptionsRecord,
}

impl Decide {
    /// Create a chance-routing station seeded from entropy.
    ///
    /// For reproducible runs prefer [`Decide::with_seed`] or
    /// [`Decide::from_config`].
    pub fn new() -> Self {
        Self::build(SeedableRng::from_entropy())
    }

    /// Create a chance-routing station with an explicit stream seed.
    pub fn with_seed(seed: u64) -> Self {
        Self::build(StdRng::seed_from_u64(seed))
    }

    /// Derive the routing stream from the run-level seed and a per-station
    /// salt (distinct stations should pass distinct salts).
    pub fn from_config(config: &SimulationConfig, salt: u64) -> Self {
        Self::with_seed(config.seed ^ 0x9C9C_C9C9_0707_080F ^ salt)
    }

    fn build(rng: StdRng) -> Self {
        Self {
            exits: Vec::new(),
            cumulative: Vec::new(),
            rng,
            options: OptionsRecord::new(),
        }
    }

    /// Add an exit with a positive rate.
    pub fn add_next(&mut self, station: Key<StationEvent>, rate: f64) {
        assert!(rate > 0.0 && rate.is_finite(), "Rate must be positive");
        let total = self.cumulative.last().copied().unwrap_or(0.0);
        self.exits.push(station);
        self.cumulative.push(total + rate);
    }

    /// Exit counter, keyed by 1-based exit index.
    pub fn options(&self) -> &OptionsRecord {
        &self.options
    }
}

impl Default for Decide {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for Decide {
    type Event = StationEvent;

    fn process_event(
        &mut self,
        _self_id: Key<StationEvent>,
        event: StationEvent,
        scheduler: &mut Scheduler,
    ) {
        match event {
            StationEvent::Arrive(client) => {
                let total = *self.cumulative.last().expect("validated non-empty");
                let draw = self.rng.gen::<f64>() * total;
                let index = self
                    .cumulative
                    .iter()
                    .position(|&edge| draw < edge)
                    .unwrap_or(self.exits.len() - 1);
                trace!(client_id = %client.id(), exit = index + 1, "Client routed by chance");
                self.options.record(&(index + 1).to_string());
                Outlet::send_to(self.exits[index], scheduler, client);
            }
            other => panic!("Decide cannot handle {other:?}"),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.exits.is_empty() {
            return Err(ConfigError::NoPositiveRate { station: "Decide" });
        }
        Ok(())
    }
}

/// Routes via a user-supplied predicate returning a 0-based exit index.
///
/// An out-of-range index is a routing error and fails fast.
pub struct DecideCondition {
    exits: Vec<Key<StationEvent>>,
    condition: Option<Box<dyn FnMut(&Client) -> usize + Send>>,
    options: OptionsRecord,
}

impl DecideCondition {
    pub fn new() -> Self {
        Self {
            exits: Vec::new(),
            condition: None,
            options: OptionsRecord::new(),
        }
    }

    /// Add an exit; the predicate addresses exits by insertion order.
    pub fn add_next(&mut self, station: Key<StationEvent>) {
        self.exits.push(station);
    }

    /// Set the routing predicate.
    pub fn set_condition(&mut self, condition: impl FnMut(&Client) -> usize + Send + 'static) {
        self.condition = Some(Box::new(condition));
    }

    /// Exit counter, keyed by 1-based exit index.
    pub fn options(&self) -> &OptionsRecord {
        &self.options
    }
}

impl Default for DecideCondition {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for DecideCondition {
    type Event = StationEvent;

    fn process_event(
        &mut self,
        _self_id: Key<StationEvent>,
        event: StationEvent,
        scheduler: &mut Scheduler,
    ) {
        match event {
            StationEvent::Arrive(client) => {
                let condition = self.condition.as_mut().expect("validated condition set");
                let index = condition(&client);
                assert!(
                    index < self.exits.len(),
                    "routing condition returned out-of-range exit {index} (of {})",
                    self.exits.len()
                );
                trace!(client_id = %client.id(), exit = index + 1, "Client routed by condition");
                self.options.record(&(index + 1).to_string());
                Outlet::send_to(self.exits[index], scheduler, client);
            }
            other => panic!("DecideCondition cannot handle {other:?}"),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.exits.is_empty() {
            return Err(ConfigError::NoPositiveRate {
                station: "DecideCondition",
            });
        }
        if self.condition.is_none() {
            return Err(ConfigError::MissingSampler {
                station: "DecideCondition",
                sampler: "condition",
            });
        }
        Ok(())
    }
}

/// Routes by the client's type tag, with an optional default exit.
///
/// A client whose type has no mapping and no default is a routing error and
/// fails fast.
pub struct DecideClientType {
    routes: Vec<(String, Key<StationEvent>)>,
    default: Option<Key<StationEvent>>,
    options: OptionsRecord,
}

impl DecideClientType {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            default: None,
            options: OptionsRecord::new(),
        }
    }

    /// Route clients of `client_type` to `station`.
    pub fn set_next(&mut self, client_type: impl Into<String>, station: Key<StationEvent>) {
        let client_type = client_type.into();
        if let Some(route) = self.routes.iter_mut().find(|(tag, _)| *tag == client_type) {
            route.1 = station;
        } else {
            self.routes.push((client_type, station));
        }
    }

    /// Fallback for clients whose type has no mapping (including untyped
    /// clients).
    pub fn set_next_default(&mut self, station: Key<StationEvent>) {
        self.default = Some(station);
    }

    /// Exit counter, keyed by type tag (or "default").
    pub fn options(&self) -> &OptionsRecord {
        &self.options
    }

    fn route_for(&self, client_type: Option<&str>) -> Option<(Key<StationEvent>, &str)> {
        if let Some(tag) = client_type {
            if let Some((tag, station)) = self.routes.iter().find(|(t, _)| t == tag) {
                return Some((*station, tag));
            }
        }
        self.default.map(|station| (station, "default"))
    }
}

impl Default for DecideClientType {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for DecideClientType {
    type Event = StationEvent;

    fn process_event(
        &mut self,
        _self_id: Key<StationEvent>,
        event: StationEvent,
        scheduler: &mut Scheduler,
    ) {
        match event {
            StationEvent::Arrive(client) => {
                let Some((station, label)) = self.route_for(client.client_type()) else {
                    panic!(
                        "no route for client type {:?} and no default exit",
                        client.client_type()
                    );
                };
                trace!(client_id = %client.id(), route = label, "Client routed by type");
                let label = label.to_string();
                self.options.record(&label);
                Outlet::send_to(station, scheduler, client);
            }
            other => panic!("DecideClientType cannot handle {other:?}"),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.routes.is_empty() && self.default.is_none() {
            return Err(ConfigError::NoPositiveRate {
                station: "DecideClientType",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispose::Dispose;
    use crate::process::Process;
    use crate::source::Source;
    use qnetsim_core::dists::{Deterministic, Exponential};
    use qnetsim_core::Simulation;

    #[test]
    fn test_decide_splits_by_rate() {
        let mut sim = Simulation::default();
        let a = sim.add_component(Dispose::new());
        let b = sim.add_component(Dispose::new());
        let mut decide = Decide::with_seed(77);
        decide.add_next(a, 1.0);
        decide.add_next(b, 3.0);
        let decide = sim.add_component(decide);
        let mut source = Source::new(20_000, Deterministic::new(1.0));
        source.set_next(decide);
        let _source = sim.add_component(source);

        sim.run().unwrap();

        let decide: Decide = sim.remove_component(decide).unwrap();
        let a: Dispose = sim.remove_component(a).unwrap();
        let b: Dispose = sim.remove_component(b).unwrap();
        assert_eq!(a.count() + b.count(), 20_000);
        assert_eq!(decide.options().count(), 20_000);
        let share = a.count() as f64 / 20_000.0;
        assert!((share - 0.25).abs() < 0.02, "share was {share}");
    }

    #[test]
    fn test_decide_without_exits_fails_validation() {
        let mut sim = Simulation::default();
        let _decide = sim.add_component(Decide::with_seed(1));
        assert!(sim.run().is_err());
    }

    #[test]
    #[should_panic(expected = "Rate must be positive")]
    fn test_decide_rejects_non_positive_rate() {
        let mut decide = Decide::with_seed(1);
        let key: Key<StationEvent> = Key::new_with_id(uuid::Uuid::from_u128(1));
        decide.add_next(key, 0.0);
    }

    #[test]
    fn test_condition_routes_to_shortest_queue() {
        let mut sim = Simulation::default();
        let dispose = sim.add_component(Dispose::new());

        let mut p1 = Process::new(Exponential::with_seed(80.0, 101), 1);
        p1.set_next(dispose);
        let q1 = p1.queue_len_ref();
        let p1 = sim.add_component(p1);

        let mut p2 = Process::new(Exponential::with_seed(80.0, 102), 1);
        p2.set_next(dispose);
        let q2 = p2.queue_len_ref();
        let p2 = sim.add_component(p2);

        let mut decide = DecideCondition::new();
        decide.add_next(p1);
        decide.add_next(p2);
        decide.set_condition(move |_client| if q1.len() <= q2.len() { 0 } else { 1 });
        let decide = sim.add_component(decide);

        let mut source = Source::new(2_000, Exponential::with_seed(50.0, 103));
        source.set_next(decide);
        let _source = sim.add_component(source);

        sim.run().unwrap();

        let decide: DecideCondition = sim.remove_component(decide).unwrap();
        let dispose: Dispose = sim.remove_component(dispose).unwrap();
        assert_eq!(dispose.count(), 2_000);
        // Both exits must actually be used.
        assert!(decide.options().count_of("1") > 0);
        assert!(decide.options().count_of("2") > 0);
    }

    #[test]
    #[should_panic(expected = "out-of-range exit")]
    fn test_condition_out_of_range_fails_fast() {
        let mut sim = Simulation::default();
        let dispose = sim.add_component(Dispose::new());
        let mut decide = DecideCondition::new();
        decide.add_next(dispose);
        decide.set_condition(|_| 7);
        let decide = sim.add_component(decide);
        let mut source = Source::new(1, Deterministic::new(1.0));
        source.set_next(decide);
        let _source = sim.add_component(source);
        let _ = sim.run();
    }

    #[test]
    fn test_condition_without_predicate_fails_validation() {
        let mut sim = Simulation::default();
        let dispose = sim.add_component(Dispose::new());
        let mut decide = DecideCondition::new();
        decide.add_next(dispose);
        let _decide = sim.add_component(decide);
        assert!(sim.run().is_err());
    }

    #[test]
    fn test_client_type_routing_with_default() {
        let mut sim = Simulation::default();
        let vip_sink = sim.add_component(Dispose::new());
        let other_sink = sim.add_component(Dispose::new());

        let mut decide = DecideClientType::new();
        decide.set_next("vip", vip_sink);
        decide.set_next_default(other_sink);
        let decide = sim.add_component(decide);

        let mut vip_source = Source::new(3, Deterministic::new(10.0)).client_type("vip");
        vip_source.set_next(decide);
        let _vip = sim.add_component(vip_source);
        let mut bulk_source = Source::new(5, Deterministic::new(7.0)).client_type("bulk");
        bulk_source.set_next(decide);
        let _bulk = sim.add_component(bulk_source);

        sim.run().unwrap();

        let decide: DecideClientType = sim.remove_component(decide).unwrap();
        let vip_sink: Dispose = sim.remove_component(vip_sink).unwrap();
        let other_sink: Dispose = sim.remove_component(other_sink).unwrap();
        assert_eq!(vip_sink.count(), 3);
        assert_eq!(other_sink.count(), 5);
        assert_eq!(decide.options().count_of("vip"), 3);
        assert_eq!(decide.options().count_of("default"), 5);
    }

    #[test]
    #[should_panic(expected = "no route for client type")]
    fn test_unmatched_type_without_default_fails_fast() {
        let mut sim = Simulation::default();
        let sink = sim.add_component(Dispose::new());
        let mut decide = DecideClientType::new();
        decide.set_next("vip", sink);
        let decide = sim.add_component(decide);
        let mut source = Source::new(1, Deterministic::new(1.0)).client_type("bulk");
        source.set_next(decide);
        let _source = sim.add_component(source);
        let _ = sim.run();
    }
}

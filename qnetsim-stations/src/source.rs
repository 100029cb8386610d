//! Client source: emits a bounded sequence of arrivals.

use crate::client::Client;
use crate::station::{Outlet, StationEvent};
use qnetsim_core::{Component, ConfigError, Key, SamplerSlot, Scheduler};
use qnetsim_metrics::DiscreteRecord;
use tracing::trace;

/// Emits a bounded number of clients with a configured inter-arrival law
/// and an optional batch size.
///
/// The source is the only station that produces events from nothing: its
/// start hook schedules the first arrival tick at one inter-arrival draw
/// after t=0, and every tick schedules the next while arrivals remain.
/// When the configured count is not a multiple of the batch size, the last
/// batch is truncated to exactly the remaining count.
pub struct Source {
    remaining: u64,
    emitted: u64,
    interarrival: SamplerSlot,
    batch: Option<SamplerSlot>,
    client_type: Option<String>,
    next: Outlet,
    interarrival_stat: DiscreteRecord,
}

impl Source {
    /// Create a source that emits `count` clients with the given
    /// inter-arrival sampler.
    pub fn new(count: u64, interarrival: impl Into<SamplerSlot>) -> Self {
        Self {
            remaining: count,
            emitted: 0,
            interarrival: interarrival.into(),
            batch: None,
            client_type: None,
            next: Outlet::new("Source", "next"),
            interarrival_stat: DiscreteRecord::new(),
        }
    }

    /// Emit batches whose size is drawn from `sampler` (rounded, minimum 1)
    /// instead of single clients.
    #[must_use]
    pub fn batch_sizes(mut self, sampler: impl Into<SamplerSlot>) -> Self {
        self.batch = Some(sampler.into());
        self
    }

    /// Tag every emitted client with a type name.
    #[must_use]
    pub fn client_type(mut self, tag: impl Into<String>) -> Self {
        self.client_type = Some(tag.into());
        self
    }

    /// Wire the station all emitted clients are handed to.
    pub fn set_next(&mut self, station: Key<StationEvent>) {
        self.next.wire(station);
    }

    /// Number of clients emitted so far.
    pub fn count(&self) -> u64 {
        self.emitted
    }

    /// Realized inter-arrival times between ticks.
    pub fn interarrival_times(&self) -> &DiscreteRecord {
        &self.interarrival_stat
    }

    fn schedule_next_tick(&mut self, self_id: Key<StationEvent>, scheduler: &mut Scheduler) {
        let gap = self.interarrival.next_time();
        self.interarrival_stat.record(gap.as_secs_f64());
        scheduler.schedule(gap, self_id, StationEvent::EmitArrivals);
    }

    fn next_batch_size(&mut self) -> u64 {
        match &mut self.batch {
            Some(sampler) => {
                let drawn = sampler.draw().round();
                if drawn.is_finite() && drawn >= 1.0 {
                    drawn as u64
                } else {
                    1
                }
            }
            None => 1,
        }
    }
}

impl Component for Source {
    type Event = StationEvent;

    fn process_event(
        &mut self,
        self_id: Key<StationEvent>,
        event: StationEvent,
        scheduler: &mut Scheduler,
    ) {
        match event {
            StationEvent::EmitArrivals => {
                let now = scheduler.time();
                let emit = self.next_batch_size().min(self.remaining);
                trace!(count = emit, time = %now, "Source emitting arrivals");
                for _ in 0..emit {
                    let client = Client::new(self.client_type.clone(), now);
                    self.next.send(scheduler, client);
                }
                self.remaining -= emit;
                self.emitted += emit;
                if self.remaining > 0 {
                    self.schedule_next_tick(self_id, scheduler);
                }
            }
            other => panic!("Source cannot handle {other:?}"),
        }
    }

    fn on_start(&mut self, self_id: Key<StationEvent>, scheduler: &mut Scheduler) {
        if self.remaining > 0 {
            self.schedule_next_tick(self_id, scheduler);
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.next.require()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispose::Dispose;
    use qnetsim_core::dists::Deterministic;
    use qnetsim_core::Simulation;

    #[test]
    fn test_emits_exact_count() {
        let mut sim = Simulation::default();
        let dispose = sim.add_component(Dispose::new());
        let mut source = Source::new(5, Deterministic::new(10.0));
        source.set_next(dispose);
        let source = sim.add_component(source);

        sim.run().unwrap();

        let source: Source = sim.remove_component(source).unwrap();
        let dispose: Dispose = sim.remove_component(dispose).unwrap();
        assert_eq!(source.count(), 5);
        assert_eq!(dispose.count(), 5);
        // First arrival at one draw after t=0.
        assert_eq!(sim.time(), qnetsim_core::SimTime::from_secs(50));
    }

    #[test]
    fn test_last_batch_is_truncated() {
        let mut sim = Simulation::default();
        let dispose = sim.add_component(Dispose::new());
        let mut source = Source::new(7, Deterministic::new(10.0)).batch_sizes(Deterministic::new(3.0));
        source.set_next(dispose);
        let source = sim.add_component(source);

        sim.run().unwrap();

        let source: Source = sim.remove_component(source).unwrap();
        let dispose: Dispose = sim.remove_component(dispose).unwrap();
        // Batches of 3, 3, then 1.
        assert_eq!(source.count(), 7);
        assert_eq!(dispose.count(), 7);
        assert_eq!(sim.time(), qnetsim_core::SimTime::from_secs(30));
    }

    #[test]
    fn test_client_type_tagging() {
        let mut sim = Simulation::default();
        let dispose = sim.add_component(Dispose::new());
        let mut source = Source::new(1, Deterministic::new(1.0)).client_type("vip");
        source.set_next(dispose);
        let _source = sim.add_component(source);
        sim.run().unwrap();
        // Tag travels with the client; routing by type is covered in decide tests.
    }

    #[test]
    fn test_unwired_source_fails_validation() {
        let mut sim = Simulation::default();
        let _source = sim.add_component(Source::new(1, Deterministic::new(1.0)));
        assert!(sim.run().is_err());
    }

    #[test]
    fn test_interarrival_statistic() {
        let mut sim = Simulation::default();
        let dispose = sim.add_component(Dispose::new());
        let mut source = Source::new(4, Deterministic::new(25.0));
        source.set_next(dispose);
        let source = sim.add_component(source);

        sim.run().unwrap();

        let source: Source = sim.remove_component(source).unwrap();
        assert_eq!(source.interarrival_times().count(), 4);
        assert!((source.interarrival_times().mean() - 25.0).abs() < 1e-9);
    }
}

//! Delay station: pure time advance, no resource contention.

use crate::station::{Outlet, StationEvent};
use qnetsim_core::{Component, ConfigError, Key, SamplerSlot, Scheduler};
use qnetsim_metrics::{ContinuousRecord, DiscreteRecord};
use tracing::trace;

/// Holds each arriving client for one draw of its sampler, then hands it to
/// the successor. There are no servers and no queue; any number of clients
/// can be in transit at once.
pub struct Delay {
    sampler: SamplerSlot,
    next: Outlet,
    in_transit: usize,
    wip: ContinuousRecord,
    residence: DiscreteRecord,
}

impl Delay {
    pub fn new(sampler: impl Into<SamplerSlot>) -> Self {
        Self {
            sampler: sampler.into(),
            next: Outlet::new("Delay", "next"),
            in_transit: 0,
            wip: ContinuousRecord::new(),
            residence: DiscreteRecord::new(),
        }
    }

    pub fn set_next(&mut self, station: Key<StationEvent>) {
        self.next.wire(station);
    }

    /// Clients currently being held.
    pub fn in_transit(&self) -> usize {
        self.in_transit
    }

    /// Time-weighted number of clients at the station.
    pub fn wip(&self) -> &ContinuousRecord {
        &self.wip
    }

    /// Hold time per client.
    pub fn residence_times(&self) -> &DiscreteRecord {
        &self.residence
    }
}

impl Component for Delay {
    type Event = StationEvent;

    fn process_event(
        &mut self,
        self_id: Key<StationEvent>,
        event: StationEvent,
        scheduler: &mut Scheduler,
    ) {
        match event {
            StationEvent::Arrive(client) => {
                let now = scheduler.time();
                let hold = self.sampler.next_time();
                trace!(client_id = %client.id(), hold = %hold, "Client delayed");
                self.residence.record(hold.as_secs_f64());
                self.in_transit += 1;
                self.wip.set(now.as_secs_f64(), self.in_transit as f64);
                scheduler.schedule(hold, self_id, StationEvent::DelayFinished(client));
            }
            StationEvent::DelayFinished(client) => {
                let now = scheduler.time();
                self.in_transit -= 1;
                self.wip.set(now.as_secs_f64(), self.in_transit as f64);
                self.next.send(scheduler, client);
            }
            other => panic!("Delay cannot handle {other:?}"),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.next.require()?;
        Ok(())
    }
}

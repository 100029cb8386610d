//! Terminal station: records client trajectories and drops the client.

use crate::station::StationEvent;
use qnetsim_core::{Component, Key, Scheduler, SimTime};
use qnetsim_metrics::DiscreteRecord;
use tracing::trace;

/// The sink of the network.
///
/// On arrival it books the client's accumulated ledger into the trajectory
/// recorders (total waiting, total service, and residence as now minus
/// creation time) plus the inter-departure gap, then drops the client.
#[derive(Default)]
pub struct Dispose {
    count: u64,
    last_arrival: Option<SimTime>,
    interdeparture: DiscreteRecord,
    client_waiting: DiscreteRecord,
    client_service: DiscreteRecord,
    client_residence: DiscreteRecord,
}

impl Dispose {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of clients disposed.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Inter-departure times from the system.
    pub fn interdeparture_times(&self) -> &DiscreteRecord {
        &self.interdeparture
    }

    /// Total waiting time per disposed client.
    pub fn client_waiting(&self) -> &DiscreteRecord {
        &self.client_waiting
    }

    /// Total service time per disposed client.
    pub fn client_service(&self) -> &DiscreteRecord {
        &self.client_service
    }

    /// Residence time (disposal minus creation) per disposed client.
    pub fn client_residence(&self) -> &DiscreteRecord {
        &self.client_residence
    }
}

impl Component for Dispose {
    type Event = StationEvent;

    fn process_event(
        &mut self,
        _self_id: Key<StationEvent>,
        event: StationEvent,
        scheduler: &mut Scheduler,
    ) {
        match event {
            StationEvent::Arrive(client) => {
                let now = scheduler.time();
                trace!(client_id = %client.id(), time = %now, "Client disposed");
                if let Some(last) = self.last_arrival {
                    self.interdeparture.record(now.since(last).as_secs_f64());
                }
                self.last_arrival = Some(now);
                self.client_waiting.record(client.waiting_time());
                self.client_service.record(client.service_time());
                self.client_residence.record(client.residence_at(now));
                self.count += 1;
            }
            other => panic!("Dispose cannot handle {other:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;

    #[test]
    fn test_records_trajectory_sums() {
        let mut dispose = Dispose::new();
        let mut scheduler = Scheduler::default();
        let key: Key<StationEvent> = Key::new_with_id(uuid::Uuid::from_u128(1));

        // Advance the clock to t=10 via a throwaway event.
        scheduler.schedule(SimTime::from_secs(10), key, StationEvent::EmitArrivals);
        let _ = scheduler.pop();

        let mut client = Client::new(None, SimTime::from_secs(2));
        client.add_waiting_time(3.0);
        client.add_service_time(5.0);

        dispose.process_event(key, StationEvent::Arrive(client), &mut scheduler);

        assert_eq!(dispose.count(), 1);
        assert_eq!(dispose.client_waiting().mean(), 3.0);
        assert_eq!(dispose.client_service().mean(), 5.0);
        assert_eq!(dispose.client_residence().mean(), 8.0);
        // No gap to record for the first departure.
        assert_eq!(dispose.interdeparture_times().count(), 0);
    }

    #[test]
    fn test_interdeparture_gaps() {
        let mut dispose = Dispose::new();
        let mut scheduler = Scheduler::default();
        let key: Key<StationEvent> = Key::new_with_id(uuid::Uuid::from_u128(1));

        dispose.process_event(
            key,
            StationEvent::Arrive(Client::new(None, SimTime::zero())),
            &mut scheduler,
        );
        scheduler.schedule(SimTime::from_secs(4), key, StationEvent::EmitArrivals);
        let _ = scheduler.pop();
        dispose.process_event(
            key,
            StationEvent::Arrive(Client::new(None, SimTime::zero())),
            &mut scheduler,
        );

        assert_eq!(dispose.interdeparture_times().count(), 1);
        assert_eq!(dispose.interdeparture_times().mean(), 4.0);
    }
}

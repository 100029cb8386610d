//! The common station contract: the event vocabulary and successor wiring.

use crate::client::{Client, ClientId};
use qnetsim_core::{ConfigError, Key, Scheduler};

/// The event vocabulary all stations speak.
///
/// `Arrive` is the handoff: scheduling it at the current time hands the
/// client to the addressed station, which owns it from then on. The other
/// variants are station-internal follow-ups (a source's next emission tick,
/// a service completion, a patience timeout) that stations schedule for
/// themselves.
#[derive(Debug)]
pub enum StationEvent {
    /// A client handed over by another station at the current time.
    Arrive(Client),
    /// Source tick: emit the next arrival batch.
    EmitArrivals,
    /// A service batch completed; carries each client with its recorded
    /// queue wait, plus the shared service duration.
    ServiceFinished {
        batch: Vec<(Client, f64)>,
        service_time: f64,
    },
    /// Post-processing after a batch departure finished; frees the server.
    PostProcessingFinished,
    /// A waiting client's patience ran out.
    PatienceExpired(ClientId),
    /// A client's hold time at a delay station elapsed.
    DelayFinished(Client),
}

/// A named successor slot of a station.
///
/// Wiring is optional until `run()`: the sanity pass calls [`Outlet::require`]
/// for every slot the station's configuration makes mandatory. Sending a
/// client through an unwired slot is an implementation error and fails
/// loudly.
#[derive(Debug, Clone, Copy)]
pub struct Outlet {
    station: &'static str,
    slot: &'static str,
    target: Option<Key<StationEvent>>,
}

impl Outlet {
    pub fn new(station: &'static str, slot: &'static str) -> Self {
        Self {
            station,
            slot,
            target: None,
        }
    }

    /// Wire this slot to a successor station.
    pub fn wire(&mut self, target: Key<StationEvent>) {
        self.target = Some(target);
    }

    pub fn is_wired(&self) -> bool {
        self.target.is_some()
    }

    /// The wired successor, or the configuration error naming the gap.
    pub fn require(&self) -> Result<Key<StationEvent>, ConfigError> {
        self.target.ok_or(ConfigError::MissingSuccessor {
            station: self.station,
            slot: self.slot,
        })
    }

    /// Hand a client to the wired successor at the current time.
    ///
    /// # Panics
    ///
    /// Panics if the slot is unwired; the sanity pass catches mandatory
    /// slots, so reaching this for an optional one means the model routed a
    /// client into the void.
    pub fn send(&self, scheduler: &mut Scheduler, client: Client) {
        let Some(target) = self.target else {
            panic!(
                "station `{}` routed a client through unwired slot `{}`",
                self.station, self.slot
            );
        };
        Self::send_to(target, scheduler, client);
    }

    /// Hand a client to an explicit successor at the current time.
    ///
    /// Routing stations that keep a list of exits rather than named slots
    /// use this directly.
    pub fn send_to(target: Key<StationEvent>, scheduler: &mut Scheduler, client: Client) {
        scheduler.schedule_now(target, StationEvent::Arrive(client));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qnetsim_core::SimTime;

    #[test]
    fn test_unwired_outlet_reports_error() {
        let outlet = Outlet::new("Process", "next");
        assert!(!outlet.is_wired());
        let err = outlet.require().unwrap_err();
        assert!(err.to_string().contains("Process"));
        assert!(err.to_string().contains("next"));
    }

    #[test]
    fn test_wired_outlet() {
        let mut outlet = Outlet::new("Process", "next");
        let key: Key<StationEvent> = Key::new_with_id(uuid::Uuid::from_u128(1));
        outlet.wire(key);
        assert!(outlet.is_wired());
        assert_eq!(outlet.require().unwrap(), key);
    }

    #[test]
    #[should_panic(expected = "unwired slot")]
    fn test_send_through_unwired_slot_panics() {
        let outlet = Outlet::new("Source", "next");
        let mut scheduler = Scheduler::default();
        outlet.send(&mut scheduler, Client::new(None, SimTime::zero()));
    }
}

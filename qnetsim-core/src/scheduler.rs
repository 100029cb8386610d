//! Event scheduling and time management for the simulation engine.
//!
//! This module provides the core scheduling infrastructure:
//!
//! - [`Scheduler`]: The internal event queue and clock (owned by [`Simulation`]).
//! - [`SchedulerHandle`]: A cloneable handle for scheduling events during simulation.
//! - [`ClockRef`]: A lightweight, lock-free reference for reading simulation time.
//!
//! Events fire in non-decreasing clock order; among events with an identical
//! fire time the one scheduled first fires first (FCFS by [`EventId`]
//! sequence). A pending event can be invalidated in place with
//! [`Scheduler::cancel_event`]: on dequeue the engine checks the mark and
//! skips the entry without advancing the clock. This is how a waiting
//! client's patience timeout is withdrawn when service starts in time.
//!
//! [`Simulation`]: crate::Simulation

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::fmt;
use std::sync::{
    atomic::{AtomicU64, Ordering as AtomicOrdering},
    Arc, Mutex,
};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::{Key, SimTime};

/// Unique identifier for scheduled events.
///
/// Ids are assigned from a monotonically increasing counter at insertion
/// time, so they double as the tie-breaking sequence for events that share a
/// fire time: among simultaneous events the one scheduled first fires first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Event({})", self.0)
    }
}

/// Entry stored in the scheduler's event queue.
///
/// The payload is type-erased; it is downcast back to the owning component's
/// event type at dispatch and delivered by value, so ownership of whatever
/// the event carries (typically a client token) transfers with it.
pub struct EventEntry {
    event_id: EventId,
    time: SimTime,
    pub(crate) component: Uuid,
    inner: Box<dyn Any>,
}

impl fmt::Debug for EventEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEntry")
            .field("event_id", &self.event_id)
            .field("time", &self.time)
            .field("component", &self.component)
            .finish_non_exhaustive()
    }
}

impl EventEntry {
    pub(crate) fn new<E: fmt::Debug + 'static>(
        id: EventId,
        time: SimTime,
        component: Key<E>,
        event: E,
    ) -> Self {
        EventEntry {
            event_id: id,
            time,
            component: component.id(),
            inner: Box::new(event),
        }
    }

    /// Scheduled fire time.
    pub fn time(&self) -> SimTime {
        self.time
    }

    /// Insertion sequence; breaks ties among same-time events.
    pub fn seq(&self) -> u64 {
        self.event_id.0
    }

    /// Id of this entry.
    pub fn id(&self) -> EventId {
        self.event_id
    }

    /// Consumes the entry, returning the payload if it is of type `E`.
    #[must_use]
    pub(crate) fn downcast_owned<E: fmt::Debug + 'static>(self) -> Option<(Key<E>, E)> {
        let component = self.component;
        self.inner
            .downcast::<E>()
            .ok()
            .map(|event| (Key::new_with_id(component), *event))
    }
}

impl PartialEq for EventEntry {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.event_id == other.event_id
    }
}

impl Eq for EventEntry {}

impl PartialOrd for EventEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse the ordering for min-heap behavior in BinaryHeap
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.event_id.cmp(&self.event_id))
    }
}

type Clock = Arc<AtomicU64>;

/// A lightweight, lock-free reference for reading simulation time.
///
/// Obtain a `ClockRef` from [`Simulation::clock()`](crate::Simulation::clock)
/// or [`Scheduler::clock()`]. Multiple `ClockRef` instances can read the time
/// concurrently without synchronization.
#[derive(Clone)]
pub struct ClockRef {
    clock: Clock,
}

impl ClockRef {
    /// Return the current simulation time.
    #[must_use]
    pub fn time(&self) -> SimTime {
        SimTime::from_nanos(self.clock.load(AtomicOrdering::Relaxed))
    }
}

impl From<Clock> for ClockRef {
    fn from(clock: Clock) -> Self {
        Self { clock }
    }
}

/// A cloneable handle for scheduling events without direct access to the
/// [`Simulation`](crate::Simulation).
#[derive(Clone)]
pub struct SchedulerHandle {
    scheduler: Arc<Mutex<Scheduler>>,
}

impl SchedulerHandle {
    pub(crate) fn new(scheduler: Arc<Mutex<Scheduler>>) -> Self {
        Self { scheduler }
    }

    /// Schedule `event` for `component` at `delay` from now.
    pub fn schedule<E: fmt::Debug + 'static>(
        &self,
        delay: SimTime,
        component: Key<E>,
        event: E,
    ) -> EventId {
        let mut scheduler = self.scheduler.lock().unwrap();
        scheduler.schedule(delay, component, event)
    }

    /// Schedule `event` for `component` at the current time.
    pub fn schedule_now<E: fmt::Debug + 'static>(&self, component: Key<E>, event: E) -> EventId {
        self.schedule(SimTime::zero(), component, event)
    }

    /// Returns the current simulation time.
    #[must_use]
    pub fn time(&self) -> SimTime {
        self.scheduler.lock().unwrap().time()
    }

    /// Returns a ClockRef for reading the simulation time without locking.
    #[must_use]
    pub fn clock(&self) -> ClockRef {
        self.scheduler.lock().unwrap().clock()
    }
}

/// The internal event scheduler (owned by [`Simulation`](crate::Simulation)).
///
/// Most users interact with the scheduler through the methods on
/// [`Simulation`](crate::Simulation) or from inside a component's event
/// handler, which receives `&mut Scheduler` directly.
pub struct Scheduler {
    next_event_id: u64,
    events: BinaryHeap<EventEntry>,
    clock: Clock,
    cancelled: HashSet<EventId>,
    executed_events: u64,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            next_event_id: 0,
            events: BinaryHeap::default(),
            clock: Arc::new(AtomicU64::new(0)),
            cancelled: HashSet::new(),
            executed_events: 0,
        }
    }
}

impl Scheduler {
    /// Schedules `event` to be executed for `component` at `self.time() + delay`.
    ///
    /// Returns the id of the scheduled event; keep it if the event may have
    /// to be cancelled later.
    pub fn schedule<E: fmt::Debug + 'static>(
        &mut self,
        delay: SimTime,
        component: Key<E>,
        event: E,
    ) -> EventId {
        self.next_event_id += 1;
        let event_id = EventId(self.next_event_id);
        let absolute_time = self.time() + delay;

        trace!(
            event_id = ?event_id,
            event_type = std::any::type_name::<E>(),
            scheduled_time = %absolute_time,
            component_id = ?component.id(),
            "Event scheduled"
        );

        self.events
            .push(EventEntry::new(event_id, absolute_time, component, event));

        if self.next_event_id % 100_000 == 0 {
            debug!(
                current_time = %self.time(),
                pending_events = self.events.len(),
                total_events_scheduled = self.next_event_id,
                "Scheduler state update"
            );
        }

        event_id
    }

    /// Schedules `event` to be executed for `component` at the current time.
    pub fn schedule_now<E: fmt::Debug + 'static>(&mut self, component: Key<E>, event: E) -> EventId {
        self.schedule(SimTime::zero(), component, event)
    }

    /// Marks a pending event as invalid.
    ///
    /// The entry stays in the heap; `pop` discards it without advancing the
    /// clock. Returns `false` if the event was already cancelled.
    pub fn cancel_event(&mut self, id: EventId) -> bool {
        self.cancelled.insert(id)
    }

    /// Returns the current simulation time.
    #[must_use]
    pub fn time(&self) -> SimTime {
        SimTime::from_nanos(self.clock.load(AtomicOrdering::Relaxed))
    }

    /// Returns a structure with immutable access to the simulation time.
    #[must_use]
    pub fn clock(&self) -> ClockRef {
        ClockRef {
            clock: Arc::clone(&self.clock),
        }
    }

    /// Returns a reference to the next scheduled event or `None` if none are left.
    ///
    /// Cancelled entries at the head of the queue are discarded first.
    pub fn peek(&mut self) -> Option<&EventEntry> {
        while let Some(head) = self.events.peek() {
            if self.cancelled.contains(&head.event_id) {
                let head = self.events.pop().expect("peeked value exists");
                self.cancelled.remove(&head.event_id);
                continue;
            }
            break;
        }
        self.events.peek()
    }

    /// Removes and returns the next scheduled event or `None` if none are left.
    ///
    /// Skips cancelled events without advancing the clock, so a cancelled
    /// patience timeout scheduled far in the future cannot stretch the run.
    pub fn pop(&mut self) -> Option<EventEntry> {
        while let Some(event) = self.events.pop() {
            if self.cancelled.remove(&event.event_id) {
                trace!(event_id = ?event.event_id, "Skipping cancelled event");
                continue;
            }

            debug_assert!(event.time >= self.time(), "event earlier than previous event");
            self.clock
                .store(event.time.as_nanos(), AtomicOrdering::Relaxed);
            self.executed_events += 1;
            return Some(event);
        }

        None
    }

    /// Number of events popped for execution so far.
    #[must_use]
    pub fn executed_events(&self) -> u64 {
        self.executed_events
    }

    /// Number of entries currently pending (including cancelled ones not yet
    /// discarded).
    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.events.len()
    }
}

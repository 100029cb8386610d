//! Core discrete event simulation engine for open queueing networks.
//!
//! This crate provides the fundamental building blocks: time management,
//! event scheduling, station registration and dispatch, and the sampler
//! capability used for inter-arrival, service and patience times.
//!
//! # Architecture Overview
//!
//! The engine is built around two main types:
//!
//! - [`Simulation`]: The main entry point that owns the scheduler and the
//!   registered stations. Use this to wire models, run them, and read state
//!   back afterwards.
//!
//! - [`Scheduler`]: The time-ordered event queue. Station event handlers
//!   receive `&mut Scheduler` and use it to schedule follow-up events; they
//!   never block.
//!
//! # Basic Usage
//!
//! ```rust,ignore
//! let mut simulation = Simulation::default();
//! let source = simulation.add_component(Source::new(...));
//! // ... wire stations ...
//! simulation.run()?;
//! ```
//!
//! # Time Model
//!
//! All timing uses [`SimTime`], which represents simulation time, not
//! wall-clock time. Runs are single-threaded and cooperative: the loop pops
//! the earliest pending event, dispatches it to the owning station, and
//! repeats until the queue is empty. Given identical seeds and identical
//! construction order, a run is reproducible.

pub mod config;
pub mod dists;
pub mod error;
pub mod execute;
pub mod ids;
pub mod logging;
pub mod scheduler;
pub mod time;

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

pub use config::SimulationConfig;
pub use dists::{Sampler, SamplerSlot, SamplerSpec};
pub use error::{ConfigError, SimError};
pub use execute::{Execute, Executor};
pub use logging::{init_simulation_logging, init_simulation_logging_with_level};
pub use scheduler::{ClockRef, EventEntry, EventId, Scheduler, SchedulerHandle};
pub use time::SimTime;

/// Typed handle to a registered component.
///
/// A `Key<E>` both names a station and pins the event type it accepts, so
/// wiring mistakes (handing a client to something that does not take
/// clients) fail to compile.
#[derive(Debug)]
pub struct Key<E> {
    id: Uuid,
    _marker: std::marker::PhantomData<E>,
}

impl<E> Key<E> {
    pub fn new_with_id(id: Uuid) -> Self {
        Self {
            id,
            _marker: std::marker::PhantomData,
        }
    }

    /// Get the UUID of this key.
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl<E> Clone for Key<E> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<E> Copy for Key<E> {}

impl<E> PartialEq for Key<E> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl<E> Eq for Key<E> {}

/// A station (or any other event consumer) registered in a [`Simulation`].
///
/// Events are delivered by value: whatever the event carries (typically a
/// client token) is owned by the receiving component from then on.
pub trait Component: DispatchEvent {
    type Event: 'static;

    /// Handle one event at the current simulation time.
    ///
    /// Handlers complete synchronously; anything that takes simulated time
    /// is expressed by scheduling a future event and returning.
    fn process_event(
        &mut self,
        self_id: Key<Self::Event>,
        event: Self::Event,
        scheduler: &mut Scheduler,
    );

    /// Called once before the first event is processed.
    ///
    /// Self-driving components (a client source) use this to put their first
    /// event on the queue.
    fn on_start(&mut self, _self_id: Key<Self::Event>, _scheduler: &mut Scheduler) {}

    /// Sanity check of the component's wiring, run at `run()` start.
    fn validate(&self) -> Result<(), ConfigError> {
        Ok(())
    }
}

/// Object-safe dispatch surface implemented for every [`Component`].
pub trait DispatchEvent: Any {
    fn dispatch_entry(&mut self, entry: EventEntry, scheduler: &mut Scheduler);
    fn dispatch_start(&mut self, id: Uuid, scheduler: &mut Scheduler);
    fn check_config(&self) -> Result<(), ConfigError>;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<E, C> DispatchEvent for C
where
    E: fmt::Debug + 'static,
    C: Component<Event = E> + 'static,
{
    fn dispatch_entry(&mut self, entry: EventEntry, scheduler: &mut Scheduler) {
        let (key, event) = entry
            .downcast_owned::<E>()
            .expect("event payload does not match component event type");
        self.process_event(key, event, scheduler);
    }

    fn dispatch_start(&mut self, id: Uuid, scheduler: &mut Scheduler) {
        self.on_start(Key::new_with_id(id), scheduler);
    }

    fn check_config(&self) -> Result<(), ConfigError> {
        self.validate()
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Container holding type-erased components in registration order.
///
/// Keys are minted deterministically from a counter, so building the same
/// model twice yields the same keys and, with the same seeds, the same run.
pub struct Components {
    entries: Vec<(Uuid, Box<dyn DispatchEvent>)>,
    index: HashMap<Uuid, usize>,
    id_seed: u64,
    next_serial: u64,
}

impl Components {
    fn with_seed(id_seed: u64) -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            id_seed,
            next_serial: 0,
        }
    }

    /// Registers a new component and returns its key.
    #[must_use]
    pub fn register<E: fmt::Debug + 'static, C: Component<Event = E> + 'static>(
        &mut self,
        component: C,
    ) -> Key<E> {
        self.next_serial += 1;
        let id = ids::deterministic_uuid(self.id_seed, ids::UUID_DOMAIN_STATION, self.next_serial);
        self.index.insert(id, self.entries.len());
        self.entries.push((id, Box::new(component)));
        Key::new_with_id(id)
    }

    /// Process the event on the component addressed by the entry.
    pub fn process_event_entry(&mut self, entry: EventEntry, scheduler: &mut Scheduler) {
        match self.index.get(&entry.component) {
            Some(&i) => self.entries[i].1.dispatch_entry(entry, scheduler),
            None => warn!(component_id = ?entry.component, "Event for unknown component dropped"),
        }
    }

    /// Run the configuration sanity pass over all components.
    pub fn validate_all(&self) -> Result<(), ConfigError> {
        for (_, component) in &self.entries {
            component.check_config()?;
        }
        Ok(())
    }

    /// Fire every component's start hook, in registration order.
    pub fn start_all(&mut self, scheduler: &mut Scheduler) {
        for (id, component) in &mut self.entries {
            component.dispatch_start(*id, scheduler);
        }
    }

    /// Removes a component, returning it by value.
    pub fn remove<E: 'static, C: Component<Event = E> + 'static>(
        &mut self,
        key: Key<E>,
    ) -> Option<C> {
        let i = self.index.remove(&key.id)?;
        let (_, boxed) = self.entries.remove(i);
        // Positions after the removed entry shift down by one.
        for idx in self.index.values_mut() {
            if *idx > i {
                *idx -= 1;
            }
        }
        let boxed_any: Box<dyn Any> = boxed;
        boxed_any.downcast::<C>().ok().map(|c| *c)
    }

    /// Get mutable access to a component.
    pub fn get_mut<E: 'static, C: Component<Event = E> + 'static>(
        &mut self,
        key: Key<E>,
    ) -> Option<&mut C> {
        let &i = self.index.get(&key.id)?;
        self.entries[i].1.as_any_mut().downcast_mut::<C>()
    }
}

/// The simulation: clock, event queue, and registered stations.
///
/// See the [crate-level documentation](index.html) for more information.
pub struct Simulation {
    scheduler: Arc<Mutex<Scheduler>>,
    pub components: Components,
    started: bool,
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            scheduler: Arc::new(Mutex::new(Scheduler::default())),
            components: Components::with_seed(config.seed),
            started: false,
        }
    }

    /// Returns a cloneable handle for scheduling events from outside.
    #[must_use]
    pub fn scheduler_handle(&self) -> SchedulerHandle {
        SchedulerHandle::new(Arc::clone(&self.scheduler))
    }

    /// Returns the current simulation time.
    #[must_use]
    pub fn time(&self) -> SimTime {
        self.scheduler.lock().unwrap().time()
    }

    /// Returns a ClockRef for reading the simulation time without locking.
    pub fn clock(&self) -> ClockRef {
        self.scheduler.lock().unwrap().clock()
    }

    /// Adds a new component, returning its key.
    #[must_use]
    pub fn add_component<E: fmt::Debug + 'static, C: Component<Event = E> + 'static>(
        &mut self,
        component: C,
    ) -> Key<E> {
        let key = self.components.register(component);
        debug!(
            component_id = ?key.id(),
            component_type = std::any::type_name::<C>(),
            "Added component to simulation"
        );
        key
    }

    /// Removes a component, typically at the end of a run to read its
    /// recorders.
    #[must_use]
    pub fn remove_component<E: fmt::Debug + 'static, C: Component<Event = E> + 'static>(
        &mut self,
        key: Key<E>,
    ) -> Option<C> {
        let result = self.components.remove(key);
        if result.is_none() {
            warn!(component_id = ?key.id(), "Attempted to remove non-existent component");
        }
        result
    }

    /// Get mutable access to a component.
    pub fn get_component_mut<E: fmt::Debug + 'static, C: Component<Event = E> + 'static>(
        &mut self,
        key: Key<E>,
    ) -> Option<&mut C> {
        self.components.get_mut(key)
    }

    /// Schedules an event for `component` at `delay` from now.
    pub fn schedule<E: fmt::Debug + 'static>(
        &mut self,
        delay: SimTime,
        component: Key<E>,
        event: E,
    ) -> EventId {
        self.scheduler.lock().unwrap().schedule(delay, component, event)
    }

    /// Performs one step of the simulation. Returns `true` if an event was
    /// available to process, `false` if the queue is exhausted.
    pub fn step(&mut self) -> bool {
        let event = {
            let mut scheduler = self.scheduler.lock().unwrap();
            scheduler.pop()
        };

        event.is_some_and(|event| {
            trace!(event_time = %event.time(), seq = event.seq(), "Processing simulation step");
            let mut scheduler = self.scheduler.lock().unwrap();
            self.components.process_event_entry(event, &mut scheduler);
            true
        })
    }

    /// Runs the simulation to exhaustion.
    ///
    /// First performs the configuration sanity pass over every registered
    /// station, then fires the start hooks (once, even if `run` is called
    /// again), then drains the event queue. On a configuration error nothing
    /// has been executed and the model can be inspected as wired.
    pub fn run(&mut self) -> Result<(), ConfigError> {
        self.components.validate_all()?;
        self.start_components();
        self.execute(Executor::unbound());
        Ok(())
    }

    /// Fire start hooks without running; useful with a bounded [`Executor`].
    pub fn start_components(&mut self) {
        if !self.started {
            self.started = true;
            let mut scheduler = self.scheduler.lock().unwrap();
            self.components.start_all(&mut scheduler);
        }
    }

    /// Runs the simulation with an explicit executor.
    ///
    /// The stopping condition depends on the executor used. See [`Execute`]
    /// and [`Executor`] for details.
    pub fn execute<X: Execute>(&mut self, executor: X) {
        info!(initial_time = %self.time(), "Starting simulation execution");
        executor.execute(self);
        info!(
            final_time = %self.time(),
            executed_events = self.executed_events(),
            "Simulation execution completed"
        );
    }

    /// Returns the time of the next scheduled event, if any.
    pub fn peek_next_event_time(&self) -> Option<SimTime> {
        self.scheduler.lock().unwrap().peek().map(|e| e.time())
    }

    /// Check if there are pending events.
    pub fn has_pending_events(&self) -> bool {
        self.scheduler.lock().unwrap().peek().is_some()
    }

    /// Number of events executed so far.
    pub fn executed_events(&self) -> u64 {
        self.scheduler.lock().unwrap().executed_events()
    }
}

//! Service station: queue, parallel servers, impatience, batching,
//! priorities, capacity limits, post-processing.

use crate::client::{Client, ClientId};
use crate::station::{Outlet, StationEvent};
use qnetsim_core::{Component, ConfigError, EventId, Key, SamplerSlot, Scheduler, SimTime};
use qnetsim_metrics::{ContinuousRecord, DiscreteRecord, OptionsRecord};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tracing::{debug, trace};

/// Priority function: `(client, waited_time) -> priority`. The waiting
/// client with the maximum value is served next.
pub type PriorityFn = Box<dyn FnMut(&Client, f64) -> f64 + Send>;

/// Queue discipline of a service station.
pub enum Discipline {
    /// First in, first out (the default).
    Fifo,
    /// Last in, first out.
    Lifo,
    /// Formula-driven: priorities are recomputed lazily for every waiting
    /// client whenever a server picks its next batch. Overrides LIFO when
    /// both are configured.
    Priority(PriorityFn),
}

impl fmt::Debug for Discipline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discipline::Fifo => write!(f, "Fifo"),
            Discipline::Lifo => write!(f, "Lifo"),
            Discipline::Priority(_) => write!(f, "Priority(..)"),
        }
    }
}

/// Lock-free read handle on a station's current queue length.
///
/// Routing predicates (shortest-queue selection, say) hold these instead of
/// references into the simulation.
#[derive(Clone)]
pub struct QueueLenRef(Arc<AtomicUsize>);

impl QueueLenRef {
    pub fn len(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug)]
struct Waiting {
    client: Client,
    enqueued_at: SimTime,
    cancel: Option<EventId>,
}

/// The service station.
///
/// `c` parallel servers drain a single queue. A server takes `b` clients at
/// once (default 1) and only starts when a full batch is waiting. Waiting
/// clients may carry a patience budget; when it runs out before service
/// starts they abandon through the cancel outlet. With a capacity `K` set,
/// arrivals that would push queue + in-service past `K` are diverted to the
/// cancel outlet without entering the queue. After a batch departs the
/// server can stay busy for a drawn post-processing span.
///
/// Blocked and cancelled clients are routed outcomes, not errors; all three
/// verdicts land in the success recorder.
pub struct Process {
    servers: usize,
    batch: usize,
    service: SamplerSlot,
    service_by_type: HashMap<String, SamplerSlot>,
    patience: Option<SamplerSlot>,
    patience_by_type: HashMap<String, SamplerSlot>,
    post_processing: Option<SamplerSlot>,
    capacity: Option<usize>,
    discipline: Discipline,
    next: Outlet,
    next_cancel: Outlet,

    queue: VecDeque<Waiting>,
    busy_servers: usize,
    in_service: usize,
    queue_len_shared: Arc<AtomicUsize>,

    station_waiting: DiscreteRecord,
    station_service: DiscreteRecord,
    station_post_processing: DiscreteRecord,
    station_residence: DiscreteRecord,
    success: OptionsRecord,
    queue_length: ContinuousRecord,
    wip: ContinuousRecord,
    workload: ContinuousRecord,
}

impl Process {
    /// Create a station with the given service sampler and `servers` >= 1
    /// parallel servers.
    pub fn new(service: impl Into<SamplerSlot>, servers: usize) -> Self {
        assert!(servers >= 1, "Server count must be at least 1");
        Self {
            servers,
            batch: 1,
            service: service.into(),
            service_by_type: HashMap::new(),
            patience: None,
            patience_by_type: HashMap::new(),
            post_processing: None,
            capacity: None,
            discipline: Discipline::Fifo,
            next: Outlet::new("Process", "next"),
            next_cancel: Outlet::new("Process", "next_cancel"),
            queue: VecDeque::new(),
            busy_servers: 0,
            in_service: 0,
            queue_len_shared: Arc::new(AtomicUsize::new(0)),
            station_waiting: DiscreteRecord::new(),
            station_service: DiscreteRecord::new(),
            station_post_processing: DiscreteRecord::new(),
            station_residence: DiscreteRecord::new(),
            success: OptionsRecord::new(),
            queue_length: ContinuousRecord::new(),
            wip: ContinuousRecord::new(),
            workload: ContinuousRecord::new(),
        }
    }

    /// Serve `batch` >= 1 clients per server at once; service only starts
    /// when a full batch is waiting.
    #[must_use]
    pub fn batch_size(mut self, batch: usize) -> Self {
        assert!(batch >= 1, "Batch size must be at least 1");
        self.batch = batch;
        self
    }

    /// Give waiting clients a patience budget; on expiry they abandon
    /// through the cancel outlet.
    #[must_use]
    pub fn patience(mut self, sampler: impl Into<SamplerSlot>) -> Self {
        self.patience = Some(sampler.into());
        self
    }

    /// Keep the server busy for a drawn span after each batch departs.
    #[must_use]
    pub fn post_processing(mut self, sampler: impl Into<SamplerSlot>) -> Self {
        self.post_processing = Some(sampler.into());
        self
    }

    /// Cap queue + in-service at `capacity` >= 1; arrivals beyond the cap
    /// are diverted to the cancel outlet.
    #[must_use]
    pub fn capacity(mut self, capacity: usize) -> Self {
        assert!(capacity >= 1, "Capacity must be at least 1");
        self.capacity = Some(capacity);
        self
    }

    /// Serve the newest waiting client first. Ignored once a priority
    /// formula is configured.
    #[must_use]
    pub fn lifo(mut self) -> Self {
        if matches!(self.discipline, Discipline::Fifo) {
            self.discipline = Discipline::Lifo;
        }
        self
    }

    /// Serve by a priority formula; overrides LIFO.
    #[must_use]
    pub fn priority(mut self, f: impl FnMut(&Client, f64) -> f64 + Send + 'static) -> Self {
        self.discipline = Discipline::Priority(Box::new(f));
        self
    }

    /// Per-type service-time override.
    #[must_use]
    pub fn service_for_type(
        mut self,
        client_type: impl Into<String>,
        sampler: impl Into<SamplerSlot>,
    ) -> Self {
        self.service_by_type.insert(client_type.into(), sampler.into());
        self
    }

    /// Per-type patience override.
    #[must_use]
    pub fn patience_for_type(
        mut self,
        client_type: impl Into<String>,
        sampler: impl Into<SamplerSlot>,
    ) -> Self {
        self.patience_by_type.insert(client_type.into(), sampler.into());
        self
    }

    /// Retain the full time series of the continuous recorders.
    #[must_use]
    pub fn record_values(mut self, enabled: bool) -> Self {
        if enabled {
            self.queue_length = ContinuousRecord::with_trace();
            self.wip = ContinuousRecord::with_trace();
            self.workload = ContinuousRecord::with_trace();
        }
        self
    }

    /// Wire the successor for served clients.
    pub fn set_next(&mut self, station: Key<StationEvent>) {
        self.next.wire(station);
    }

    /// Wire the successor for cancelled and blocked clients.
    pub fn set_next_cancel(&mut self, station: Key<StationEvent>) {
        self.next_cancel.wire(station);
    }

    /// Current queue length.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Clients currently in service.
    pub fn in_service(&self) -> usize {
        self.in_service
    }

    /// Clients still at the station (waiting or in service).
    pub fn pending(&self) -> usize {
        self.queue.len() + self.in_service
    }

    /// Lock-free handle on the live queue length for routing predicates.
    pub fn queue_len_ref(&self) -> QueueLenRef {
        QueueLenRef(Arc::clone(&self.queue_len_shared))
    }

    /// Waiting time per client that left the queue (served or cancelled).
    pub fn station_waiting(&self) -> &DiscreteRecord {
        &self.station_waiting
    }

    /// Service time per served client.
    pub fn station_service(&self) -> &DiscreteRecord {
        &self.station_service
    }

    /// Post-processing span per completed batch.
    pub fn station_post_processing(&self) -> &DiscreteRecord {
        &self.station_post_processing
    }

    /// Waiting + service time per served client.
    pub fn station_residence(&self) -> &DiscreteRecord {
        &self.station_residence
    }

    /// Outcome counter: success / cancel / blocked.
    pub fn success(&self) -> &OptionsRecord {
        &self.success
    }

    /// Time-weighted queue length.
    pub fn queue_length(&self) -> &ContinuousRecord {
        &self.queue_length
    }

    /// Time-weighted clients at the station (queue + in service).
    pub fn wip(&self) -> &ContinuousRecord {
        &self.wip
    }

    /// Time-weighted fraction of busy servers.
    pub fn workload(&self) -> &ContinuousRecord {
        &self.workload
    }

    fn service_sampler(&mut self, client_type: Option<&str>) -> &mut SamplerSlot {
        if let Some(tag) = client_type {
            if self.service_by_type.contains_key(tag) {
                return self.service_by_type.get_mut(tag).expect("key checked");
            }
        }
        &mut self.service
    }

    fn patience_sampler(&mut self, client_type: Option<&str>) -> Option<&mut SamplerSlot> {
        if let Some(tag) = client_type {
            if self.patience_by_type.contains_key(tag) {
                return self.patience_by_type.get_mut(tag);
            }
        }
        self.patience.as_mut()
    }

    fn sync_recorders(&mut self, now: SimTime) {
        let t = now.as_secs_f64();
        let queue_len = self.queue.len();
        self.queue_len_shared.store(queue_len, Ordering::Relaxed);
        self.queue_length.set(t, queue_len as f64);
        self.wip.set(t, (queue_len + self.in_service) as f64);
        self.workload
            .set(t, self.busy_servers as f64 / self.servers as f64);
    }

    fn handle_arrival(
        &mut self,
        self_id: Key<StationEvent>,
        client: Client,
        scheduler: &mut Scheduler,
    ) {
        let now = scheduler.time();

        if let Some(capacity) = self.capacity {
            if self.queue.len() + self.in_service >= capacity {
                debug!(client_id = %client.id(), capacity, "Client blocked at capacity");
                self.success.record("blocked");
                self.next_cancel.send(scheduler, client);
                return;
            }
        }

        let mut cancel = None;
        if let Some(slot) = self.patience_sampler(client.client_type()) {
            let nu = slot.next_time();
            cancel = Some(scheduler.schedule(nu, self_id, StationEvent::PatienceExpired(client.id())));
        }

        trace!(client_id = %client.id(), queue_len = self.queue.len(), "Client enqueued");
        self.queue.push_back(Waiting {
            client,
            enqueued_at: now,
            cancel,
        });
        self.sync_recorders(now);
        self.try_start_service(self_id, scheduler);
    }

    /// Take the next waiting client according to the discipline.
    ///
    /// The queue holds clients in arrival order, so FIFO pops the front,
    /// LIFO pops the back, and the priority formula scans all waiting
    /// clients, taking the maximum and breaking ties by earliest enqueue.
    fn select_next(&mut self, now: SimTime) -> Waiting {
        match &mut self.discipline {
            Discipline::Fifo => self.queue.pop_front().expect("queue checked non-empty"),
            Discipline::Lifo => self.queue.pop_back().expect("queue checked non-empty"),
            Discipline::Priority(f) => {
                let mut best_index = 0;
                let mut best_priority = f64::NEG_INFINITY;
                for (i, waiting) in self.queue.iter().enumerate() {
                    let waited = now.since(waiting.enqueued_at).as_secs_f64();
                    let priority = f(&waiting.client, waited);
                    assert!(
                        priority.is_finite(),
                        "priority function returned a non-finite value"
                    );
                    if priority > best_priority {
                        best_priority = priority;
                        best_index = i;
                    }
                }
                self.queue.remove(best_index).expect("index within queue")
            }
        }
    }

    /// Start service batches while a server is idle and a full batch waits.
    ///
    /// Idempotent and cheap when nothing is enabled; invoked after every
    /// state change that could enable a start (arrival, server freed).
    fn try_start_service(&mut self, self_id: Key<StationEvent>, scheduler: &mut Scheduler) {
        let now = scheduler.time();
        while self.busy_servers < self.servers && self.queue.len() >= self.batch {
            let mut batch: Vec<(Client, f64)> = Vec::with_capacity(self.batch);
            for _ in 0..self.batch {
                let waiting = self.select_next(now);
                if let Some(id) = waiting.cancel {
                    scheduler.cancel_event(id);
                }
                let waited = now.since(waiting.enqueued_at).as_secs_f64();
                let mut client = waiting.client;
                client.add_waiting_time(waited);
                self.station_waiting.record(waited);
                batch.push((client, waited));
            }

            self.busy_servers += 1;
            self.in_service += batch.len();

            let service = {
                let client_type = batch[0].0.client_type();
                self.service_sampler(client_type).next_time()
            };
            trace!(
                batch = batch.len(),
                service = %service,
                busy = self.busy_servers,
                "Service batch started"
            );
            scheduler.schedule(
                service,
                self_id,
                StationEvent::ServiceFinished {
                    batch,
                    service_time: service.as_secs_f64(),
                },
            );
            self.sync_recorders(now);
        }
    }

    fn handle_service_finished(
        &mut self,
        self_id: Key<StationEvent>,
        batch: Vec<(Client, f64)>,
        service_time: f64,
        scheduler: &mut Scheduler,
    ) {
        let now = scheduler.time();
        self.in_service -= batch.len();

        let post = self.post_processing.as_mut().map(SamplerSlot::next_time);

        for (mut client, waited) in batch {
            client.add_service_time(service_time);
            if let Some(p) = post {
                client.add_post_processing_time(p.as_secs_f64());
            }
            self.station_service.record(service_time);
            self.station_residence.record(waited + service_time);
            self.success.record("success");
            self.next.send(scheduler, client);
        }

        match post {
            Some(p) => {
                // The server stays busy while post-processing runs.
                self.station_post_processing.record(p.as_secs_f64());
                scheduler.schedule(p, self_id, StationEvent::PostProcessingFinished);
                self.sync_recorders(now);
            }
            None => {
                self.sync_recorders(now);
                self.free_server(self_id, scheduler);
            }
        }
    }

    fn handle_patience_expired(
        &mut self,
        client_id: ClientId,
        scheduler: &mut Scheduler,
    ) {
        let now = scheduler.time();
        let position = self
            .queue
            .iter()
            .position(|waiting| waiting.client.id() == client_id)
            .expect("patience expired for a client that is not waiting");
        let waiting = self.queue.remove(position).expect("position within queue");

        let waited = now.since(waiting.enqueued_at).as_secs_f64();
        let mut client = waiting.client;
        client.add_waiting_time(waited);
        self.station_waiting.record(waited);
        self.success.record("cancel");
        debug!(client_id = %client.id(), waited, "Client abandoned the queue");
        self.next_cancel.send(scheduler, client);
        self.sync_recorders(now);
    }

    fn free_server(&mut self, self_id: Key<StationEvent>, scheduler: &mut Scheduler) {
        debug_assert!(self.busy_servers > 0, "freeing a server while none are busy");
        self.busy_servers -= 1;
        self.sync_recorders(scheduler.time());
        self.try_start_service(self_id, scheduler);
    }
}

impl Component for Process {
    type Event = StationEvent;

    fn process_event(
        &mut self,
        self_id: Key<StationEvent>,
        event: StationEvent,
        scheduler: &mut Scheduler,
    ) {
        match event {
            StationEvent::Arrive(client) => self.handle_arrival(self_id, client, scheduler),
            StationEvent::ServiceFinished {
                batch,
                service_time,
            } => self.handle_service_finished(self_id, batch, service_time, scheduler),
            StationEvent::PostProcessingFinished => self.free_server(self_id, scheduler),
            StationEvent::PatienceExpired(client_id) => {
                self.handle_patience_expired(client_id, scheduler)
            }
            other => panic!("Process cannot handle {other:?}"),
        }
    }

    fn on_start(&mut self, _self_id: Key<StationEvent>, scheduler: &mut Scheduler) {
        // Anchor the time-weighted recorders at t=0.
        self.sync_recorders(scheduler.time());
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.next.require()?;
        let cancel_path_needed = self.patience.is_some()
            || !self.patience_by_type.is_empty()
            || self.capacity.is_some();
        if cancel_path_needed {
            self.next_cancel.require()?;
        }
        Ok(())
    }
}

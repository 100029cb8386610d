//! The client token that traverses the network.

use qnetsim_core::SimTime;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier of a client within a process.
///
/// Minted from a process-wide counter so ids never collide, even across
/// multiple sources feeding the same station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(u64);

impl ClientId {
    fn next() -> Self {
        ClientId(NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Client({})", self.0)
    }
}

/// A client traversing the network.
///
/// Carries its identity, an optional type tag (used for per-type sampler
/// overrides and type-based routing), its creation time, and a ledger of
/// times accumulated while passing through stations. Ownership of a client
/// transfers with the handoff event that carries it; the station currently
/// holding it is free to mutate the ledger.
#[derive(Debug, Clone)]
pub struct Client {
    id: ClientId,
    client_type: Option<String>,
    created_at: SimTime,
    waiting: f64,
    service: f64,
    post_processing: f64,
}

impl Client {
    pub fn new(client_type: Option<String>, created_at: SimTime) -> Self {
        Self {
            id: ClientId::next(),
            client_type,
            created_at,
            waiting: 0.0,
            service: 0.0,
            post_processing: 0.0,
        }
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn client_type(&self) -> Option<&str> {
        self.client_type.as_deref()
    }

    pub fn created_at(&self) -> SimTime {
        self.created_at
    }

    /// Total time spent waiting in queues so far.
    pub fn waiting_time(&self) -> f64 {
        self.waiting
    }

    /// Total time spent in service so far.
    pub fn service_time(&self) -> f64 {
        self.service
    }

    /// Post-processing time attributed to this client's services.
    pub fn post_processing_time(&self) -> f64 {
        self.post_processing
    }

    /// Time since creation; the residence time when evaluated at disposal.
    pub fn residence_at(&self, now: SimTime) -> f64 {
        now.since(self.created_at).as_secs_f64()
    }

    pub fn add_waiting_time(&mut self, waited: f64) {
        self.waiting += waited;
    }

    pub fn add_service_time(&mut self, service: f64) {
        self.service += service;
    }

    pub fn add_post_processing_time(&mut self, post: f64) {
        self.post_processing += post;
    }
}

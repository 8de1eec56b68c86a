//! Durable collaborators of the kitchen.
//!
//! The kitchen is written once against these traits. The store is the source
//! of truth for order state; the dispatch queue is volatile and can be rebuilt
//! from it. Calls are synchronous and never made while awaiting.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::model::producer::{Producer, ProducerId};
use crate::model::worker::{Worker, WorkerId};
use crate::model::{NewOrder, Order, OrderId, OrderStats, State};

/// Role lookup for producers. Consulted once per order, at creation.
pub trait ProducerDirectory: Send + Sync {
    /// Look up a producer. Fails with `UnknownProducer` if it does not exist.
    fn lookup(&self, id: ProducerId) -> Result<Producer>;
}

/// Persisted orders.
pub trait OrderStore: Send + Sync {
    /// Insert a new `Pending` order and return it with its assigned ID.
    fn create(&self, new: NewOrder) -> Result<Order>;

    fn get(&self, id: OrderId) -> Result<Order>;

    /// Every order currently or previously bound to `worker`.
    fn get_by_worker(&self, worker: WorkerId) -> Result<Vec<Order>>;

    /// Move an order to `state`. Refuses transitions the state machine forbids.
    fn set_state(&self, id: OrderId, state: State) -> Result<()>;

    fn assign_worker(&self, id: OrderId, worker: WorkerId) -> Result<()>;

    fn clear_worker(&self, id: OrderId) -> Result<()>;

    /// Orders not yet `Done`, oldest first.
    fn list_unfinished(&self) -> Result<Vec<Order>>;

    /// Orders newest first, optionally filtered by state.
    fn list(&self, state: Option<State>, limit: usize) -> Result<Vec<Order>>;

    fn stats(&self) -> Result<OrderStats>;
}

/// Persisted worker identities.
pub trait WorkerStore: Send + Sync {
    fn save_worker(&self, worker: &Worker) -> Result<()>;

    fn set_worker_active(&self, id: WorkerId, active: bool) -> Result<()>;

    /// All workers, in registration order.
    fn list_workers(&self) -> Result<Vec<Worker>>;
}

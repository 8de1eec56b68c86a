//! The kitchen: worker registry, order assignment, polling loops.
//!
//! A [`Kitchen`] owns the dispatch queue and talks to the stores through the
//! [`storage`](crate::storage) traits. Handles are cheap to clone; every clone
//! drives the same kitchen.
//!
//! Two lock domains exist: the queue's own lock and the registry mutex. Code
//! holding the registry may call into the queue, never the other way round,
//! and neither lock is held across an `.await`.

pub mod assign;
pub mod orders;
pub mod pool;
pub mod workers;

pub use orders::RecoveryReport;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::error::{Error, Result};
use crate::model::worker::{Worker, WorkerId, WorkerStatus};
use crate::queue::DispatchQueue;
use crate::storage::{MemoryStore, OrderStore, ProducerDirectory, WorkerStore};

/// Settings the kitchen runs with.
#[derive(Debug, Clone)]
pub struct KitchenConfig {
    /// How long a cook takes to finish one order.
    pub serving_duration: Duration,
    /// Number of cooks started by default.
    pub pool_size: usize,
    /// Backoff between accept attempts when there is nothing to do.
    pub poll_interval: Duration,
}

impl Default for KitchenConfig {
    fn default() -> Self {
        Self {
            serving_duration: Duration::from_secs(10),
            pool_size: 1,
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Registry entry for one worker.
struct Slot {
    /// Registration order, used to pick workers for the pool.
    seq: u64,
    worker: Worker,
    /// Cancelled when the worker is removed. Stops its loop and its
    /// pending serving timers. Replaced on reinstatement.
    lease: CancellationToken,
    /// Liveness flag of the current polling loop, if one was started.
    alive: Option<Arc<AtomicBool>>,
}

impl Slot {
    fn is_running(&self) -> bool {
        self.alive
            .as_ref()
            .is_some_and(|alive| alive.load(Ordering::Acquire))
    }

    fn status(&self) -> WorkerStatus {
        WorkerStatus {
            worker: self.worker.clone(),
            running: self.is_running(),
        }
    }
}

#[derive(Default)]
struct Registry {
    next_seq: u64,
    slots: HashMap<WorkerId, Slot>,
}

impl Registry {
    fn insert(&mut self, worker: Worker, lease: CancellationToken) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.slots.insert(
            worker.id,
            Slot {
                seq,
                worker,
                lease,
                alive: None,
            },
        );
    }

    /// Slots in registration order.
    fn ordered(&self) -> Vec<&Slot> {
        let mut slots: Vec<&Slot> = self.slots.values().collect();
        slots.sort_by_key(|slot| slot.seq);
        slots
    }
}

/// Dispatches orders from producers to a pool of cooks.
pub struct Kitchen {
    queue: Arc<DispatchQueue>,
    orders: Arc<dyn OrderStore>,
    workers: Arc<dyn WorkerStore>,
    producers: Arc<dyn ProducerDirectory>,
    registry: Arc<Mutex<Registry>>,
    config: KitchenConfig,
    /// Cancelled on shutdown. Parent of every lease and pool token.
    root: CancellationToken,
    /// Stop signal for the polling loops currently running.
    pool: Arc<Mutex<CancellationToken>>,
    loops: TaskTracker,
    timers: TaskTracker,
    recovered: Arc<AtomicBool>,
    /// Set once an order has been submitted or bound in this run.
    in_service: Arc<AtomicBool>,
}

impl Clone for Kitchen {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
            orders: Arc::clone(&self.orders),
            workers: Arc::clone(&self.workers),
            producers: Arc::clone(&self.producers),
            registry: Arc::clone(&self.registry),
            config: self.config.clone(),
            root: self.root.clone(),
            pool: Arc::clone(&self.pool),
            loops: self.loops.clone(),
            timers: self.timers.clone(),
            recovered: Arc::clone(&self.recovered),
            in_service: Arc::clone(&self.in_service),
        }
    }
}

impl Kitchen {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        workers: Arc<dyn WorkerStore>,
        producers: Arc<dyn ProducerDirectory>,
        config: KitchenConfig,
    ) -> Self {
        let root = CancellationToken::new();
        let pool = root.child_token();
        Self {
            queue: Arc::new(DispatchQueue::new()),
            orders,
            workers,
            producers,
            registry: Arc::new(Mutex::new(Registry::default())),
            config,
            root,
            pool: Arc::new(Mutex::new(pool)),
            loops: TaskTracker::new(),
            timers: TaskTracker::new(),
            recovered: Arc::new(AtomicBool::new(false)),
            in_service: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Build a kitchen whose stores are all backed by one object.
    pub fn with_store<S>(store: Arc<S>, config: KitchenConfig) -> Self
    where
        S: OrderStore + WorkerStore + ProducerDirectory + 'static,
    {
        Self::new(store.clone(), store.clone(), store, config)
    }

    /// Kitchen over a fresh in-memory store. Returns the store so callers can
    /// add producers.
    pub fn in_memory(config: KitchenConfig) -> (Self, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (Self::with_store(Arc::clone(&store), config), store)
    }

    pub fn config(&self) -> &KitchenConfig {
        &self.config
    }

    /// The dispatch queue, for inspection.
    pub fn queue(&self) -> &DispatchQueue {
        &self.queue
    }

    pub fn queue_size(&self) -> usize {
        self.queue.size()
    }
}

/// Serving timers and polling loops are tokio tasks; spawning one outside a
/// runtime panics.
fn require_runtime() -> Result<()> {
    tokio::runtime::Handle::try_current()
        .map(|_| ())
        .map_err(|_| Error::NoRuntime)
}

//! In-memory store. Default for local runs and tests.

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::model::producer::{Producer, ProducerId};
use crate::model::worker::{Worker, WorkerId};
use crate::model::{NewOrder, Order, OrderId, OrderStats, State, Tier};

use super::{OrderStore, ProducerDirectory, WorkerStore};

#[derive(Default)]
struct Orders {
    next_seq: u64,
    /// Insertion sequence -> order. Iteration order is creation order.
    by_seq: BTreeMap<u64, Order>,
    seq_of: HashMap<OrderId, u64>,
}

impl Orders {
    fn get_mut(&mut self, id: OrderId) -> Result<&mut Order> {
        let seq = self.seq_of.get(&id).ok_or(Error::OrderNotFound(id))?;
        self.by_seq.get_mut(seq).ok_or(Error::OrderNotFound(id))
    }
}

/// Thread-safe in-memory implementation of every storage trait.
#[derive(Default)]
pub struct MemoryStore {
    orders: RwLock<Orders>,
    workers: RwLock<Vec<Worker>>,
    producers: RwLock<HashMap<ProducerId, Producer>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a producer and return it.
    pub fn add_producer(&self, name: impl Into<String>, tier: Tier) -> Producer {
        let producer = Producer::new(name, tier);
        self.producers.write().insert(producer.id, producer.clone());
        producer
    }

    /// Retire a producer so it can no longer submit orders.
    pub fn retire_producer(&self, id: ProducerId) -> Result<()> {
        let mut producers = self.producers.write();
        let producer = producers.get_mut(&id).ok_or(Error::UnknownProducer(id))?;
        producer.retired = true;
        Ok(())
    }
}

impl ProducerDirectory for MemoryStore {
    fn lookup(&self, id: ProducerId) -> Result<Producer> {
        self.producers
            .read()
            .get(&id)
            .cloned()
            .ok_or(Error::UnknownProducer(id))
    }
}

impl OrderStore for MemoryStore {
    fn create(&self, new: NewOrder) -> Result<Order> {
        let now = Utc::now();
        let order = Order {
            id: OrderId::new(),
            producer: new.producer,
            tier: new.tier,
            state: State::Pending,
            worker: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };

        let mut orders = self.orders.write();
        let seq = orders.next_seq;
        orders.next_seq += 1;
        orders.seq_of.insert(order.id, seq);
        orders.by_seq.insert(seq, order.clone());
        Ok(order)
    }

    fn get(&self, id: OrderId) -> Result<Order> {
        let orders = self.orders.read();
        orders
            .seq_of
            .get(&id)
            .and_then(|seq| orders.by_seq.get(seq))
            .cloned()
            .ok_or(Error::OrderNotFound(id))
    }

    fn get_by_worker(&self, worker: WorkerId) -> Result<Vec<Order>> {
        Ok(self
            .orders
            .read()
            .by_seq
            .values()
            .filter(|o| o.worker == Some(worker))
            .cloned()
            .collect())
    }

    fn set_state(&self, id: OrderId, state: State) -> Result<()> {
        let mut orders = self.orders.write();
        let order = orders.get_mut(id)?;
        if !order.state.can_transition_to(state) {
            return Err(Error::InvalidTransition {
                from: order.state,
                to: state,
            });
        }

        let now = Utc::now();
        order.state = state;
        order.updated_at = now;
        if state.is_terminal() {
            order.completed_at = Some(now);
        }
        Ok(())
    }

    fn assign_worker(&self, id: OrderId, worker: WorkerId) -> Result<()> {
        let mut orders = self.orders.write();
        let order = orders.get_mut(id)?;
        order.worker = Some(worker);
        order.updated_at = Utc::now();
        Ok(())
    }

    fn clear_worker(&self, id: OrderId) -> Result<()> {
        let mut orders = self.orders.write();
        let order = orders.get_mut(id)?;
        order.worker = None;
        order.updated_at = Utc::now();
        Ok(())
    }

    fn list_unfinished(&self) -> Result<Vec<Order>> {
        Ok(self
            .orders
            .read()
            .by_seq
            .values()
            .filter(|o| !o.state.is_terminal())
            .cloned()
            .collect())
    }

    fn list(&self, state: Option<State>, limit: usize) -> Result<Vec<Order>> {
        Ok(self
            .orders
            .read()
            .by_seq
            .values()
            .rev()
            .filter(|o| state.is_none_or(|s| o.state == s))
            .take(limit)
            .cloned()
            .collect())
    }

    fn stats(&self) -> Result<OrderStats> {
        let orders = self.orders.read();
        let completed = orders
            .by_seq
            .values()
            .filter(|o| o.state.is_terminal())
            .count() as u64;
        Ok(OrderStats {
            completed,
            incomplete: orders.by_seq.len() as u64 - completed,
        })
    }
}

impl WorkerStore for MemoryStore {
    fn save_worker(&self, worker: &Worker) -> Result<()> {
        let mut workers = self.workers.write();
        match workers.iter_mut().find(|w| w.id == worker.id) {
            Some(existing) => *existing = worker.clone(),
            None => workers.push(worker.clone()),
        }
        Ok(())
    }

    fn set_worker_active(&self, id: WorkerId, active: bool) -> Result<()> {
        let mut workers = self.workers.write();
        let worker = workers
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or(Error::UnknownWorker(id))?;
        worker.active = active;
        Ok(())
    }

    fn list_workers(&self) -> Result<Vec<Worker>> {
        Ok(self.workers.read().clone())
    }
}

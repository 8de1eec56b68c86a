//! Worker lifecycle: register, remove, reinstate.

use chrono::Utc;
use tracing::{error, info, warn};

use crate::error::{Error, Result};
use crate::model::worker::{Worker, WorkerId, WorkerStatus};
use crate::model::{Order, OrderId, State};
use crate::telemetry::metrics;
use opentelemetry::KeyValue;

impl super::Kitchen {
    /// Register a new worker. It starts active, with no polling loop.
    pub fn register_worker(&self, name: impl Into<String>) -> Result<Worker> {
        let worker = Worker {
            id: WorkerId::new(),
            name: name.into(),
            active: true,
            created_at: Utc::now(),
        };

        let mut registry = self.registry.lock();
        registry.insert(worker.clone(), self.root.child_token());

        if let Err(e) = self.workers.save_worker(&worker) {
            registry.slots.remove(&worker.id);
            error!(worker_id = %worker.id, op = "register_worker", error = %e, "failed to persist worker");
            return Err(e);
        }

        metrics::worker_lifecycle().add(1, &[KeyValue::new("event", "registered")]);
        info!(worker_id = %worker.id, name = %worker.name, "worker registered");
        Ok(worker)
    }

    /// Remove a worker and put every order it was cooking back at the front
    /// of its tier. Returns the IDs of the orders that were re-queued.
    ///
    /// Per-order failures are logged and skipped; such an order stays
    /// `InProgress` under the now-inactive worker, visible in the store.
    pub fn remove_worker(&self, id: WorkerId) -> Result<Vec<OrderId>> {
        let mut registry = self.registry.lock();
        let slot = registry
            .slots
            .get_mut(&id)
            .ok_or(Error::UnknownWorker(id))?;
        if !slot.worker.active {
            return Err(Error::AlreadyRemoved(id));
        }

        // Stops the loop at its next suspension point and cancels serving timers.
        slot.lease.cancel();

        let requeued = match self.orders.get_by_worker(id) {
            Ok(held) => Ok(self.requeue_held(id, held)),
            Err(e) => {
                error!(worker_id = %id, op = "get_by_worker", error = %e, "failed to load orders of removed worker");
                Err(e)
            }
        };

        slot.worker.active = false;
        if let Err(e) = self.workers.set_worker_active(id, false) {
            error!(worker_id = %id, op = "set_worker_active", error = %e, "failed to persist worker removal");
        }
        let name = slot.worker.name.clone();
        drop(registry);

        metrics::worker_lifecycle().add(1, &[KeyValue::new("event", "removed")]);
        let requeued = requeued?;
        info!(
            worker_id = %id,
            name = %name,
            requeued = requeued.len(),
            queue_size = self.queue.size(),
            "worker removed"
        );
        Ok(requeued)
    }

    /// Re-queue the in-progress orders of a removed worker, oldest first so
    /// they keep their relative order at the head of the tier.
    fn requeue_held(&self, worker: WorkerId, held: Vec<Order>) -> Vec<OrderId> {
        let mut requeued = Vec::new();
        let mut held: Vec<Order> = held
            .into_iter()
            .filter(|o| o.state == State::InProgress)
            .collect();
        held.sort_by_key(|o| o.created_at);

        for order in held {
            match self.return_to_queue(order) {
                Ok(id) => {
                    info!(order_id = %id, worker_id = %worker, "order returned to queue front");
                    requeued.push(id);
                }
                Err((id, op, e)) => {
                    error!(order_id = %id, worker_id = %worker, op, error = %e, "failed to re-queue order");
                }
            }
        }
        requeued
    }

    /// InProgress -> Pending, unassign, front of tier.
    fn return_to_queue(
        &self,
        mut order: Order,
    ) -> std::result::Result<OrderId, (OrderId, &'static str, Error)> {
        let id = order.id;
        self.orders
            .set_state(id, State::Pending)
            .map_err(|e| (id, "set_state", e))?;
        self.orders
            .clear_worker(id)
            .map_err(|e| (id, "clear_worker", e))?;

        order.state = State::Pending;
        order.worker = None;
        order.updated_at = Utc::now();
        let tier = order.tier;
        self.queue
            .enqueue_front(order)
            .map_err(|e| (id, "enqueue_front", e))?;

        metrics::orders_requeued().add(1, &[KeyValue::new("tier", tier.to_string())]);
        Ok(id)
    }

    /// Make a removed worker eligible for new orders again. Does not start
    /// a polling loop.
    pub fn reinstate_worker(&self, id: WorkerId) -> Result<Worker> {
        let mut registry = self.registry.lock();
        let slot = registry
            .slots
            .get_mut(&id)
            .ok_or(Error::UnknownWorker(id))?;
        if slot.worker.active {
            return Err(Error::NotRemoved(id));
        }

        slot.worker.active = true;
        let previous = std::mem::replace(&mut slot.lease, self.root.child_token());

        if let Err(e) = self.workers.set_worker_active(id, true) {
            slot.worker.active = false;
            slot.lease = previous;
            error!(worker_id = %id, op = "set_worker_active", error = %e, "failed to persist reinstatement");
            return Err(e);
        }

        metrics::worker_lifecycle().add(1, &[KeyValue::new("event", "reinstated")]);
        if slot.is_running() {
            warn!(worker_id = %id, "previous loop has not exited yet");
        }
        info!(worker_id = %id, name = %slot.worker.name, "worker reinstated");
        Ok(slot.worker.clone())
    }

    pub fn worker(&self, id: WorkerId) -> Result<WorkerStatus> {
        self.registry
            .lock()
            .slots
            .get(&id)
            .map(|slot| slot.status())
            .ok_or(Error::UnknownWorker(id))
    }

    /// All registered workers, in registration order.
    pub fn workers(&self) -> Vec<WorkerStatus> {
        self.registry
            .lock()
            .ordered()
            .into_iter()
            .map(|slot| slot.status())
            .collect()
    }

    /// Whether a polling loop is alive for this worker.
    pub fn is_running(&self, id: WorkerId) -> bool {
        self.registry
            .lock()
            .slots
            .get(&id)
            .is_some_and(|slot| slot.is_running())
    }
}

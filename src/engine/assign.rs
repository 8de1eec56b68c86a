//! Assignment protocol: bind the next order to a worker, serve it, finish it.

use std::sync::atomic::Ordering;

use chrono::Utc;
use opentelemetry::KeyValue;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info};

use crate::error::{Error, Result};
use crate::model::worker::WorkerId;
use crate::model::{Order, OrderId, State};
use crate::telemetry::metrics;
use crate::telemetry::order::{record_state_transition, start_order_span};

impl super::Kitchen {
    /// Take the next order off the queue and bind it to `worker_id`.
    ///
    /// On success the order is `InProgress` and a serving timer is running;
    /// after `serving_duration` it is marked `Done`. If the binding cannot be
    /// persisted the order goes back to the front of its tier and the error
    /// is returned.
    ///
    /// Fails with `NoRuntime`, leaving the queue untouched, when called
    /// outside a tokio runtime.
    pub fn accept_next(&self, worker_id: WorkerId) -> Result<Order> {
        self.accept_serving(worker_id).map(|(order, _serving)| order)
    }

    /// Like [`accept_next`](Self::accept_next), also returning the serving
    /// task so a polling loop can wait for its cook to finish.
    pub(super) fn accept_serving(&self, worker_id: WorkerId) -> Result<(Order, JoinHandle<()>)> {
        super::require_runtime()?;

        let registry = self.registry.lock();
        let slot = registry
            .slots
            .get(&worker_id)
            .ok_or(Error::UnknownWorker(worker_id))?;
        if !slot.worker.active {
            return Err(Error::WorkerInactive(worker_id));
        }

        let mut order = self.queue.dequeue()?;

        if let Err((op, e)) = self.bind(order.id, worker_id) {
            error!(order_id = %order.id, worker_id = %worker_id, op, error = %e, "failed to bind order, returning it to queue front");
            let id = order.id;
            if let Err(requeue) = self.queue.enqueue_front(order) {
                error!(order_id = %id, worker_id = %worker_id, op = "enqueue_front", error = %requeue, "order lost from queue");
            }
            return Err(e);
        }

        self.in_service.store(true, Ordering::Release);
        let lease = slot.lease.clone();
        drop(registry);

        let waited_ms = (Utc::now() - order.created_at).num_milliseconds().max(0) as f64;
        order.state = State::InProgress;
        order.worker = Some(worker_id);
        order.updated_at = Utc::now();

        metrics::orders_accepted().add(1, &[KeyValue::new("tier", order.tier.to_string())]);
        metrics::order_wait_ms().record(waited_ms, &[KeyValue::new("tier", order.tier.to_string())]);
        info!(
            order_id = %order.id,
            worker_id = %worker_id,
            tier = %order.tier,
            queue_size = self.queue.size(),
            "order accepted"
        );

        let serving = self.spawn_serving(&order, worker_id, lease);
        Ok((order, serving))
    }

    /// Persist the binding. On a partial failure the worker assignment is
    /// undone so the order reads as plain `Pending` again.
    fn bind(&self, id: OrderId, worker_id: WorkerId) -> std::result::Result<(), (&'static str, Error)> {
        self.orders
            .assign_worker(id, worker_id)
            .map_err(|e| ("assign_worker", e))?;

        if let Err(e) = self.orders.set_state(id, State::InProgress) {
            if let Err(undo) = self.orders.clear_worker(id) {
                error!(order_id = %id, worker_id = %worker_id, op = "clear_worker", error = %undo, "failed to undo worker assignment");
            }
            return Err(("set_state", e));
        }
        Ok(())
    }

    /// Start the serving timer for a freshly bound order.
    fn spawn_serving(
        &self,
        order: &Order,
        worker_id: WorkerId,
        lease: CancellationToken,
    ) -> JoinHandle<()> {
        let kitchen = self.clone();
        let span = start_order_span(order);
        record_state_transition(&span, State::Pending, State::InProgress);
        let id = order.id;
        let duration = self.config.serving_duration;

        self.timers.spawn(
            async move {
                tokio::select! {
                    _ = lease.cancelled() => {
                        debug!(order_id = %id, worker_id = %worker_id, "serving cancelled");
                        return;
                    }
                    _ = tokio::time::sleep(duration) => {}
                }
                if kitchen.finish(id, worker_id, &lease) {
                    record_state_transition(&tracing::Span::current(), State::InProgress, State::Done);
                }
            }
            .instrument(span),
        )
    }

    /// Mark a served order `Done`, unless its worker was removed meanwhile.
    fn finish(&self, id: OrderId, worker_id: WorkerId, lease: &CancellationToken) -> bool {
        // Removal cancels the lease while holding the registry, so checking
        // under the same lock settles the race with a concurrent re-queue.
        let _registry = self.registry.lock();
        if lease.is_cancelled() {
            debug!(order_id = %id, worker_id = %worker_id, "worker removed before serving finished");
            return false;
        }

        match self.orders.set_state(id, State::Done) {
            Ok(()) => {
                metrics::orders_completed().add(1, &[]);
                info!(order_id = %id, worker_id = %worker_id, "order completed");
                true
            }
            Err(e) => {
                error!(order_id = %id, worker_id = %worker_id, op = "set_state", error = %e, "failed to complete order");
                false
            }
        }
    }
}

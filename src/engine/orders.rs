//! Order intake, inspection, and queue recovery from the store.

use std::sync::atomic::Ordering;

use opentelemetry::KeyValue;
use tracing::{error, info};

use crate::error::{Error, Result};
use crate::model::producer::ProducerId;
use crate::model::{NewOrder, Order, OrderId, OrderStats, State};
use crate::telemetry::metrics;

/// What [`Kitchen::recover`](super::Kitchen::recover) rebuilt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Workers loaded into the registry.
    pub workers: usize,
    /// Unfinished orders put back in the queue.
    pub orders: usize,
    /// Of those, orders that were `InProgress` when the previous run ended.
    pub interrupted: usize,
    /// Unfinished orders that could not be restored and stay out of the queue.
    pub skipped: usize,
}

impl super::Kitchen {
    /// Submit an order for `producer`. Its tier comes from the producer's
    /// role, looked up once here.
    pub fn submit_order(&self, producer: ProducerId) -> Result<Order> {
        let producer = self.producers.lookup(producer)?;
        if producer.retired {
            return Err(Error::ProducerRetired(producer.id));
        }

        // Serializes intake with `recover`, which holds the registry too.
        let registry = self.registry.lock();
        self.in_service.store(true, Ordering::Release);

        let order = self
            .orders
            .create(NewOrder::new(producer.id, producer.tier))
            .inspect_err(|e| {
                error!(producer_id = %producer.id, op = "create", error = %e, "failed to persist order");
            })?;

        if let Err(e) = self.queue.enqueue(order.clone()) {
            error!(order_id = %order.id, op = "enqueue", error = %e, "failed to enqueue order");
            return Err(e);
        }
        drop(registry);

        metrics::orders_submitted().add(1, &[KeyValue::new("tier", order.tier.to_string())]);
        info!(
            order_id = %order.id,
            producer = %producer.name,
            tier = %order.tier,
            queue_size = self.queue.size(),
            "order submitted"
        );
        Ok(order)
    }

    /// Rebuild volatile state from the stores after a restart: load the
    /// persisted workers and queue every unfinished order in creation order.
    /// Orders that were being cooked when the previous run stopped go back to
    /// `Pending`.
    ///
    /// Only a fresh kitchen can recover: once an order has been submitted or
    /// bound in this run the call is refused. An order that cannot be
    /// restored is logged and skipped. If the stores cannot be read at all
    /// the call may be retried.
    pub fn recover(&self) -> Result<RecoveryReport> {
        // Held for the whole pass so no order is bound meanwhile.
        let mut registry = self.registry.lock();
        if self.recovered.load(Ordering::Acquire) {
            return Err(Error::Other("kitchen already recovered".to_string()));
        }
        if self.in_service.load(Ordering::Acquire) || !self.queue.is_empty() {
            return Err(Error::Other(
                "recover must run on a fresh kitchen".to_string(),
            ));
        }

        let persisted = self.workers.list_workers()?;
        let unfinished = self.orders.list_unfinished()?;

        let mut report = RecoveryReport::default();
        for worker in persisted {
            if registry.slots.contains_key(&worker.id) {
                continue;
            }
            let lease = self.root.child_token();
            if !worker.active {
                lease.cancel();
            }
            registry.insert(worker, lease);
            report.workers += 1;
        }

        for order in unfinished {
            let id = order.id;
            match self.restore(order) {
                Ok(interrupted) => {
                    report.orders += 1;
                    if interrupted {
                        report.interrupted += 1;
                    }
                }
                Err((op, e)) => {
                    error!(order_id = %id, op, error = %e, "failed to restore order");
                    report.skipped += 1;
                }
            }
        }
        self.recovered.store(true, Ordering::Release);
        drop(registry);

        info!(
            workers = report.workers,
            orders = report.orders,
            interrupted = report.interrupted,
            skipped = report.skipped,
            "kitchen recovered"
        );
        Ok(report)
    }

    /// Put one unfinished order back in the queue. Returns whether it had
    /// been interrupted mid-serving.
    fn restore(&self, mut order: Order) -> std::result::Result<bool, (&'static str, Error)> {
        let interrupted = order.state == State::InProgress;
        if interrupted {
            self.orders
                .set_state(order.id, State::Pending)
                .map_err(|e| ("set_state", e))?;
            order.state = State::Pending;
        }
        if order.worker.is_some() {
            self.orders
                .clear_worker(order.id)
                .map_err(|e| ("clear_worker", e))?;
            order.worker = None;
        }
        self.queue.enqueue(order).map_err(|e| ("enqueue", e))?;
        Ok(interrupted)
    }

    pub fn order(&self, id: OrderId) -> Result<Order> {
        self.orders.get(id)
    }

    /// Orders newest first, optionally filtered by state.
    pub fn list_orders(&self, state: Option<State>, limit: usize) -> Result<Vec<Order>> {
        self.orders.list(state, limit)
    }

    pub fn stats(&self) -> Result<OrderStats> {
        self.orders.stats()
    }
}

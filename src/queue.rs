//! Two-tier dispatch queue.
//!
//! Privileged orders drain fully ahead of standard ones; within a tier orders
//! leave in arrival order. Orders put back by [`DispatchQueue::enqueue_front`]
//! form a FIFO run at the head of their tier, so an order whose cook went away
//! is served before anything that arrived normally, but after orders that were
//! put back before it.
//!
//! One lock covers both tiers and the size counter. Reads share it,
//! mutations take it exclusively.

use std::collections::VecDeque;

use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::model::{Order, Tier};

/// Slots pre-allocated per tier, and the slack kept after compaction.
const BASELINE_CAPACITY: usize = 1000;

/// A tier is compacted once its spare capacity exceeds this many baselines.
const COMPACT_FACTOR: usize = 4;

#[derive(Debug)]
struct Lane {
    orders: VecDeque<Order>,
    /// How many orders at the head were put back with `enqueue_front`.
    requeued: usize,
}

impl Lane {
    fn new() -> Self {
        Self {
            orders: VecDeque::with_capacity(BASELINE_CAPACITY),
            requeued: 0,
        }
    }

    fn pop(&mut self) -> Option<Order> {
        let order = self.orders.pop_front()?;
        self.requeued = self.requeued.saturating_sub(1);
        self.compact();
        Some(order)
    }

    fn compact(&mut self) {
        let slack = self.orders.capacity() - self.orders.len();
        if slack > COMPACT_FACTOR * BASELINE_CAPACITY {
            self.orders.shrink_to(self.orders.len() + BASELINE_CAPACITY);
        }
    }
}

#[derive(Debug)]
struct Lanes {
    privileged: Lane,
    standard: Lane,
    size: usize,
}

impl Lanes {
    fn lane_mut(&mut self, tier: Tier) -> &mut Lane {
        match tier {
            Tier::Privileged => &mut self.privileged,
            Tier::Standard => &mut self.standard,
        }
    }

    fn lane(&self, tier: Tier) -> &Lane {
        match tier {
            Tier::Privileged => &self.privileged,
            Tier::Standard => &self.standard,
        }
    }
}

/// Concurrency-safe priority + FIFO order queue.
#[derive(Debug)]
pub struct DispatchQueue {
    lanes: RwLock<Lanes>,
}

impl Default for DispatchQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchQueue {
    pub fn new() -> Self {
        Self {
            lanes: RwLock::new(Lanes {
                privileged: Lane::new(),
                standard: Lane::new(),
                size: 0,
            }),
        }
    }

    /// Append an order to the tail of its tier.
    pub fn enqueue(&self, order: Order) -> Result<()> {
        validate(&order)?;

        let mut lanes = self.lanes.write();
        lanes.lane_mut(order.tier).orders.push_back(order);
        lanes.size += 1;
        Ok(())
    }

    /// Put an order back at the head of its tier, behind any orders that
    /// were put back earlier and are still waiting.
    pub fn enqueue_front(&self, order: Order) -> Result<()> {
        validate(&order)?;

        let mut lanes = self.lanes.write();
        let lane = lanes.lane_mut(order.tier);
        let at = lane.requeued;
        lane.orders.insert(at, order);
        lane.requeued += 1;
        lanes.size += 1;
        Ok(())
    }

    /// Remove and return the next order: privileged head first, then standard.
    pub fn dequeue(&self) -> Result<Order> {
        let mut lanes = self.lanes.write();
        if lanes.size == 0 {
            return Err(Error::EmptyQueue);
        }

        let order = match lanes.privileged.pop() {
            Some(order) => order,
            None => lanes.standard.pop().ok_or(Error::EmptyQueue)?,
        };
        lanes.size -= 1;
        Ok(order)
    }

    /// The order `dequeue` would return, without removing it.
    pub fn peek(&self) -> Result<Order> {
        let lanes = self.lanes.read();
        lanes
            .privileged
            .orders
            .front()
            .or_else(|| lanes.standard.orders.front())
            .cloned()
            .ok_or(Error::EmptyQueue)
    }

    pub fn size(&self) -> usize {
        self.lanes.read().size
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.read().size == 0
    }

    /// Number of orders waiting in one tier.
    pub fn tier_len(&self, tier: Tier) -> usize {
        self.lanes.read().lane(tier).orders.len()
    }
}

fn validate(order: &Order) -> Result<()> {
    if order.id.is_nil() {
        return Err(Error::InvalidItem("order has no id".to_string()));
    }
    if !order.is_queueable() {
        return Err(Error::InvalidItem(format!(
            "order {} is {} (worker: {:?}), only unassigned pending orders can be queued",
            order.id, order.state, order.worker
        )));
    }
    Ok(())
}

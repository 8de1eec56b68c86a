//! Core data model.
//!
//! An order is a unit of work submitted by a producer (customer) and cooked
//! by a worker (cook). Its tier is stamped from the producer's role when it is
//! created and never changes afterwards.

pub mod producer;
pub mod worker;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use producer::ProducerId;
use worker::WorkerId;

// ---------------------------------------------------------------------------
// Order
// ---------------------------------------------------------------------------

/// A unit of dispatched work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Unique identifier, assigned by the order store.
    pub id: OrderId,

    /// The producer that submitted this order.
    pub producer: ProducerId,

    /// Priority tier, fixed at creation.
    pub tier: Tier,

    /// Current lifecycle state.
    pub state: State,

    /// Worker holding the order. Set exactly while `state` is `InProgress`;
    /// a finished order keeps the worker that completed it.
    pub worker: Option<WorkerId>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Can this order sit in the dispatch queue?
    pub fn is_queueable(&self) -> bool {
        !self.id.is_nil() && self.state == State::Pending && self.worker.is_none()
    }
}

/// Newtype for order IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub Uuid);

impl OrderId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for OrderId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

// ---------------------------------------------------------------------------
// Tier
// ---------------------------------------------------------------------------

/// Priority class. Privileged orders always drain ahead of standard ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// VIP customers.
    Privileged,
    /// Regular customers.
    Standard,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Tier::Privileged => "privileged",
            Tier::Standard => "standard",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "privileged" | "vip" => Ok(Tier::Privileged),
            "standard" | "regular" => Ok(Tier::Standard),
            _ => Err(format!("invalid tier: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Lifecycle state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    /// Waiting in the queue for a worker.
    Pending,
    /// Bound to a worker, cooking.
    InProgress,
    /// Finished. Terminal.
    Done,
}

impl State {
    /// Can transition from self to `to`?
    pub fn can_transition_to(self, to: State) -> bool {
        use State::*;
        matches!(
            (self, to),
            (Pending, InProgress)
                | (InProgress, Done)
                | (InProgress, Pending) // worker removed, re-queue
        )
    }

    /// Is this a terminal state?
    pub fn is_terminal(self) -> bool {
        matches!(self, State::Done)
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            State::Pending => "pending",
            State::InProgress => "in_progress",
            State::Done => "done",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for State {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(State::Pending),
            "in_progress" => Ok(State::InProgress),
            "done" => Ok(State::Done),
            _ => Err(format!("unknown state: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Parameters for creating an order. The store assigns the ID.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub producer: ProducerId,
    pub tier: Tier,
}

impl NewOrder {
    pub fn new(producer: ProducerId, tier: Tier) -> Self {
        Self { producer, tier }
    }
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Completed vs. not-yet-completed order counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStats {
    pub completed: u64,
    pub incomplete: u64,
}

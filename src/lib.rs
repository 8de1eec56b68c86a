//! # kiosk-rs
//!
//! Two-tier order dispatch for a restaurant kiosk.
//!
//! Orders from privileged producers are served before standard ones, FIFO
//! within each tier. A pool of cooks pulls orders from the [`queue`], serves
//! each for a fixed duration and marks it done. Removing a cook puts its
//! unfinished orders back at the front of their tier. Orders and workers are
//! persisted through the [`storage`] traits, in memory or in SQLite.

pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod queue;
pub mod storage;
pub mod telemetry;

//! Metric instruments for the kitchen.
//!
//! Created from the globally registered `MeterProvider`, so they are no-ops
//! until telemetry is initialized with an OTLP endpoint.

use opentelemetry::metrics::{Counter, Histogram, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("kiosk-rs")
}

/// Counter: orders accepted into the queue.
/// Labels: `tier`.
pub fn orders_submitted() -> Counter<u64> {
    meter()
        .u64_counter("kiosk.orders.submitted")
        .with_description("Number of orders submitted")
        .build()
}

/// Counter: orders bound to a worker.
/// Labels: `tier`.
pub fn orders_accepted() -> Counter<u64> {
    meter()
        .u64_counter("kiosk.orders.accepted")
        .with_description("Number of orders bound to a worker")
        .build()
}

/// Counter: orders marked done.
pub fn orders_completed() -> Counter<u64> {
    meter()
        .u64_counter("kiosk.orders.completed")
        .with_description("Number of orders completed")
        .build()
}

/// Counter: orders returned to the front of the queue after their worker
/// was removed.
/// Labels: `tier`.
pub fn orders_requeued() -> Counter<u64> {
    meter()
        .u64_counter("kiosk.orders.requeued")
        .with_description("Number of orders re-queued after worker removal")
        .build()
}

/// Counter: worker lifecycle events.
/// Labels: `event` ("registered" | "removed" | "reinstated").
pub fn worker_lifecycle() -> Counter<u64> {
    meter()
        .u64_counter("kiosk.workers.lifecycle")
        .with_description("Worker registrations, removals and reinstatements")
        .build()
}

/// Histogram: time from order creation to acceptance.
/// Labels: `tier`.
pub fn order_wait_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("kiosk.order.wait_ms")
        .with_description("Time an order waited before a worker accepted it")
        .with_unit("ms")
        .build()
}

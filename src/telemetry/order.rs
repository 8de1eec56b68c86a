//! Order lifecycle span helpers.

use tracing::Span;

use crate::model::{Order, State};

/// Start a span covering an order's time with a worker.
pub fn start_order_span(order: &Order) -> Span {
    let span = tracing::info_span!(
        "order.serve",
        "order.id" = %order.id,
        "order.tier" = %order.tier,
        "order.worker" = tracing::field::Empty,
    );
    if let Some(worker) = order.worker {
        span.record("order.worker", tracing::field::display(worker));
    }
    span
}

/// Emit a state transition event scoped to the given span.
pub fn record_state_transition(span: &Span, from: State, to: State) {
    span.in_scope(|| {
        tracing::info!(from = %from, to = %to, "state_transition");
    });
}

//! Integration tests for telemetry initialization and span helpers.

use kiosk_rs::model::producer::ProducerId;
use kiosk_rs::model::worker::WorkerId;
use kiosk_rs::model::{Order, OrderId, State, Tier};
use kiosk_rs::telemetry::metrics;
use kiosk_rs::telemetry::order::{record_state_transition, start_order_span};
use kiosk_rs::telemetry::{TelemetryConfig, init_telemetry};

#[test]
fn telemetry_initializes_without_endpoint() {
    // A global subscriber can only be set once per process, so a second
    // initialization in the same binary may return Err.
    let _guard = init_telemetry(TelemetryConfig {
        endpoint: None,
        service_name: "kiosk-test".to_string(),
        log_level: "debug".to_string(),
    });
}

#[test]
fn order_span_records_transitions() {
    let now = chrono::Utc::now();
    let order = Order {
        id: OrderId::new(),
        producer: ProducerId::new(),
        tier: Tier::Privileged,
        state: State::InProgress,
        worker: Some(WorkerId::new()),
        created_at: now,
        updated_at: now,
        completed_at: None,
    };

    let span = start_order_span(&order);
    record_state_transition(&span, State::Pending, State::InProgress);
    record_state_transition(&span, State::InProgress, State::Done);
}

#[test]
fn metric_instruments_are_usable_without_a_provider() {
    let tier = opentelemetry::KeyValue::new("tier", "standard");
    metrics::orders_submitted().add(1, std::slice::from_ref(&tier));
    metrics::orders_accepted().add(1, std::slice::from_ref(&tier));
    metrics::orders_completed().add(1, &[]);
    metrics::orders_requeued().add(1, std::slice::from_ref(&tier));
    metrics::worker_lifecycle().add(1, &[opentelemetry::KeyValue::new("event", "registered")]);
    metrics::order_wait_ms().record(12.5, &[tier]);
}

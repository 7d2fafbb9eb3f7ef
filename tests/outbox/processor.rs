use std::sync::Arc;

use chrono::{TimeZone, Utc};
use outbox_relay::{
    EventRegistry, InMemoryOutboxStore, ManualClock, OutboxProcessor, OutboxRepository,
    OutboxRow, OutboxStore, ProcessError, RowError,
};
use serde_json::json;
use uuid::Uuid;

use crate::support::{
    init_tracing, insert_row, registry, Customer, FaultyStore, Order, OrderPlaced,
    RecordingPublisher,
};

fn seeded_store() -> InMemoryOutboxStore {
    let repo = OutboxRepository::new(InMemoryOutboxStore::new());
    let mut first = Order::place("order-1", "cust-1", 100);
    first.ship("ups");
    repo.commit(&mut first).unwrap();
    let mut second = Order::place("order-2", "cust-2", 200);
    repo.commit(&mut second).unwrap();
    repo.store().clone()
}

#[test]
fn unresolvable_row_does_not_block_its_neighbours() {
    init_tracing();
    let store = seeded_store();
    let publisher = RecordingPublisher::new();
    let only_orders_placed = Arc::new(EventRegistry::new().register::<OrderPlaced>());
    let mut processor = OutboxProcessor::new(store.clone(), publisher.clone(), only_orders_placed);

    let report = processor.run_once().unwrap();

    assert_eq!(report.fetched, 3);
    assert_eq!(report.published, 2);
    assert_eq!(report.unresolved, 1);

    let rows = store.rows().unwrap();
    assert!(rows[0].processed_at.is_some());
    assert!(rows[0].last_error.is_none());
    assert!(rows[1].processed_at.is_none());
    assert_eq!(
        rows[1].last_error.as_deref(),
        Some("unknown event type 'OrderShipped'")
    );
    assert!(rows[2].processed_at.is_some());
    assert_eq!(publisher.delivered_types(), ["OrderPlaced", "OrderPlaced"]);
}

#[test]
fn rows_are_published_in_occurrence_order() {
    let store = InMemoryOutboxStore::new();
    let late_clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap());
    let early_clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap());

    let late = OutboxRepository::with_clock(store.clone(), Arc::new(late_clock));
    late.commit(&mut Order::place("late", "cust-1", 1)).unwrap();
    let early = OutboxRepository::with_clock(store.clone(), Arc::new(early_clock));
    early
        .commit(&mut Customer::register("early", "early@example.com"))
        .unwrap();

    let publisher = RecordingPublisher::new();
    let mut processor = OutboxProcessor::new(store, publisher.clone(), registry());
    processor.run_once().unwrap();

    assert_eq!(publisher.delivered_types(), ["CustomerRegistered", "OrderPlaced"]);
}

#[test]
fn publish_failure_is_recorded_and_retried_next_run() {
    init_tracing();
    let store = seeded_store();
    let publisher = RecordingPublisher::new();
    publisher.reject_type("OrderShipped");
    let mut processor = OutboxProcessor::new(store.clone(), publisher.clone(), registry());

    let report = processor.run_once().unwrap();
    assert_eq!(report.published, 2);
    assert_eq!(report.publish_failed, 1);

    let shipped = store
        .rows()
        .unwrap()
        .into_iter()
        .find(|r| r.event_type == "OrderShipped")
        .unwrap();
    assert!(shipped.processed_at.is_none());
    assert_eq!(
        shipped.last_error.as_deref(),
        Some("publish failed (BusError): bus rejected OrderShipped")
    );

    // Still failing: the row stays eligible and is attempted again.
    let report = processor.run_once().unwrap();
    assert_eq!(report.fetched, 1);
    assert_eq!(report.publish_failed, 1);

    let healthy = RecordingPublisher::new();
    let mut processor = OutboxProcessor::new(store.clone(), healthy.clone(), registry());
    let report = processor.run_once().unwrap();
    assert_eq!(report.published, 1);

    let shipped = store.get_row(shipped.id).unwrap().unwrap();
    assert!(shipped.processed_at.is_some());
    assert!(shipped.last_error.is_none());
    assert_eq!(store.pending_count().unwrap(), 0);
}

#[test]
fn bus_outage_fails_every_row_but_keeps_them_pending() {
    let store = seeded_store();
    let publisher = RecordingPublisher::new();
    publisher.set_down(true);
    let mut processor = OutboxProcessor::new(store.clone(), publisher.clone(), registry());

    let report = processor.run_once().unwrap();
    assert_eq!(report.publish_failed, 3);
    assert_eq!(store.pending_count().unwrap(), 3);
    assert!(store.rows().unwrap().iter().all(|r| r.last_error.is_some()));

    publisher.set_down(false);
    let report = processor.run_once().unwrap();
    assert_eq!(report.published, 3);
    assert_eq!(store.pending_count().unwrap(), 0);
}

#[test]
fn crash_between_publish_and_mark_republishes() {
    init_tracing();
    let store = FaultyStore::new();
    let repo = OutboxRepository::new(store.clone());
    repo.commit(&mut Order::place("order-9", "cust-1", 10)).unwrap();

    let publisher = RecordingPublisher::new();
    let mut processor = OutboxProcessor::new(store.clone(), publisher.clone(), registry());

    store.fail_update(true);
    let err = processor.run_once().unwrap_err();
    assert!(matches!(err, ProcessError::Persist { rows: 1, .. }));
    assert_eq!(publisher.deliveries().len(), 1);
    assert_eq!(store.inner().pending_count().unwrap(), 1);

    store.fail_update(false);
    let report = processor.run_once().unwrap();
    assert_eq!(report.published, 1);

    let deliveries = publisher.deliveries();
    assert_eq!(deliveries.len(), 2);
    assert_eq!(deliveries[0].message_id, deliveries[1].message_id);
    assert_eq!(deliveries[0].correlation_id, deliveries[1].correlation_id);

    let row = store.get_row(deliveries[0].message_id).unwrap().unwrap();
    assert!(row.processed_at.is_some());
}

#[test]
fn malformed_payload_is_recorded_on_the_row() {
    let store = InMemoryOutboxStore::new();
    let id = insert_row(&store, OutboxRow::new("OrderPlaced", "{not json", Utc::now()));
    let mut processor = OutboxProcessor::new(store.clone(), RecordingPublisher::new(), registry());

    let report = processor.run_once().unwrap();
    assert_eq!(report.undecodable, 1);

    let row = store.get_row(id).unwrap().unwrap();
    assert!(row.processed_at.is_none());
    assert!(row
        .last_error
        .as_deref()
        .unwrap()
        .starts_with("malformed payload for 'OrderPlaced'"));
}

#[test]
fn version_one_rows_are_upcast_before_publishing() {
    let store = InMemoryOutboxStore::new();
    let correlation = Uuid::new_v4();
    let v1 = json!({
        "type": "OrderPlaced",
        "schema_version": 1,
        "correlation_id": correlation,
        "payload": { "order_id": "legacy-1", "customer_id": "cust-0", "total_cents": 500 }
    });
    insert_row(&store, OutboxRow::new("OrderPlaced", v1.to_string(), Utc::now()));

    let publisher = RecordingPublisher::new();
    let mut processor = OutboxProcessor::new(store.clone(), publisher.clone(), registry());
    let report = processor.run_once().unwrap();

    assert_eq!(report.published, 1);
    let delivery = &publisher.deliveries()[0];
    assert_eq!(delivery.correlation_id, correlation);
    assert_eq!(delivery.payload["currency"], "EUR");
    assert_eq!(delivery.payload["order_id"], "legacy-1");
}

#[test]
fn processed_rows_are_never_fetched_again() {
    let store = seeded_store();
    let publisher = RecordingPublisher::new();
    let mut processor = OutboxProcessor::new(store.clone(), publisher.clone(), registry());

    processor.run_once().unwrap();
    let first: Vec<_> = store.rows().unwrap().into_iter().map(|r| r.processed_at).collect();

    let report = processor.run_once().unwrap();
    assert_eq!(report.fetched, 0);
    let second: Vec<_> = store.rows().unwrap().into_iter().map(|r| r.processed_at).collect();
    assert_eq!(first, second);
    assert_eq!(publisher.deliveries().len(), 3);
}

#[test]
fn stale_failure_from_a_second_processor_leaves_delivered_row_alone() {
    let store = seeded_store();
    let mut stale = store.unprocessed(10).unwrap();

    let publisher = RecordingPublisher::new();
    let mut processor = OutboxProcessor::new(store.clone(), publisher.clone(), registry());
    assert_eq!(processor.run_once().unwrap().published, 3);
    let delivered = store.rows().unwrap();

    for row in &mut stale {
        row.record_error(&RowError::PublishFailed {
            kind: "BusError".into(),
            message: "down".into(),
        });
    }
    store.update_rows(&stale).unwrap();

    assert_eq!(store.rows().unwrap(), delivered);
    assert!(delivered.iter().all(|r| r.is_processed() && r.last_error.is_none()));
}

use std::time::Duration;

use outbox_relay::{
    InMemoryOutboxStore, OutboxConfig, OutboxJanitor, OutboxProcessor, OutboxRepository,
    OutboxStore, OutboxWorkers,
};

use crate::support::{init_tracing, registry, wait_for, Customer, Order, RecordingPublisher};

#[test]
fn order_placed_flows_from_commit_to_cleanup() {
    init_tracing();
    let repo = OutboxRepository::new(InMemoryOutboxStore::new());
    let store = repo.store().clone();

    let mut order = Order::place("order-42", "cust-7", 4200);
    repo.commit(&mut order).unwrap();

    let rows = store.rows().unwrap();
    assert_eq!(rows.len(), 1);
    let row = rows[0].clone();
    assert_eq!(row.event_type, "OrderPlaced");
    assert!(row.processed_at.is_none());
    assert!(!row.envelope().unwrap().correlation_id.is_nil());

    let publisher = RecordingPublisher::new();
    let mut processor = OutboxProcessor::new(store.clone(), publisher.clone(), registry());
    let report = processor.run_once().unwrap();
    assert_eq!(report.published, 1);

    let processed = store.get_row(row.id).unwrap().unwrap();
    assert!(processed.processed_at.is_some());
    assert!(processed.last_error.is_none());

    let delivery = &publisher.deliveries()[0];
    assert_eq!(delivery.message_id, row.id);
    assert_eq!(delivery.payload["order_id"], "order-42");
    assert_eq!(delivery.payload["total_cents"], 4200);

    let janitor = OutboxJanitor::new(store.clone());
    assert_eq!(janitor.run_once().unwrap().deleted, 1);
    assert!(store.get_row(row.id).unwrap().is_none());
}

#[test]
fn background_workers_drain_and_clean_the_outbox() {
    init_tracing();
    let repo = OutboxRepository::new(InMemoryOutboxStore::new());
    let store = repo.store().clone();
    let publisher = RecordingPublisher::new();

    let config = OutboxConfig::new()
        .with_processor_interval(Duration::from_millis(10))
        .with_janitor_interval(Duration::from_millis(10))
        .with_janitor_batch_size(2);
    let workers = OutboxWorkers::spawn(
        OutboxProcessor::new(store.clone(), publisher.clone(), registry()),
        OutboxJanitor::new(store.clone()),
        &config,
    )
    .unwrap();

    for n in 0..3 {
        let mut order = Order::place(&format!("order-{n}"), "cust-1", 10);
        order.ship("ups");
        repo.commit(&mut order).unwrap();
    }
    repo.commit(&mut Customer::register("cust-1", "ada@example.com"))
        .unwrap();
    workers.trigger_processor();

    wait_for(|| publisher.deliveries().len() == 7);
    wait_for(|| store.rows().unwrap().is_empty());

    let stats = workers.stop();
    assert!(stats.processor.runs >= 1);
    assert!(stats.janitor.runs >= 1);
    assert_eq!(stats.processor.failures, 0);
    assert_eq!(stats.janitor.failures, 0);

    let types = publisher.delivered_types();
    let placed = types.iter().filter(|t| *t == "OrderPlaced").count();
    let shipped = types.iter().filter(|t| *t == "OrderShipped").count();
    assert_eq!((placed, shipped), (3, 3));
}

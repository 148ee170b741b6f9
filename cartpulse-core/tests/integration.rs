//! Integration tests for the cartpulse ingestion and aggregation pipeline
//!
//! These tests run the real SQLite store end-to-end: ingestion fan-out
//! into the store, then dashboard aggregation over seeded records.

use std::sync::Arc;

use chrono::{TimeZone, Utc};

use cartpulse_core::analytics::ACTIVITY_PAGE_SIZE;
use cartpulse_core::{
    ConversionClient, CustomerRole, Database, DashboardEngine, IngestService, OrderStatus,
    RequestContext, TrackAck, TrackRequest,
};

fn open_store() -> Arc<Database> {
    let db = Database::open_in_memory().expect("open in-memory store");
    db.migrate().expect("run migrations");
    Arc::new(db)
}

fn track_body(json: serde_json::Value) -> TrackRequest {
    serde_json::from_value(json).expect("valid track body")
}

// ============================================
// Ingestion
// ============================================

#[tokio::test]
async fn test_ingest_persists_partitioned_event() {
    let db = open_store();
    let service = IngestService::<_, ConversionClient>::new(db.clone(), None);

    let ack = service
        .ingest(
            track_body(serde_json::json!({
                "eventType": "purchase",
                "eventId": "abc123",
                "path": "/checkout",
                "source": "newsletter",
                "utm": {"campaign": "spring"},
                "value": 120.0,
                "currency": "USD"
            })),
            RequestContext::default(),
        )
        .await;

    assert_eq!(ack, TrackAck::ok());

    let events = db.recent_events(10).unwrap();
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.event_type, "purchase");
    assert_eq!(event.event_id.as_deref(), Some("abc123"));
    assert_eq!(event.path.as_deref(), Some("/checkout"));
    assert_eq!(event.utm, Some(serde_json::json!({"campaign": "spring"})));
    // Recognized fields stay out of the free-form remainder
    assert_eq!(event.data.len(), 2);
    assert_eq!(event.data["currency"], serde_json::json!("USD"));
}

#[tokio::test]
async fn test_ingest_same_event_id_twice_stores_two_records() {
    let db = open_store();
    let service = IngestService::<_, ConversionClient>::new(db.clone(), None);

    for _ in 0..2 {
        let ack = service
            .ingest(
                track_body(serde_json::json!({
                    "eventType": "purchase",
                    "eventId": "abc123"
                })),
                RequestContext::default(),
            )
            .await;
        assert_eq!(ack, TrackAck::ok());
    }

    // No internal dedup; the shared correlation id is the external
    // service's dedup key, not ours.
    assert_eq!(db.count_events().unwrap(), 2);
}

// ============================================
// Aggregation
// ============================================

#[tokio::test]
async fn test_dashboard_summary_over_seeded_store() {
    let db = open_store();

    // Cancelled order must not contribute to any KPI
    db.insert_order(
        OrderStatus::Cancelled,
        100.0,
        Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap(),
    )
    .unwrap();
    db.insert_order(
        OrderStatus::Paid,
        200.0,
        Utc.with_ymd_and_hms(2024, 2, 10, 0, 0, 0).unwrap(),
    )
    .unwrap();
    db.insert_order(
        OrderStatus::Delivered,
        300.0,
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
    )
    .unwrap();

    db.insert_customer(Some("Ada"), None, CustomerRole::Customer, Utc::now())
        .unwrap();
    db.insert_customer(Some("Ops"), None, CustomerRole::Staff, Utc::now())
        .unwrap();

    db.insert_activity(
        None,
        "order.created",
        Some("order-1"),
        None,
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap(),
    )
    .unwrap();

    let engine = DashboardEngine::new(db.clone());
    let summary = engine
        .compute_summary(Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap())
        .await
        .unwrap();

    assert_eq!(summary.kpis.total_revenue.value, 500.0);
    assert_eq!(summary.kpis.total_orders.value, 2.0);
    assert_eq!(summary.kpis.avg_order_value.value, 250.0);
    // Staff excluded from the customer gauge
    assert_eq!(summary.kpis.new_customers.value, 1.0);
    // March order only
    assert_eq!(summary.this_month_revenue, 300.0);

    assert_eq!(summary.logs.len(), 1);
    assert_eq!(summary.logs[0].user_name, "System");
    assert_eq!(summary.logs[0].action, "order.created");
}

#[tokio::test]
async fn test_dashboard_activity_feed_truncated_and_descending() {
    let db = open_store();
    for i in 0..30 {
        db.insert_activity(
            Some("admin"),
            &format!("action-{}", i),
            None,
            None,
            Utc.with_ymd_and_hms(2024, 3, 1, 0, i, 0).unwrap(),
        )
        .unwrap();
    }

    let engine = DashboardEngine::new(db.clone());
    let summary = engine.compute_summary(Utc::now()).await.unwrap();

    assert_eq!(summary.logs.len(), ACTIVITY_PAGE_SIZE);
    assert_eq!(summary.logs[0].action, "action-29");
    for pair in summary.logs.windows(2) {
        assert!(pair[0].created_at >= pair[1].created_at);
    }
}

// ============================================
// Ingestion and aggregation share one store
// ============================================

#[tokio::test]
async fn test_ingested_events_do_not_disturb_aggregates() {
    let db = open_store();
    let service = IngestService::<_, ConversionClient>::new(db.clone(), None);

    service
        .ingest(
            track_body(serde_json::json!({"eventType": "page_view"})),
            RequestContext::default(),
        )
        .await;

    db.insert_order(OrderStatus::Paid, 50.0, Utc::now()).unwrap();

    let engine = DashboardEngine::new(db.clone());
    let summary = engine.compute_summary(Utc::now()).await.unwrap();

    // Behavioral events are a separate stream from transactional KPIs
    assert_eq!(summary.kpis.total_orders.value, 1.0);
    assert_eq!(summary.kpis.total_revenue.value, 50.0);
    assert_eq!(db.count_events().unwrap(), 1);
}

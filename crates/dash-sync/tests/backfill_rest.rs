//! REST 백필 통합 테스트 (mockito).

use std::time::Duration;

use chrono::{TimeZone, Utc};
use dash_core::{AppState, Domain};
use dash_sync::{
    backfill_all, BackfillOutcome, HistoryProvider, HistoryQuery, RestHistoryClient, SyncError,
    TimeRange,
};
use mockito::Matcher;
use rust_decimal_macros::dec;
use serde_json::json;

fn march_first() -> TimeRange {
    TimeRange::new(
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap(),
    )
}

fn range_matcher() -> Matcher {
    Matcher::AllOf(vec![
        Matcher::UrlEncoded("start".into(), "2024-03-01T00:00:00Z".into()),
        Matcher::UrlEncoded("end".into(), "2024-03-02T00:00:00Z".into()),
    ])
}

#[tokio::test]
async fn fetches_quotes_by_symbol_and_range() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/stocks/range")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("symbol".into(), "AAPL".into()),
            Matcher::UrlEncoded("start".into(), "2024-03-01T00:00:00Z".into()),
            Matcher::UrlEncoded("end".into(), "2024-03-02T00:00:00Z".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!([{
                "id": 7,
                "symbol": "AAPL",
                "timestamp": "2024-03-01T15:30:00Z",
                "open": "170.1", "high": "172.4", "low": "169.8", "close": "171.9",
                "volume": 1200000,
                "change": "1.8", "change_pct": "1.06",
                "created_at": "2024-03-01T15:30:01Z"
            }])
            .to_string(),
        )
        .create_async()
        .await;

    let client = RestHistoryClient::new(server.url(), Duration::from_secs(5)).unwrap();
    let query = HistoryQuery::new().with_symbol("AAPL").with_range(march_first());
    let quotes = client.fetch_quotes(&query).await.unwrap();

    mock.assert_async().await;
    assert_eq!(quotes.len(), 1);
    assert_eq!(quotes.records[0].id, 7);
    assert_eq!(quotes.records[0].close, dec!(171.9));
}

#[tokio::test]
async fn recent_quotes_use_limit() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/stocks")
        .match_query(Matcher::UrlEncoded("limit".into(), "50".into()))
        .with_status(200)
        .with_body("null")
        .create_async()
        .await;

    let client = RestHistoryClient::new(server.url(), Duration::from_secs(5)).unwrap();
    let quotes = client
        .fetch_quotes(&HistoryQuery::new().with_limit(50))
        .await
        .unwrap();

    mock.assert_async().await;
    assert!(quotes.is_empty());
}

#[tokio::test]
async fn sales_range_sends_category_and_region() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/sales")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("start".into(), "2024-03-01T00:00:00Z".into()),
            Matcher::UrlEncoded("end".into(), "2024-03-02T00:00:00Z".into()),
            Matcher::UrlEncoded("category".into(), "Electronics".into()),
            Matcher::UrlEncoded("region".into(), "EU".into()),
        ]))
        .with_status(200)
        .with_body(
            json!([{
                "timestamp": "2024-03-01T12:00:00Z",
                "product_id": "P2", "product_name": "Gadget",
                "category": "Electronics", "region": "EU",
                "quantity": 1, "unit_price": "40", "revenue": "40"
            }])
            .to_string(),
        )
        .create_async()
        .await;

    let client = RestHistoryClient::new(server.url(), Duration::from_secs(5)).unwrap();
    let query = HistoryQuery::new()
        .with_range(march_first())
        .with_category("Electronics")
        .with_region("EU");
    let sales = client.fetch_sales(&query).await.unwrap();

    mock.assert_async().await;
    assert_eq!(sales.len(), 1);
    assert_eq!(sales.records[0].region.as_deref(), Some("EU"));
}

#[tokio::test]
async fn recent_events_and_metrics_send_type_filters() {
    let mut server = mockito::Server::new_async().await;
    let events = server
        .mock("GET", "/api/events")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("limit".into(), "25".into()),
            Matcher::UrlEncoded("type".into(), "purchase".into()),
        ]))
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;
    let metrics = server
        .mock("GET", "/api/metrics")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("limit".into(), "25".into()),
            Matcher::UrlEncoded("department".into(), "Ops".into()),
        ]))
        .with_status(200)
        .with_body("null")
        .create_async()
        .await;

    let client = RestHistoryClient::new(server.url(), Duration::from_secs(5)).unwrap();
    client
        .fetch_events(&HistoryQuery::new().with_limit(25).with_event_type("purchase"))
        .await
        .unwrap();
    client
        .fetch_metrics(&HistoryQuery::new().with_limit(25).with_department("Ops"))
        .await
        .unwrap();

    events.assert_async().await;
    metrics.assert_async().await;
}

#[tokio::test]
async fn ranged_metrics_are_filtered_locally() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/metrics")
        .match_query(range_matcher())
        .with_status(200)
        .with_body(
            json!([
                {"timestamp": "2024-03-01T00:00:00Z", "metric_type": "expense", "department": "Ops", "amount": "5"},
                {"timestamp": "2024-03-01T01:00:00Z", "metric_type": "revenue", "department": "Ops", "amount": "9"},
                {"timestamp": "2024-03-01T02:00:00Z", "metric_type": "expense", "department": "HR", "amount": "3"}
            ])
            .to_string(),
        )
        .create_async()
        .await;

    let client = RestHistoryClient::new(server.url(), Duration::from_secs(5)).unwrap();
    let query = HistoryQuery::new()
        .with_range(march_first())
        .with_metric_type("expense")
        .with_department("Ops");
    let metrics = client.fetch_metrics(&query).await.unwrap();

    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics.records[0].amount, dec!(5));
}

#[tokio::test]
async fn fetches_sales_revenue_for_range() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/sales/revenue")
        .match_query(range_matcher())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"revenue":1250}"#)
        .create_async()
        .await;

    let client = RestHistoryClient::new(server.url(), Duration::from_secs(5)).unwrap();
    let revenue = client.fetch_sales_revenue(&march_first()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(revenue, dec!(1250));
}

#[tokio::test]
async fn sales_revenue_error_is_reported() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/sales/revenue")
        .match_query(Matcher::Any)
        .with_status(400)
        .with_body(r#"{"error":"Invalid start time format"}"#)
        .create_async()
        .await;

    let client = RestHistoryClient::new(server.url(), Duration::from_secs(5)).unwrap();
    let err = client.fetch_sales_revenue(&march_first()).await.unwrap_err();

    assert!(matches!(err, SyncError::Http { status: 400, .. }));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn malformed_row_is_skipped_not_fatal() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/events")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(
            json!([
                {"timestamp": "2024-03-01T10:00:00Z", "event_type": "click", "user_id": "u1"},
                {"timestamp": "not a time", "event_type": "click"},
                {"timestamp": "2024-03-01T10:05:00Z", "event_type": ""},
                {"timestamp": "2024-03-01T10:10:00Z", "event_type": "login", "user_id": "u2"}
            ])
            .to_string(),
        )
        .create_async()
        .await;
    for path in ["/api/stocks", "/api/sales", "/api/metrics"] {
        server
            .mock("GET", path)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;
    }

    let state = AppState::with_defaults();
    let client = RestHistoryClient::new(server.url(), Duration::from_secs(5)).unwrap();
    let report = backfill_all(&client, &state, &HistoryQuery::new()).await;

    // 스키마 불일치 1건 + 검증 실패 1건
    assert_eq!(
        report.outcome(Domain::Events),
        Some(&BackfillOutcome::Loaded {
            records: 2,
            skipped: 2
        })
    );
    assert_eq!(state.events.read().unique_users(), 2);
}

#[tokio::test]
async fn http_error_is_reported() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/events")
        .match_query(Matcher::Any)
        .with_status(503)
        .with_body("database unavailable")
        .create_async()
        .await;

    let client = RestHistoryClient::new(server.url(), Duration::from_secs(5)).unwrap();
    let err = client.fetch_events(&HistoryQuery::new()).await.unwrap_err();

    match err {
        SyncError::Http { status, message } => {
            assert_eq!(status, 503);
            assert!(message.contains("database unavailable"));
        }
        other => panic!("Expected Http error, got {:?}", other),
    }
}

#[tokio::test]
async fn backfill_replaces_successful_domains_only() {
    let mut server = mockito::Server::new_async().await;

    server
        .mock("GET", "/api/stocks")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;
    server
        .mock("GET", "/api/sales")
        .match_query(range_matcher())
        .with_status(200)
        .with_body(
            json!([
                {
                    "timestamp": "2024-03-01T12:00:00Z",
                    "product_id": "P2", "product_name": "Gadget",
                    "quantity": 1, "unit_price": "40", "discount": "0", "revenue": "40"
                },
                {
                    "timestamp": "2024-03-01T09:00:00Z",
                    "product_id": "P1", "product_name": "Widget",
                    "quantity": 3, "unit_price": "10", "revenue": "30"
                }
            ])
            .to_string(),
        )
        .create_async()
        .await;
    server
        .mock("GET", "/api/events")
        .match_query(range_matcher())
        .with_status(500)
        .create_async()
        .await;
    server
        .mock("GET", "/api/metrics")
        .match_query(range_matcher())
        .with_status(200)
        .with_body(
            json!([{
                "timestamp": "2024-03-01T00:00:00Z",
                "metric_type": "revenue",
                "department": "Sales",
                "amount": "1000",
                "budget": "900"
            }])
            .to_string(),
        )
        .create_async()
        .await;

    let state = AppState::with_defaults();
    let existing_event = serde_json::from_value(json!({
        "timestamp": "2024-02-28T08:00:00Z",
        "event_type": "login",
        "user_id": "u1"
    }))
    .unwrap();
    state.append::<dash_core::UserEvent>(existing_event);

    let client = RestHistoryClient::new(server.url(), Duration::from_secs(5)).unwrap();
    let query = HistoryQuery::new().with_range(march_first());
    let report = backfill_all(&client, &state, &query).await;
    report.log_summary();

    assert_eq!(
        report.outcome(Domain::Sales),
        Some(&BackfillOutcome::Loaded {
            records: 2,
            skipped: 0
        })
    );
    assert!(matches!(
        report.outcome(Domain::Events),
        Some(BackfillOutcome::Failed(_))
    ));
    assert_eq!(report.total_records(), 3);

    // 실패한 도메인은 기존 데이터 유지
    assert_eq!(state.events.read().count_of("login"), 1);

    let sales = state.sales.read();
    let order: Vec<&str> = sales.history().map(|s| s.product_id.as_str()).collect();
    assert_eq!(order, vec!["P1", "P2"]);
    assert_eq!(sales.total_revenue(), dec!(70));

    let metrics = state.metrics.read();
    assert_eq!(metrics.department_summary("Sales").variance(), dec!(100));
}

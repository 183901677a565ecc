//! Route tests for the delivery dashboard
//!
//! Builds the real router over an in-memory delivery store and sends requests
//! through tower::ServiceExt, so no Cassandra node is needed.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use scylla::errors::NewSessionError;
use scylla::value::CqlValue;
use tower::ServiceExt;

use delivery_dashboard::db::StoreError;
use delivery_dashboard::db::delivery_store::{DeliveryStore, RawRow};
use delivery_dashboard::services::{DeliveryLoader, export};
use delivery_dashboard::{AppState, create_router};

struct FixtureStore {
    rows: Option<Vec<RawRow>>,
}

#[async_trait]
impl DeliveryStore for FixtureStore {
    async fn fetch_rows(&self) -> Result<Vec<RawRow>, StoreError> {
        self.rows.clone().ok_or(StoreError::Connect {
            contact_point: "fixture",
            source: NewSessionError::EmptyKnownNodesList,
        })
    }
}

struct Row<'a> {
    id: &'a str,
    branch: &'a str,
    region: &'a str,
    status: &'a str,
    week: &'a str,
    arrival: &'a str,
    capacity: f64,
}

fn raw(row: Row<'_>) -> RawRow {
    let text = |s: &str| Some(CqlValue::Text(s.to_string()));
    vec![
        text(row.branch),
        text("R-7"),
        text(row.id),
        text(row.arrival),
        Some(CqlValue::Int(40)),
        Some(CqlValue::Double(row.capacity)),
        text("Beans"),
        text("Food"),
        text("2023-12-28"),
        text("Monday"),
        text("DC-North"),
        text("M. Auma"),
        text(row.region),
        Some(CqlValue::Double(3.5)),
        Some(CqlValue::Double(4.0)),
        Some(CqlValue::Double(1.5)),
        text(row.status),
        text("Medium"),
        text("Truck"),
        Some(CqlValue::Double(3.5)),
        Some(CqlValue::Double(12.0)),
        text(row.week),
    ]
}

fn fixture_rows() -> Vec<RawRow> {
    vec![
        raw(Row { id: "D-1", branch: "Gulu", region: "North", status: "Delivered", week: "W1", arrival: "2024-01-01", capacity: 80.0 }),
        raw(Row { id: "D-2", branch: "Gulu", region: "North", status: "Delayed", week: "W1", arrival: "2024-01-01", capacity: 65.0 }),
        raw(Row { id: "D-3", branch: "Lira", region: "North", status: "Delivered", week: "W1", arrival: "2024-01-03", capacity: 30.0 }),
        raw(Row { id: "D-4", branch: "Lira", region: "South", status: "Delivered", week: "W1", arrival: "2024-01-02", capacity: 90.0 }),
        raw(Row { id: "D-5", branch: "Gulu", region: "North", status: "Delivered", week: "W2", arrival: "2024-01-09", capacity: 70.0 }),
    ]
}

fn test_app_with(rows: Option<Vec<RawRow>>) -> axum::Router {
    let store = Arc::new(FixtureStore { rows });
    create_router(AppState::new(Arc::new(DeliveryLoader::new(store))))
}

fn test_app() -> axum::Router {
    test_app_with(Some(fixture_rows()))
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let resp = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let body = resp.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, headers, body)
}

async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let (status, _, body) = get(app, uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}

// ---------------------------------------------------------------
// Health and options
// ---------------------------------------------------------------

#[tokio::test]
async fn test_health_reports_record_count() {
    let (status, json) = get_json(test_app(), "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["records"], 5);
    assert_eq!(json["quarantined"], 0);
}

#[tokio::test]
async fn test_options_and_defaults() {
    let (status, json) = get_json(test_app(), "/api/options").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["regions"], serde_json::json!(["North", "South"]));
    assert_eq!(json["statuses"], serde_json::json!(["Delivered", "Delayed"]));
    assert_eq!(json["week_ranges"], serde_json::json!(["W1", "W2"]));
    assert_eq!(json["default_selection"]["region"], "North");
    assert_eq!(json["default_selection"]["week_range"], "W1");
}

#[tokio::test]
async fn test_store_failure_is_service_unavailable() {
    let (status, json) = get_json(test_app_with(None), "/api/summary").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(json["error"].as_str().unwrap().contains("Failed to load deliveries"));
}

#[tokio::test]
async fn test_unknown_filter_value_is_bad_request() {
    for uri in [
        "/api/summary?region=West",
        "/api/summary?week=W9",
        "/?status=Lost&applied=1",
        "/download/deliveries_filtered.csv?region=North&week=W7",
    ] {
        let (status, _, body) = get(test_app(), uri).await;
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert!(json["error"].as_str().unwrap().starts_with("Invalid request: Unknown"));
    }
}

// ---------------------------------------------------------------
// Summary
// ---------------------------------------------------------------

#[tokio::test]
async fn test_summary_for_north_w1_all_statuses() {
    let (status, json) = get_json(test_app(), "/api/summary?region=North&week=W1").await;

    assert_eq!(status, StatusCode::OK);
    let summary = &json["summary"];
    assert_eq!(summary["deliveries"], 3);
    assert_eq!(summary["total_beneficiaries"], 120);
    assert_eq!(summary["avg_capacity_utilisation"], 58.333333333333336);

    let branch_total: u64 = summary["trips_per_branch"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["count"].as_u64().unwrap())
        .sum();
    assert_eq!(branch_total, 3);

    assert_eq!(
        summary["deliveries_over_time"],
        serde_json::json!([
            { "at": "2024-01-01", "count": 2 },
            { "at": "2024-01-03", "count": 1 },
        ])
    );

    // D-2 is delayed, D-3 is under 50% utilisation
    let attention: Vec<&str> = json["attention"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["delivery_id"].as_str().unwrap())
        .collect();
    assert_eq!(attention, vec!["D-2", "D-3"]);
}

#[tokio::test]
async fn test_summary_with_cleared_statuses_is_empty() {
    let (status, json) = get_json(test_app(), "/api/summary?region=North&week=W1&applied=1").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["summary"]["deliveries"], 0);
    assert!(json["summary"]["avg_capacity_utilisation"].is_null());
    assert!(json["summary"]["avg_return_percentage"].is_null());
    assert_eq!(json["attention"], serde_json::json!([]));
}

#[tokio::test]
async fn test_summary_with_status_subset() {
    let (_, json) = get_json(
        test_app(),
        "/api/summary?region=North&week=W1&status=Delayed&applied=1",
    )
    .await;

    assert_eq!(json["selection"]["statuses"], serde_json::json!(["Delayed"]));
    assert_eq!(json["summary"]["deliveries"], 1);
}

// ---------------------------------------------------------------
// Page and export
// ---------------------------------------------------------------

#[tokio::test]
async fn test_dashboard_page_renders() {
    let (status, headers, body) = get(test_app(), "/?region=South&week=W1").await;
    let html = String::from_utf8(body).unwrap();

    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/html"));
    assert!(html.contains("Humanitarian Deliveries Dashboard"));
    assert!(html.contains("<td>D-4</td>"));
    assert!(!html.contains("<td>D-1</td>"));
}

#[tokio::test]
async fn test_download_round_trips_filtered_rows() {
    let (status, headers, body) = get(test_app(), "/download/deliveries_filtered.csv?region=North&week=W1").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "text/csv");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"deliveries_filtered.csv\""
    );

    let csv = String::from_utf8(body).unwrap();
    assert!(csv.starts_with("branch,route,delivery_id,arrival_date,"));

    let parsed = export::from_csv(&csv).unwrap();
    let ids: Vec<&str> = parsed.iter().map(|r| r.delivery_id.as_str()).collect();
    assert_eq!(ids, vec!["D-1", "D-2", "D-3"]);
    assert!(parsed.iter().all(|r| r.region == "North" && r.week_range == "W1"));
    assert_eq!(parsed[2].capacity_utilisation, 30.0);
}

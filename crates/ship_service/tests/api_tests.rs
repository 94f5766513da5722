//! Integration tests for the HTTP query surface.
//!
//! Tests drive the axum `Router` directly via `tower::ServiceExt` without
//! starting a TCP server, validating handler logic, routing, and the 404
//! mapping for client-side failures.

use std::sync::Arc;

use aisstream::{Metadata, PositionReport, ShipStaticData};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use ship_service::{create_router, AppState, Ships, SpatialCache};
use tower::ServiceExt;

fn ingest_position(ships: &Ships, mmsi: u32, name: &str, lat: f64, lng: f64) {
    let meta = Metadata {
        mmsi,
        ship_name: name.to_string(),
        latitude: lat,
        longitude: lng,
        time_utc: String::new(),
    };
    let report = PositionReport {
        sog: 3.5,
        true_heading: 90,
        navigational_status: 0,
        ..Default::default()
    };
    ships.ensure(mmsi);
    ships.apply_metadata(&meta);
    ships.update_history(mmsi, [lat, lng]);
    ships.apply_position_report(mmsi, &report);
    ships.refresh_derived(mmsi);
}

fn make_app(prime_cache: bool) -> Router {
    let ships = Arc::new(Ships::new());
    let cache = Arc::new(SpatialCache::new());

    ingest_position(&ships, 366000001, "OAKLAND EXPRESS", 37.8, -122.4);
    ingest_position(&ships, 244660920, "NORDICA", 52.4, 4.8);
    ships.apply_static_data(
        244660920,
        &ShipStaticData {
            destination: "ROTTERDAM".to_string(),
            imo_number: 9811000,
            ship_type: 70,
            ..Default::default()
        },
    );

    if prime_cache {
        cache.rebuild(&ships);
    }

    let state = AppState {
        ships,
        cache,
        index_html: "<html><body>seawatch</body></html>".to_string(),
        static_dir: std::env::temp_dir(),
    };
    create_router(state)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

#[tokio::test]
async fn test_index_serves_rendered_page() {
    let app = make_app(true);
    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(String::from_utf8(bytes.to_vec()).unwrap().contains("seawatch"));
}

#[tokio::test]
async fn test_ship_count() {
    let app = make_app(true);
    let (status, body) = get(&app, "/shipCount").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::from(2));
}

#[tokio::test]
async fn test_ship_info_window() {
    let app = make_app(true);
    let (status, body) = get(&app, "/shipInfoWindow/244660920").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mmsi"], 244660920);
    assert_eq!(body["name"], "NORDICA");
    assert_eq!(body["heading"], 90);
    assert_eq!(body["navStat"], 0);
    assert_eq!(body["shipType"], 70);
    assert_eq!(body["destination"], "ROTTERDAM");
    assert_eq!(body["imoNumber"], 9811000);
    assert!(body["lastUpdate"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn test_ship_info_window_not_found() {
    let app = make_app(true);

    let (status, _) = get(&app, "/shipInfoWindow/123456789").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&app, "/shipInfoWindow/not-a-number").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ship_history_newest_first() {
    let app = make_app(true);
    let (status, body) = get(&app, "/shipHistory/366000001").await;

    assert_eq!(status, StatusCode::OK);
    let history = body.as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["latlon"][0], 37.8);
    assert_eq!(history[0]["latlon"][1], -122.4);

    let (status, _) = get(&app, "/shipHistory/1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ships_in_box() {
    let app = make_app(true);
    let (status, body) = get(&app, "/ships/37.79,-122.41/37.82,-122.39").await;

    assert_eq!(status, StatusCode::OK);
    let ships = body.as_array().unwrap();
    assert_eq!(ships.len(), 1);
    assert_eq!(ships[0]["mmsi"], 366000001);
    assert_eq!(ships[0]["marker"], 1);
    assert_eq!(ships[0]["rotation"], 90);
}

#[tokio::test]
async fn test_ships_in_box_rejects_bad_input() {
    let app = make_app(true);

    // malformed coordinate pairs
    let (status, _) = get(&app, "/ships/37.79/37.82,-122.39").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = get(&app, "/ships/a,b/c,d").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // out-of-range bounding box
    let (status, _) = get(&app, "/ships/-95.0,-122.41/37.82,-122.39").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ships_in_box_before_first_rebuild() {
    let app = make_app(false);
    let (status, body) = get(&app, "/ships/37.79,-122.41/37.82,-122.39").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("geo index"));
}

#[tokio::test]
async fn test_search_fields() {
    let app = make_app(true);
    let (status, body) = get(&app, "/searchFields").await;

    assert_eq!(status, StatusCode::OK);
    let fields = body.as_array().unwrap();
    assert_eq!(fields.len(), 2);
    assert!(fields.iter().any(|f| f["name"] == "NORDICA"));
    assert!(fields.iter().all(|f| f["latlon"].is_array()));
}

#[tokio::test]
async fn test_ship_dump() {
    let app = make_app(true);
    let (status, body) = get(&app, "/shipDump").await;

    assert_eq!(status, StatusCode::OK);
    let entry = &body["244660920"];
    assert_eq!(entry["state"]["name"], "NORDICA");
    assert_eq!(entry["info"]["destination"], "ROTTERDAM");
    assert_eq!(entry["history"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_ship_meta() {
    let app = make_app(true);
    let (status, body) = get(&app, "/shipMeta").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["shipType"]["70"], "Cargo");
    assert_eq!(body["navStatus"]["5"], "Moored");
    assert!(body["shipGroup"]["tanker"].as_array().unwrap().contains(&Value::from(80)));
}

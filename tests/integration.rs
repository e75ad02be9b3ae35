use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use delivery_engine::api::rest::router;
use delivery_engine::config::Config;
use delivery_engine::engine::coordinator::run_coordinator;
use delivery_engine::state::AppState;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

fn setup() -> (axum::Router, mpsc::Receiver<Uuid>) {
    let (state, rx) = AppState::new(Config::default());
    (router(Arc::new(state)), rx)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn create_courier(app: &axum::Router, name: &str, lat: f64, lng: f64) -> Value {
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/couriers",
            json!({
                "name": name,
                "location": { "lat": lat, "lng": lng }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    body_json(res).await
}

async fn create_delivery(app: &axum::Router, body: Value) -> Value {
    let res = app
        .clone()
        .oneshot(json_request("POST", "/deliveries", body))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    body_json(res).await
}

fn default_delivery_body() -> Value {
    json!({
        "client_id": Uuid::new_v4(),
        "destination": { "lat": 10.0, "lng": 20.0, "description": "front door" },
        "items": [{ "sku": "A-100", "qty": 2 }],
        "confirmation_code": "1234"
    })
}

#[tokio::test]
async fn health_returns_ok() {
    let (app, _rx) = setup();
    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["deliveries"], 0);
    assert_eq!(body["points"], 0);
    assert_eq!(body["couriers"], 0);
    assert_eq!(body["logs"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let (app, _rx) = setup();
    let response = app.oneshot(get_request("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("deliveries_awaiting_assignment"));
}

#[tokio::test]
async fn create_delivery_starts_in_created() {
    let (app, _rx) = setup();
    let delivery = create_delivery(&app, default_delivery_body()).await;

    assert_eq!(delivery["status"], "Created");
    assert!(delivery["courier_id"].is_null());
    assert!(delivery["failure_reason"].is_null());
    // The shared secret must never leave the engine.
    assert!(delivery.get("confirmation_code").is_none());

    let point_id = delivery["destination_point_id"].as_str().unwrap();
    let res = app
        .oneshot(get_request(&format!("/points/{point_id}")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let point = body_json(res).await;
    assert_eq!(point["usage_count"], 1);
    assert_eq!(point["description"], "front door");
}

#[tokio::test]
async fn create_delivery_with_invalid_destination_returns_400() {
    let (app, _rx) = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/deliveries",
            json!({
                "client_id": Uuid::new_v4(),
                "destination": { "lat": 123.0, "lng": 20.0 }
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_nonexistent_delivery_returns_404() {
    let (app, _rx) = setup();
    let fake_id = "00000000-0000-0000-0000-000000000000";
    let response = app
        .oneshot(get_request(&format!("/deliveries/{fake_id}")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn resolving_the_same_coordinates_reuses_the_point() {
    let (app, _rx) = setup();

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/points/resolve",
            json!({ "lat": 48.8566, "lng": 2.3522, "description": "pickup counter" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let first = body_json(res).await;
    assert_eq!(first["created"], true);
    assert_eq!(first["point"]["usage_count"], 1);

    // A couple of meters away: still the same point.
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/points/resolve",
            json!({ "lat": 48.85661, "lng": 2.35221 }),
        ))
        .await
        .unwrap();
    let second = body_json(res).await;
    assert_eq!(second["created"], false);
    assert_eq!(second["point"]["id"], first["point"]["id"]);
    assert_eq!(second["point"]["usage_count"], 2);

    // A different neighborhood: a new point.
    let res = app
        .oneshot(json_request(
            "POST",
            "/points/resolve",
            json!({ "lat": 48.87, "lng": 2.36 }),
        ))
        .await
        .unwrap();
    let third = body_json(res).await;
    assert_eq!(third["created"], true);
    assert_ne!(third["point"]["id"], first["point"]["id"]);
}

#[tokio::test]
async fn resolve_with_malformed_coordinates_returns_400() {
    let (app, _rx) = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/points/resolve",
            json!({ "lat": -91.0, "lng": 0.0 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn full_lifecycle_happy_path() {
    let (state, rx) = AppState::new(Config::default());
    let shared = Arc::new(state);
    tokio::spawn(run_coordinator(shared.clone(), rx));
    let app = router(shared.clone());

    let courier = create_courier(&app, "Dana", 10.0001, 20.0001).await;
    let courier_id = courier["id"].as_str().unwrap().to_string();

    let delivery = create_delivery(&app, default_delivery_body()).await;
    let delivery_id = delivery["id"].as_str().unwrap().to_string();

    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

    let res = app
        .clone()
        .oneshot(get_request(&format!("/deliveries/{delivery_id}")))
        .await
        .unwrap();
    let assigned = body_json(res).await;
    assert_eq!(assigned["status"], "Assigned");
    assert_eq!(assigned["courier_id"], courier_id);

    // A second assignment attempt must lose, not reassign.
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/deliveries/{delivery_id}/assign"),
            json!({ "courier_id": Uuid::new_v4() }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/deliveries/{delivery_id}/transit"),
            json!({ "actor_id": courier_id }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/deliveries/{delivery_id}/arrive"),
            json!({ "actor_id": courier_id }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/deliveries/{delivery_id}/complete"),
            json!({
                "proof": { "otp": "1234", "location": { "lat": 10.0, "lng": 20.0 } },
                "actor_id": courier_id
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let delivered = body_json(res).await;
    assert_eq!(delivered["status"], "Delivered");

    let res = app
        .clone()
        .oneshot(get_request(&format!("/deliveries/{delivery_id}/logs")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let logs = body_json(res).await;
    let entries = logs.as_array().unwrap();
    assert_eq!(entries.len(), 5);

    let actions: Vec<&str> = entries
        .iter()
        .map(|entry| entry["action"].as_str().unwrap())
        .collect();
    assert_eq!(
        actions,
        vec!["created", "assigned", "in_transit", "arrived_zone", "delivered"]
    );
    for pair in entries.windows(2) {
        let a = pair[0]["created_at"].as_str().unwrap();
        let b = pair[1]["created_at"].as_str().unwrap();
        assert!(a <= b);
    }

    // The courier is released once the delivery reaches a terminal state.
    let res = app.oneshot(get_request("/couriers")).await.unwrap();
    let couriers = body_json(res).await;
    assert_eq!(couriers.as_array().unwrap()[0]["status"], "Available");
}

#[tokio::test]
async fn otp_mismatch_leaves_delivery_in_arrived_zone() {
    let (app, _rx) = setup();

    let delivery = create_delivery(&app, default_delivery_body()).await;
    let delivery_id = delivery["id"].as_str().unwrap().to_string();
    let courier_id = Uuid::new_v4();

    for (uri, body) in [
        (
            format!("/deliveries/{delivery_id}/assign"),
            json!({ "courier_id": courier_id }),
        ),
        (format!("/deliveries/{delivery_id}/transit"), json!({})),
        (format!("/deliveries/{delivery_id}/arrive"), json!({})),
    ] {
        let res = app
            .clone()
            .oneshot(json_request("POST", &uri, body))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/deliveries/{delivery_id}/complete"),
            json!({ "proof": { "otp": "0000" } }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let res = app
        .clone()
        .oneshot(get_request(&format!("/deliveries/{delivery_id}")))
        .await
        .unwrap();
    let delivery = body_json(res).await;
    assert_eq!(delivery["status"], "ArrivedZone");

    // No DELIVERED entry was written; resubmission is still possible.
    let res = app
        .clone()
        .oneshot(get_request(&format!("/deliveries/{delivery_id}/logs")))
        .await
        .unwrap();
    let logs = body_json(res).await;
    assert_eq!(logs.as_array().unwrap().len(), 4);

    let res = app
        .oneshot(json_request(
            "POST",
            &format!("/deliveries/{delivery_id}/complete"),
            json!({ "proof": { "otp": "1234" } }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn complete_without_any_evidence_returns_422() {
    let (app, _rx) = setup();

    let delivery = create_delivery(&app, default_delivery_body()).await;
    let delivery_id = delivery["id"].as_str().unwrap().to_string();

    for (uri, body) in [
        (
            format!("/deliveries/{delivery_id}/assign"),
            json!({ "courier_id": Uuid::new_v4() }),
        ),
        (format!("/deliveries/{delivery_id}/transit"), json!({})),
        (format!("/deliveries/{delivery_id}/arrive"), json!({})),
    ] {
        let res = app
            .clone()
            .oneshot(json_request("POST", &uri, body))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    let res = app
        .oneshot(json_request(
            "POST",
            &format!("/deliveries/{delivery_id}/complete"),
            json!({ "proof": {} }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn completing_from_created_returns_409() {
    let (app, _rx) = setup();

    let delivery = create_delivery(&app, default_delivery_body()).await;
    let delivery_id = delivery["id"].as_str().unwrap().to_string();

    let res = app
        .oneshot(json_request(
            "POST",
            &format!("/deliveries/{delivery_id}/complete"),
            json!({ "proof": { "otp": "1234" } }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn fail_records_the_reason_and_blocks_further_transitions() {
    let (app, _rx) = setup();

    let delivery = create_delivery(&app, default_delivery_body()).await;
    let delivery_id = delivery["id"].as_str().unwrap().to_string();

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/deliveries/{delivery_id}/fail"),
            json!({ "reason": "courier unresponsive" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let failed = body_json(res).await;
    assert_eq!(failed["status"], "Failed");
    assert_eq!(failed["failure_reason"], "courier unresponsive");

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/deliveries/{delivery_id}/assign"),
            json!({ "courier_id": Uuid::new_v4() }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = app
        .oneshot(get_request(&format!("/deliveries/{delivery_id}/logs")))
        .await
        .unwrap();
    let logs = body_json(res).await;
    let entries = logs.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1]["action"], "failed");
    assert_eq!(entries[1]["details"], "courier unresponsive");
}

#[tokio::test]
async fn fail_with_empty_reason_returns_400() {
    let (app, _rx) = setup();

    let delivery = create_delivery(&app, default_delivery_body()).await;
    let delivery_id = delivery["id"].as_str().unwrap().to_string();

    let res = app
        .oneshot(json_request(
            "POST",
            &format!("/deliveries/{delivery_id}/fail"),
            json!({ "reason": "  " }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn coordinator_picks_the_courier_nearest_the_pickup_point() {
    let (state, rx) = AppState::new(Config::default());
    let shared = Arc::new(state);
    tokio::spawn(run_coordinator(shared.clone(), rx));
    let app = router(shared.clone());

    // Pickup in central Hamburg, destination across town. One courier
    // sits next to the pickup, the other next to the destination.
    let near_pickup = create_courier(&app, "Nia", 53.5512, 9.9938).await;
    let _near_dropoff = create_courier(&app, "Theo", 53.6, 10.1).await;

    let delivery = create_delivery(
        &app,
        json!({
            "client_id": Uuid::new_v4(),
            "destination": { "lat": 53.6001, "lng": 10.1001 },
            "pickup": { "lat": 53.5511, "lng": 9.9937, "description": "restaurant" },
            "items": []
        }),
    )
    .await;
    let delivery_id = delivery["id"].as_str().unwrap().to_string();

    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

    let res = app
        .oneshot(get_request(&format!("/deliveries/{delivery_id}")))
        .await
        .unwrap();
    let assigned = body_json(res).await;
    assert_eq!(assigned["status"], "Assigned");
    assert_eq!(assigned["courier_id"], near_pickup["id"]);
}

#[tokio::test]
async fn create_courier_validates_input() {
    let (app, _rx) = setup();

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/couriers",
            json!({ "name": "  ", "location": { "lat": 52.52, "lng": 13.405 } }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app
        .oneshot(json_request(
            "POST",
            "/couriers",
            json!({ "name": "Vera", "location": { "lat": 95.0, "lng": 13.405 } }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_courier_status_and_location() {
    let (app, _rx) = setup();

    let courier = create_courier(&app, "Eve", 52.0, 13.0).await;
    let id = courier["id"].as_str().unwrap();

    let res = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/couriers/{id}/status"),
            json!({ "status": "Offline" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["status"], "Offline");

    let res = app
        .oneshot(json_request(
            "PATCH",
            &format!("/couriers/{id}/location"),
            json!({ "location": { "lat": 48.85, "lng": 2.35 } }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["location"]["lat"], 48.85);
    assert_eq!(body["location"]["lng"], 2.35);
}

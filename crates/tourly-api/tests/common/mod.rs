//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, TimeZone, Utc};
use http_body_util::BodyExt;
use tourly_core::alert::BackOfficeAlerter;
use tourly_core::clock::Clock;
use tourly_escalation::application::registry::MonitorRegistry;
use tourly_escalation::domain::policy::EscalationPolicy;
use tourly_event_store::memory_event_repository::InMemoryEventRepository;
use tourly_test_support::{PausedClock, RecordingAlerter};
use tower::ServiceExt;

use tourly_api::state::AppState;

/// Wall-clock start shared by every integration test.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 4, 17, 0, 0).unwrap()
}

/// Application state with an in-memory event store, a paused clock
/// starting at [`t0`] and the default escalation policy.
///
/// Must be called from within a tokio runtime.
pub fn test_state(alerter: Arc<dyn BackOfficeAlerter>) -> AppState {
    let clock: Arc<dyn Clock> = Arc::new(PausedClock::starting_at(t0()));
    let monitors = Arc::new(MonitorRegistry::new(
        Arc::clone(&clock),
        alerter,
        EscalationPolicy::default(),
    ));
    AppState::new(clock, Arc::new(InMemoryEventRepository::new()), monitors)
}

/// Build the full app router with a recording alerter. Uses the same route
/// structure as `main.rs`.
pub fn build_test_app() -> (Router, Arc<RecordingAlerter>) {
    let alerter = Arc::new(RecordingAlerter::new());
    let app = tourly_api::app(test_state(alerter.clone()));
    (app, alerter)
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    send(app, request).await
}

/// Send a POST request without a body and return the response.
pub async fn post_empty(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

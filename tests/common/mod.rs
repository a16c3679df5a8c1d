#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use bigdecimal::BigDecimal;
use serde_json::Value;
use tower::ServiceExt;

use numhub_core::services::inventory::NewNumberInput;
use numhub_core::store::MemoryStore;
use numhub_core::{create_app, AppState};

pub const ADMIN_EMAIL: &str = "root@numhub.test";
pub const ADMIN_HEADER: &str = "x-admin-uid";

pub fn test_state() -> AppState {
    AppState::new(Arc::new(MemoryStore::new()), Some(ADMIN_EMAIL.to_string()))
}

pub fn app(state: &AppState) -> Router {
    create_app(state.clone())
}

pub fn dec(raw: &str) -> BigDecimal {
    BigDecimal::from_str(raw).expect("decimal literal")
}

/// Parses a decimal JSON field (serialized as a string) for comparison.
pub fn dec_field(value: &Value) -> BigDecimal {
    dec(value.as_str().expect("decimal field"))
}

/// Create the bootstrap admin account and return its uid.
pub async fn seed_admin(state: &AppState) -> String {
    let admin = state
        .accounts
        .signup(ADMIN_EMAIL, Some("admin-root"))
        .await
        .expect("admin signup");
    assert!(admin.is_admin());
    admin.uid
}

/// Create a regular account and return its uid.
pub async fn seed_user(state: &AppState, email: &str, uid: &str) -> String {
    let user = state
        .accounts
        .signup(email, Some(uid))
        .await
        .expect("user signup");
    user.uid
}

pub async fn seed_credits(state: &AppState, uid: &str, amount: &str) {
    state
        .admin
        .add_credit(uid, &dec(amount))
        .await
        .expect("credit top-up");
}

/// Upload one available number and return its id.
pub async fn seed_number(state: &AppState, phone: &str, price: &str) -> String {
    let summary = state
        .inventory
        .upload(vec![NewNumberInput {
            phone_number: phone.to_string(),
            api_url: "https://sms.example.test/poll".to_string(),
            price: dec(price),
            number_type: "voip".to_string(),
        }])
        .await
        .expect("number upload");
    assert_eq!(summary.added, 1);

    state
        .inventory
        .available()
        .await
        .expect("list available")
        .into_iter()
        .find(|n| n.phone_number == phone)
        .map(|n| n.id)
        .expect("uploaded number present")
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body = serde_json::from_slice(&bytes).expect("json body");
    (status, body)
}

pub async fn get(state: &AppState, path: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::GET)
        .uri(path)
        .body(Body::empty())
        .expect("request");
    send(app(state), request).await
}

pub async fn get_as_admin(state: &AppState, path: &str, admin_uid: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::GET)
        .uri(path)
        .header(ADMIN_HEADER, admin_uid)
        .body(Body::empty())
        .expect("request");
    send(app(state), request).await
}

pub async fn post_json(state: &AppState, path: &str, body: &Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request");
    send(app(state), request).await
}

pub async fn post_json_as_admin(
    state: &AppState,
    path: &str,
    admin_uid: &str,
    body: &Value,
) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .header(ADMIN_HEADER, admin_uid)
        .body(Body::from(body.to_string()))
        .expect("request");
    send(app(state), request).await
}

/// Asserts the shared response envelope and returns the `data` payload.
pub fn expect_success(status: StatusCode, body: &Value) -> Value {
    assert!(
        status.is_success(),
        "expected success, got {status}: {body}"
    );
    assert_eq!(body["success"], true, "envelope success flag: {body}");
    assert!(body["message"].is_string(), "envelope message: {body}");
    assert!(body["timestamp"].is_string(), "envelope timestamp: {body}");
    body["data"].clone()
}

pub fn expect_failure(status: StatusCode, body: &Value, expected: StatusCode) {
    assert_eq!(status, expected, "unexpected status: {body}");
    assert_eq!(body["success"], false, "envelope success flag: {body}");
    assert!(body["data"].is_null(), "failure data must be null: {body}");
    assert!(body["message"].is_string(), "envelope message: {body}");
}

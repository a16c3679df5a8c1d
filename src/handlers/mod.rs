pub mod admin;
pub mod auth;
pub mod numbers;
pub mod user;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;

use crate::health;
use crate::response::ApiResponse;
use crate::AppState;

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let report = health::report(state.store.as_ref(), state.started_at).await;
    let healthy = report.store.is_healthy();

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let message = if healthy {
        "service healthy"
    } else {
        "record store unreachable"
    };

    let body = ApiResponse {
        success: healthy,
        data: Some(report),
        message: message.to_string(),
        timestamp: Utc::now(),
    };

    (status_code, Json(body))
}

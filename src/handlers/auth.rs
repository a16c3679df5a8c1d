//! Signup and login. Identity is asserted by the gateway in front of this
//! service; these routes only manage the account records.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;

use super::user::UserProfile;
use crate::error::AppError;
use crate::response::ApiResponse;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub email: String,
    /// Optional externally issued id; generated when absent.
    #[serde(default)]
    pub uid: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
}

pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .accounts
        .signup(&payload.email, payload.uid.as_deref())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(UserProfile::from(user), "account created")),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.accounts.login(&payload.email).await?;

    Ok(Json(ApiResponse::ok(
        UserProfile::from(user),
        "login successful",
    )))
}

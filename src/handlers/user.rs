//! User-facing account routes.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{LedgerEntry, PurchaseRecord, Role, User};
use crate::error::AppError;
use crate::response::ApiResponse;
use crate::AppState;

/// Wire shape of an account. The plain number list is derived from the
/// snapshots on every read.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: String,
    pub email: String,
    pub credits: BigDecimal,
    pub role: Role,
    pub purchased_numbers: Vec<String>,
    pub purchased_numbers_data: Vec<PurchaseRecord>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        let purchased_numbers = user.purchased_numbers();
        Self {
            uid: user.uid,
            email: user.email,
            credits: user.credits,
            role: user.role,
            purchased_numbers,
            purchased_numbers_data: user.purchased_numbers_data,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub recent_transactions: Vec<LedgerEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnedNumbers {
    pub purchased_numbers: Vec<String>,
    pub purchased_numbers_data: Vec<PurchaseRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveNumbersRequest {
    pub uid: String,
    pub phone_numbers: Vec<String>,
}

pub async fn profile(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (user, recent_transactions) = state.accounts.profile(&uid).await?;

    let body = ProfileResponse {
        profile: UserProfile::from(user),
        recent_transactions,
    };
    Ok(Json(ApiResponse::ok(body, "profile loaded")))
}

pub async fn purchased_numbers(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.accounts.get_user(&uid).await?;

    let body = OwnedNumbers {
        purchased_numbers: user.purchased_numbers(),
        purchased_numbers_data: user.purchased_numbers_data,
    };
    Ok(Json(ApiResponse::ok(body, "purchased numbers loaded")))
}

pub async fn remove_numbers(
    State(state): State<AppState>,
    Json(payload): Json<RemoveNumbersRequest>,
) -> Result<impl IntoResponse, AppError> {
    let summary = state
        .accounts
        .remove_purchased_numbers(&payload.uid, &payload.phone_numbers)
        .await?;

    Ok(Json(ApiResponse::ok(summary, "purchased numbers removed")))
}

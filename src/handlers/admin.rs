//! Admin routes. Everything here sits behind the admin gate middleware,
//! so handlers can assume the caller is already authorized.

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use bigdecimal::BigDecimal;
use serde::Deserialize;
use serde_json::json;

use super::user::UserProfile;
use crate::domain::{BulkPackage, NumberStatus};
use crate::error::AppError;
use crate::response::ApiResponse;
use crate::services::admin::UserPatch;
use crate::services::inventory::{NewNumberInput, NumberPatch};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AddCreditRequest {
    pub uid: String,
    pub amount: BigDecimal,
}

#[derive(Debug, Deserialize)]
pub struct UploadNumbersRequest {
    pub numbers: Vec<NewNumberInput>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteNumbersRequest {
    pub ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateNumberRequest {
    pub id: String,
    #[serde(flatten)]
    pub patch: NumberPatch,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub uid: String,
    #[serde(flatten)]
    pub patch: UserPatch,
}

#[derive(Debug, Deserialize)]
pub struct DeleteUserRequest {
    pub uid: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct BulkPricingRequest {
    pub packages: Vec<BulkPackage>,
}

pub async fn stats(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let stats = state.admin.stats().await?;
    Ok(Json(ApiResponse::ok(stats, "stats loaded")))
}

pub async fn add_credit(
    State(state): State<AppState>,
    Json(payload): Json<AddCreditRequest>,
) -> Result<impl IntoResponse, AppError> {
    let receipt = state.admin.add_credit(&payload.uid, &payload.amount).await?;
    Ok(Json(ApiResponse::ok(receipt, "credits added")))
}

pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let users: Vec<UserProfile> = state
        .admin
        .users()
        .await?
        .into_iter()
        .map(UserProfile::from)
        .collect();
    Ok(Json(ApiResponse::ok(users, "users loaded")))
}

pub async fn search_user(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.admin.find_user_by_email(&query.email).await?;
    Ok(Json(ApiResponse::ok(UserProfile::from(user), "user found")))
}

pub async fn update_user(
    State(state): State<AppState>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.admin.update_user(&payload.uid, payload.patch).await?;
    Ok(Json(ApiResponse::ok(UserProfile::from(user), "user updated")))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Json(payload): Json<DeleteUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.admin.delete_user(&payload.uid).await?;
    Ok(Json(ApiResponse::ok(
        json!({ "uid": payload.uid, "deleted": true }),
        "user deleted",
    )))
}

pub async fn list_numbers(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<impl IntoResponse, AppError> {
    let status = match query.status.as_deref() {
        Some(raw) => Some(NumberStatus::parse(raw).ok_or_else(|| {
            AppError::Validation(format!("status: {raw} is not one of available, sold"))
        })?),
        None => None,
    };

    let numbers = state.inventory.list(status).await?;
    Ok(Json(ApiResponse::ok(numbers, "numbers loaded")))
}

pub async fn upload_numbers(
    State(state): State<AppState>,
    Json(payload): Json<UploadNumbersRequest>,
) -> Result<impl IntoResponse, AppError> {
    let summary = state.inventory.upload(payload.numbers).await?;
    Ok(Json(ApiResponse::ok(summary, "numbers uploaded")))
}

pub async fn update_number(
    State(state): State<AppState>,
    Json(payload): Json<UpdateNumberRequest>,
) -> Result<impl IntoResponse, AppError> {
    let number = state.inventory.update(&payload.id, payload.patch).await?;
    Ok(Json(ApiResponse::ok(number, "number updated")))
}

pub async fn delete_numbers(
    State(state): State<AppState>,
    Json(payload): Json<DeleteNumbersRequest>,
) -> Result<impl IntoResponse, AppError> {
    let summary = state.inventory.delete(&payload.ids).await?;
    Ok(Json(ApiResponse::ok(summary, "numbers deleted")))
}

pub async fn delete_sold_numbers(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let summary = state.inventory.delete_sold().await?;
    Ok(Json(ApiResponse::ok(summary, "sold numbers deleted")))
}

pub async fn bulk_pricing(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let settings = state.admin.bulk_pricing().await?;
    Ok(Json(ApiResponse::ok(settings, "bulk pricing loaded")))
}

pub async fn update_bulk_pricing(
    State(state): State<AppState>,
    Json(payload): Json<BulkPricingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let settings = state.admin.update_bulk_pricing(payload.packages).await?;
    Ok(Json(ApiResponse::ok(settings, "bulk pricing updated")))
}

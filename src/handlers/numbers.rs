//! Storefront routes: the public listing and the two purchase endpoints.

use axum::{extract::State, response::IntoResponse, Json};
use bigdecimal::BigDecimal;
use serde::Deserialize;

use crate::error::AppError;
use crate::response::ApiResponse;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyRequest {
    pub uid: String,
    pub number_id: String,
    /// Price the storefront displayed; checked out as-is when positive.
    #[serde(default)]
    pub price: Option<BigDecimal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkBuyRequest {
    pub uid: String,
    pub number_ids: Vec<String>,
    pub total_price: BigDecimal,
    pub quantity: usize,
}

pub async fn available(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let numbers = state.inventory.available().await?;
    Ok(Json(ApiResponse::ok(numbers, "available numbers loaded")))
}

pub async fn buy(
    State(state): State<AppState>,
    Json(payload): Json<BuyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let receipt = state
        .coordinator
        .purchase_single(&payload.uid, &payload.number_id, payload.price.as_ref())
        .await?;

    Ok(Json(ApiResponse::ok(receipt, "purchase completed")))
}

pub async fn bulk_buy(
    State(state): State<AppState>,
    Json(payload): Json<BulkBuyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let receipt = state
        .coordinator
        .purchase_bulk(
            &payload.uid,
            &payload.number_ids,
            &payload.total_price,
            payload.quantity,
        )
        .await?;

    Ok(Json(ApiResponse::ok(receipt, "bulk purchase completed")))
}

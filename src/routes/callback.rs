use axum::{Json, extract::State};

use crate::{
    error::{AppJson, AppResult},
    models::{Order, SettlementCallback},
    response::ApiResponse,
    state::OrderState,
};

/// Receives payment outcomes from the payment service. Safe to call repeatedly.
#[utoipa::path(
    post,
    path = "/internal/payment-callback",
    request_body = SettlementCallback,
    responses(
        (status = 200, description = "Outcome applied", body = ApiResponse<Order>),
        (status = 400, description = "Invalid callback or conflicting payment", body = ApiResponse<String>),
        (status = 404, description = "Order not found", body = ApiResponse<String>),
    ),
    tag = "Settlement"
)]
pub async fn payment_callback(
    State(state): State<OrderState>,
    AppJson(callback): AppJson<SettlementCallback>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = state
        .orders
        .apply_settlement_outcome(callback.order_id, callback.payment_id, callback.payment_status)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

use axum::{Json, extract::State};
use uuid::Uuid;

use crate::{
    dto::payments::PaymentCreateRequest,
    error::{AppJson, AppPath, AppResult},
    models::{Payment, PaymentStatus, SettlementOutcome},
    response::ApiResponse,
    state::PaymentState,
};

#[utoipa::path(
    post,
    path = "/payments",
    request_body = PaymentCreateRequest,
    responses(
        (status = 200, description = "Payment accepted, or the existing payment for the order", body = ApiResponse<Payment>),
        (status = 400, description = "Invalid request, amount mismatch or order service failure", body = ApiResponse<String>),
        (status = 404, description = "Order not found", body = ApiResponse<String>),
    ),
    tag = "Payments"
)]
pub async fn create_payment(
    State(state): State<PaymentState>,
    AppJson(payload): AppJson<PaymentCreateRequest>,
) -> AppResult<Json<ApiResponse<Payment>>> {
    let mut payment = state.payments.create(&payload).await?;
    if state.auto_capture && payment.status == PaymentStatus::Pending {
        payment = state
            .payments
            .finalize(payment.id, SettlementOutcome::Success)
            .await?;
    }
    Ok(Json(ApiResponse::success(payment)))
}

#[utoipa::path(
    get,
    path = "/payments/{id}",
    params(("id" = Uuid, Path, description = "Payment id")),
    responses(
        (status = 200, description = "Payment", body = ApiResponse<Payment>),
        (status = 404, description = "Payment not found", body = ApiResponse<String>),
    ),
    tag = "Payments"
)]
pub async fn get_payment(
    State(state): State<PaymentState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<Payment>>> {
    let payment = state.payments.find_by_id(id).await?;
    Ok(Json(ApiResponse::success(payment)))
}

#[utoipa::path(
    put,
    path = "/payments/success/{id}",
    params(("id" = Uuid, Path, description = "Payment id")),
    responses(
        (status = 200, description = "Payment succeeded", body = ApiResponse<Payment>),
        (status = 400, description = "Payment already finalized", body = ApiResponse<String>),
        (status = 404, description = "Payment not found", body = ApiResponse<String>),
    ),
    tag = "Payments"
)]
pub async fn mark_success(
    State(state): State<PaymentState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<Payment>>> {
    let payment = state.payments.finalize(id, SettlementOutcome::Success).await?;
    Ok(Json(ApiResponse::success(payment)))
}

#[utoipa::path(
    put,
    path = "/payments/failed/{id}",
    params(("id" = Uuid, Path, description = "Payment id")),
    responses(
        (status = 200, description = "Payment failed", body = ApiResponse<Payment>),
        (status = 400, description = "Payment already finalized", body = ApiResponse<String>),
        (status = 404, description = "Payment not found", body = ApiResponse<String>),
    ),
    tag = "Payments"
)]
pub async fn mark_failed(
    State(state): State<PaymentState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<Payment>>> {
    let payment = state.payments.finalize(id, SettlementOutcome::Failed).await?;
    Ok(Json(ApiResponse::success(payment)))
}

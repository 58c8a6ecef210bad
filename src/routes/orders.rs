use axum::{Json, extract::State};
use uuid::Uuid;

use crate::{
    dto::orders::{OrderDeleted, OrderRequest},
    error::{AppJson, AppPath, AppResult},
    models::Order,
    response::ApiResponse,
    state::OrderState,
};

#[utoipa::path(
    post,
    path = "/orders",
    request_body = OrderRequest,
    responses(
        (status = 200, description = "Order created", body = ApiResponse<Order>),
        (status = 400, description = "Invalid order", body = ApiResponse<String>),
    ),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<OrderState>,
    AppJson(payload): AppJson<OrderRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = state.orders.create(&payload).await?;
    Ok(Json(ApiResponse::success(order)))
}

#[utoipa::path(
    get,
    path = "/orders",
    responses(
        (status = 200, description = "Live orders, newest first", body = ApiResponse<Vec<Order>>),
    ),
    tag = "Orders"
)]
pub async fn list_orders(State(state): State<OrderState>) -> AppResult<Json<ApiResponse<Vec<Order>>>> {
    let orders = state.orders.find_all().await?;
    Ok(Json(ApiResponse::success(orders)))
}

#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order", body = ApiResponse<Order>),
        (status = 400, description = "Malformed id", body = ApiResponse<String>),
        (status = 404, description = "Order not found", body = ApiResponse<String>),
    ),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<OrderState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = state.orders.find_by_id(id).await?;
    Ok(Json(ApiResponse::success(order)))
}

#[utoipa::path(
    put,
    path = "/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = OrderRequest,
    responses(
        (status = 200, description = "Order updated", body = ApiResponse<Order>),
        (status = 400, description = "Invalid order or order already paid", body = ApiResponse<String>),
        (status = 404, description = "Order not found", body = ApiResponse<String>),
    ),
    tag = "Orders"
)]
pub async fn update_order(
    State(state): State<OrderState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<OrderRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = state.orders.update(id, &payload).await?;
    Ok(Json(ApiResponse::success(order)))
}

#[utoipa::path(
    delete,
    path = "/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order deleted", body = ApiResponse<OrderDeleted>),
        (status = 400, description = "Order already paid", body = ApiResponse<String>),
        (status = 404, description = "Order not found", body = ApiResponse<String>),
    ),
    tag = "Orders"
)]
pub async fn delete_order(
    State(state): State<OrderState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<OrderDeleted>>> {
    let id = state.orders.delete(id).await?;
    Ok(Json(ApiResponse::success(OrderDeleted {
        message: "order deleted".into(),
        id,
    })))
}

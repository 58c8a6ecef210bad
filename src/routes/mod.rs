use axum::{
    Json, Router,
    http::{StatusCode, Uri},
    routing::{get, post, put},
};

use crate::{
    response::ApiResponse,
    state::{OrderState, PaymentState},
};

pub mod callback;
pub mod doc;
pub mod health;
pub mod orders;
pub mod payments;

/// Routes of the order service, state bound.
pub fn order_app(state: OrderState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/orders", get(orders::list_orders).post(orders::create_order))
        .route(
            "/orders/{id}",
            get(orders::get_order)
                .put(orders::update_order)
                .delete(orders::delete_order),
        )
        .route("/internal/payment-callback", post(callback::payment_callback))
        .merge(doc::order_docs())
        .fallback(not_found)
        .with_state(state)
}

/// Routes of the payment service, state bound.
pub fn payment_app(state: PaymentState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/payments", post(payments::create_payment))
        .route("/payments/{id}", get(payments::get_payment))
        .route("/payments/success/{id}", put(payments::mark_success))
        .route("/payments/failed/{id}", put(payments::mark_failed))
        .merge(doc::payment_docs())
        .fallback(not_found)
        .with_state(state)
}

async fn not_found(uri: Uri) -> (StatusCode, Json<ApiResponse<serde_json::Value>>) {
    let body = ApiResponse::with_status(
        StatusCode::NOT_FOUND,
        serde_json::json!({ "path": uri.path() }),
    );
    (StatusCode::NOT_FOUND, Json(body))
}

use utoipa::{OpenApi, openapi::OpenApi as OpenApiSpec};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        orders::{OrderDeleted, OrderRequest},
        payments::PaymentCreateRequest,
    },
    models::{Order, OrderStatus, Payment, PaymentStatus, SettlementCallback, SettlementOutcome},
    response::ApiResponse,
    routes::{callback, health, orders, payments},
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        orders::create_order,
        orders::list_orders,
        orders::get_order,
        orders::update_order,
        orders::delete_order,
        callback::payment_callback
    ),
    components(
        schemas(
            Order,
            OrderStatus,
            OrderRequest,
            OrderDeleted,
            SettlementCallback,
            SettlementOutcome,
            health::HealthData,
            ApiResponse<Order>,
            ApiResponse<Vec<Order>>,
            ApiResponse<OrderDeleted>,
            ApiResponse<String>
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Orders", description = "Order endpoints"),
        (name = "Settlement", description = "Payment outcome callbacks from the payment service"),
    )
)]
pub struct OrderApiDoc;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        payments::create_payment,
        payments::get_payment,
        payments::mark_success,
        payments::mark_failed
    ),
    components(
        schemas(
            Payment,
            PaymentStatus,
            PaymentCreateRequest,
            health::HealthData,
            ApiResponse<Payment>,
            ApiResponse<String>
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Payments", description = "Payment endpoints"),
    )
)]
pub struct PaymentApiDoc;

pub fn order_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", OrderApiDoc::openapi())
}

pub fn payment_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", PaymentApiDoc::openapi())
}

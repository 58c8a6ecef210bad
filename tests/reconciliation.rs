use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use order_payment_settlement::{
    clients::{
        AmountReconciliationClient, OrderTotalSource, SettlementCallbackDispatcher,
        SettlementNotifier, build_http_client,
    },
    error::AppError,
    models::SettlementOutcome,
};
use serde_json::{Value, json};
use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};
use uuid::Uuid;

async fn spawn(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Order service stand-in that answers every `GET /orders/{id}` with `status` and `body`.
async fn order_stub(status: StatusCode, body: Value) -> AmountReconciliationClient {
    let app = Router::new().route(
        "/orders/{id}",
        get(move || {
            let body = body.clone();
            async move { (status, Json(body)) }
        }),
    );
    let addr = spawn(app).await;
    AmountReconciliationClient::new(
        build_http_client(Duration::from_secs(5)).unwrap(),
        format!("http://{addr}"),
    )
}

#[tokio::test]
async fn reads_total_from_envelope() {
    let client = order_stub(
        StatusCode::OK,
        json!({ "code": 200, "status": "SUCCESS", "data": { "total_amount": 1000 } }),
    )
    .await;
    assert_eq!(client.fetch_order_total(Uuid::new_v4()).await.unwrap(), 1000);
}

#[tokio::test]
async fn accepts_camel_case_total() {
    let client = order_stub(StatusCode::OK, json!({ "data": { "totalAmount": 2100 } })).await;
    assert_eq!(client.fetch_order_total(Uuid::new_v4()).await.unwrap(), 2100);
}

#[tokio::test]
async fn missing_order_maps_to_not_found() {
    let client = order_stub(
        StatusCode::NOT_FOUND,
        json!({ "code": 404, "status": "NOT FOUND", "data": "order not found" }),
    )
    .await;
    let err = client.fetch_order_total(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound("order")));
}

#[tokio::test]
async fn server_error_maps_to_upstream_with_status() {
    let client = order_stub(StatusCode::INTERNAL_SERVER_ERROR, json!({})).await;
    match client.fetch_order_total(Uuid::new_v4()).await.unwrap_err() {
        AppError::Upstream(message) => assert_eq!(message, "order service returned status 500"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn unexpected_body_maps_to_decode_error() {
    let client = order_stub(StatusCode::OK, json!({ "data": { "price": 500 } })).await;
    let err = client.fetch_order_total(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::Decode(_)));
}

#[tokio::test]
async fn unreachable_service_maps_to_upstream() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = AmountReconciliationClient::new(
        build_http_client(Duration::from_secs(1)).unwrap(),
        format!("http://{addr}"),
    );
    let err = client.fetch_order_total(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::Upstream(_)));
}

#[tokio::test]
async fn slow_service_times_out_as_upstream() {
    let app = Router::new().route(
        "/orders/{id}",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Json(json!({ "data": { "total_amount": 1000 } }))
        }),
    );
    let addr = spawn(app).await;
    let client = AmountReconciliationClient::new(
        build_http_client(Duration::from_millis(200)).unwrap(),
        format!("http://{addr}"),
    );
    let err = client.fetch_order_total(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::Upstream(_)));
}

#[tokio::test]
async fn dispatcher_posts_snake_case_callback() {
    let received: Arc<Mutex<Vec<Value>>> = Arc::default();
    let app = Router::new()
        .route(
            "/internal/payment-callback",
            post(
                |State(received): State<Arc<Mutex<Vec<Value>>>>, Json(body): Json<Value>| async move {
                    received.lock().unwrap().push(body);
                    Json(json!({ "code": 200, "status": "SUCCESS", "data": {} }))
                },
            ),
        )
        .with_state(received.clone());
    let addr = spawn(app).await;

    let dispatcher = SettlementCallbackDispatcher::new(
        build_http_client(Duration::from_secs(5)).unwrap(),
        format!("http://{addr}/internal/payment-callback"),
    );
    let order_id = Uuid::new_v4();
    let payment_id = Uuid::new_v4();
    dispatcher
        .notify(order_id, payment_id, SettlementOutcome::Success)
        .await
        .unwrap();

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0]["order_id"], order_id.to_string());
    assert_eq!(received[0]["payment_id"], payment_id.to_string());
    assert_eq!(received[0]["payment_status"], "success");
}

#[tokio::test]
async fn dispatcher_reports_rejection_with_status_and_body() {
    let app = Router::new().route(
        "/internal/payment-callback",
        post(|| async { (StatusCode::CONFLICT, "order already paid by another payment") }),
    );
    let addr = spawn(app).await;

    let dispatcher = SettlementCallbackDispatcher::new(
        build_http_client(Duration::from_secs(5)).unwrap(),
        format!("http://{addr}/internal/payment-callback"),
    );
    match dispatcher
        .notify(Uuid::new_v4(), Uuid::new_v4(), SettlementOutcome::Failed)
        .await
        .unwrap_err()
    {
        AppError::CallbackRejected { status, body } => {
            assert_eq!(status, 409);
            assert!(body.contains("order already paid by another payment"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn dispatcher_treats_server_errors_as_transient() {
    let app = Router::new().route(
        "/internal/payment-callback",
        post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
    );
    let addr = spawn(app).await;

    let dispatcher = SettlementCallbackDispatcher::new(
        build_http_client(Duration::from_secs(5)).unwrap(),
        format!("http://{addr}/internal/payment-callback"),
    );
    match dispatcher
        .notify(Uuid::new_v4(), Uuid::new_v4(), SettlementOutcome::Success)
        .await
        .unwrap_err()
    {
        AppError::Upstream(message) => assert!(message.contains("503")),
        other => panic!("unexpected error: {other:?}"),
    }
}

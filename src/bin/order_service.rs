use std::sync::Arc;

use order_payment_settlement::{
    config::OrderServiceConfig,
    db::{ORDER_MIGRATIONS, create_orm_conn, run_migrations},
    repository::SeaOrmOrderRepository,
    routes::order_app,
    server::{bind_addr, serve, with_http_layers},
    services::OrderLifecycleManager,
    state::OrderState,
    telemetry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init("info,order_payment_settlement=debug");

    let config = OrderServiceConfig::from_env()?;
    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm, ORDER_MIGRATIONS).await?;

    let state = OrderState {
        orders: Arc::new(OrderLifecycleManager::new(Arc::new(
            SeaOrmOrderRepository::new(orm),
        ))),
    };

    let app = with_http_layers(order_app(state), "order_service");
    serve(app, bind_addr(&config.host, config.port)?).await
}

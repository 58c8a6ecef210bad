use std::sync::Arc;

use order_payment_settlement::{
    clients::{AmountReconciliationClient, SettlementCallbackDispatcher, build_http_client},
    config::PaymentServiceConfig,
    db::{PAYMENT_MIGRATIONS, create_orm_conn, run_migrations},
    repository::SeaOrmPaymentRepository,
    routes::payment_app,
    server::{bind_addr, serve, with_http_layers},
    services::{PaymentLifecycleManager, SettlementRelay},
    state::PaymentState,
    telemetry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init("info,order_payment_settlement=debug");

    let config = PaymentServiceConfig::from_env()?;
    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm, PAYMENT_MIGRATIONS).await?;

    let http = build_http_client(config.order_service_timeout)?;
    let store = Arc::new(SeaOrmPaymentRepository::new(orm));
    let notifier = Arc::new(SettlementCallbackDispatcher::new(
        http.clone(),
        config.order_callback_url.clone(),
    ));
    let totals = Arc::new(AmountReconciliationClient::new(
        http,
        config.order_service_url.clone(),
    ));

    let relay = SettlementRelay::new(store.clone(), notifier.clone(), config.relay.clone());
    let mut relay_task = tokio::spawn(relay.run());

    let state = PaymentState {
        payments: Arc::new(PaymentLifecycleManager::new(
            store,
            totals,
            notifier,
            config.relay.retry,
        )),
        auto_capture: config.auto_capture,
    };

    tracing::info!(
        order_service_url = %config.order_service_url,
        callback_url = %config.order_callback_url,
        auto_capture = config.auto_capture,
        "payment service configured"
    );

    let app = with_http_layers(payment_app(state), "payment_service");
    let addr = bind_addr(&config.host, config.port)?;
    tokio::select! {
        result = serve(app, addr) => {
            relay_task.abort();
            result
        }
        joined = &mut relay_task => match joined {
            Ok(()) => Err(anyhow::anyhow!("settlement relay stopped")),
            Err(err) => {
                tracing::error!(error = %err, "settlement relay crashed");
                Err(anyhow::anyhow!("settlement relay crashed: {err}"))
            }
        },
    }
}

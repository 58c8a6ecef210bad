pub mod order_service;
pub mod payment_service;
pub mod settlement_relay;

pub use order_service::OrderLifecycleManager;
pub use payment_service::PaymentLifecycleManager;
pub use settlement_relay::{RelayConfig, RetryPolicy, SettlementRelay};

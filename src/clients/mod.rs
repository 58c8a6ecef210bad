//! Outbound calls from the payment service to the order service.

use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::SettlementOutcome;

pub mod reconciliation;
pub mod settlement;

pub use reconciliation::AmountReconciliationClient;
pub use settlement::SettlementCallbackDispatcher;

/// Source of an order's authoritative total, consulted before a payment is accepted.
#[async_trait]
pub trait OrderTotalSource: Send + Sync {
    async fn fetch_order_total(&self, order_id: Uuid) -> AppResult<i64>;
}

/// Delivers a payment's terminal outcome to the order side. One attempt per call.
#[async_trait]
pub trait SettlementNotifier: Send + Sync {
    async fn notify(
        &self,
        order_id: Uuid,
        payment_id: Uuid,
        outcome: SettlementOutcome,
    ) -> AppResult<()>;
}

/// Shared HTTP client for every outbound call; `timeout` bounds each request end to end.
pub fn build_http_client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    Ok(client)
}

fn trim_base_url(url: impl Into<String>) -> String {
    let url: String = url.into();
    url.trim_end_matches('/').to_string()
}

use async_trait::async_trait;
use uuid::Uuid;

use super::{SettlementNotifier, trim_base_url};
use crate::error::{AppError, AppResult};
use crate::models::{SettlementCallback, SettlementOutcome};

/// POSTs settlement callbacks to the order service.
#[derive(Clone)]
pub struct SettlementCallbackDispatcher {
    http: reqwest::Client,
    callback_url: String,
}

impl SettlementCallbackDispatcher {
    pub fn new(http: reqwest::Client, callback_url: impl Into<String>) -> Self {
        Self {
            http,
            callback_url: trim_base_url(callback_url),
        }
    }
}

#[async_trait]
impl SettlementNotifier for SettlementCallbackDispatcher {
    async fn notify(
        &self,
        order_id: Uuid,
        payment_id: Uuid,
        outcome: SettlementOutcome,
    ) -> AppResult<()> {
        let body = SettlementCallback {
            order_id,
            payment_id,
            payment_status: outcome,
        };

        let response = self
            .http
            .post(&self.callback_url)
            .json(&body)
            .send()
            .await
            .map_err(|err| AppError::Upstream(format!("failed to send settlement callback: {err}")))?;

        let status = response.status();
        if status.is_client_error() {
            return Err(AppError::CallbackRejected {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "callback failed with status {}: {}",
                status.as_u16(),
                text
            )));
        }

        tracing::info!(%order_id, %payment_id, outcome = outcome.as_str(), "settlement callback delivered");
        Ok(())
    }
}

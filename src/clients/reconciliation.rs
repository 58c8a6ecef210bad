use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use uuid::Uuid;

use super::{OrderTotalSource, trim_base_url};
use crate::error::{AppError, AppResult};

#[derive(Debug, Deserialize)]
struct OrderEnvelope {
    data: OrderTotal,
}

#[derive(Debug, Deserialize)]
struct OrderTotal {
    #[serde(alias = "totalAmount")]
    total_amount: i64,
}

/// Reads `data.total_amount` from `GET {base_url}/orders/{id}`. No retries.
#[derive(Clone)]
pub struct AmountReconciliationClient {
    http: reqwest::Client,
    base_url: String,
}

impl AmountReconciliationClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: trim_base_url(base_url),
        }
    }

    fn order_url(&self, order_id: Uuid) -> String {
        format!("{}/orders/{}", self.base_url, order_id)
    }
}

#[async_trait]
impl OrderTotalSource for AmountReconciliationClient {
    async fn fetch_order_total(&self, order_id: Uuid) -> AppResult<i64> {
        let response = self
            .http
            .get(self.order_url(order_id))
            .send()
            .await
            .map_err(|err| AppError::Upstream(format!("failed to fetch order: {err}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound("order"));
        }
        if !status.is_success() {
            return Err(AppError::Upstream(format!(
                "order service returned status {}",
                status.as_u16()
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| AppError::Upstream(format!("failed to read order response: {err}")))?;
        let envelope: OrderEnvelope = serde_json::from_slice(&body)
            .map_err(|err| AppError::Decode(format!("failed to decode order response: {err}")))?;

        tracing::debug!(%order_id, total_amount = envelope.data.total_amount, "order total fetched");
        Ok(envelope.data.total_amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_url_ignores_trailing_slash() {
        let id = Uuid::new_v4();
        let client = AmountReconciliationClient::new(reqwest::Client::new(), "http://orders:3000/");
        assert_eq!(client.order_url(id), format!("http://orders:3000/orders/{id}"));
    }

    #[test]
    fn envelope_accepts_either_total_spelling() {
        let snake: OrderEnvelope =
            serde_json::from_str(r#"{"code":200,"status":"SUCCESS","data":{"total_amount":1000}}"#).unwrap();
        let camel: OrderEnvelope = serde_json::from_str(r#"{"data":{"totalAmount":1000}}"#).unwrap();
        assert_eq!(snake.data.total_amount, 1000);
        assert_eq!(camel.data.total_amount, 1000);
    }
}

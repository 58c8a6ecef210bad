use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Body of `POST /payments`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PaymentCreateRequest {
    #[serde(default, alias = "orderId")]
    pub order_id: Option<Uuid>,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub provider: String,
}

impl PaymentCreateRequest {
    /// Returns the referenced order id once the request shape is valid.
    pub fn validate(&self) -> AppResult<Uuid> {
        let order_id = self
            .order_id
            .filter(|id| !id.is_nil())
            .ok_or_else(|| AppError::Validation("order id required".into()))?;
        if self.amount <= 0 {
            return Err(AppError::Validation("amount must be greater than 0".into()));
        }
        if self.provider.trim().is_empty() {
            return Err(AppError::Validation("provider required".into()));
        }
        Ok(order_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nil_or_missing_order_id_is_invalid() {
        let missing: PaymentCreateRequest =
            serde_json::from_str(r#"{"amount":1000,"provider":"stripe"}"#).unwrap();
        assert!(missing.validate().is_err());

        let nil = PaymentCreateRequest {
            order_id: Some(Uuid::nil()),
            amount: 1000,
            provider: "stripe".into(),
        };
        assert!(nil.validate().is_err());
    }

    #[test]
    fn valid_request_yields_order_id() {
        let order_id = Uuid::new_v4();
        let body = serde_json::json!({ "orderId": order_id, "amount": 1000, "provider": "stripe" });
        let request: PaymentCreateRequest = serde_json::from_value(body).unwrap();
        assert_eq!(request.validate().unwrap(), order_id);
    }

    #[test]
    fn amount_and_provider_are_checked() {
        let order_id = Some(Uuid::new_v4());
        let zero = PaymentCreateRequest { order_id, amount: 0, provider: "stripe".into() };
        let blank = PaymentCreateRequest { order_id, amount: 10, provider: " ".into() };
        assert!(zero.validate().is_err());
        assert!(blank.validate().is_err());
    }
}

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Body of `POST /orders` and `PUT /orders/{id}`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct OrderRequest {
    #[serde(default, alias = "itemName")]
    pub item_name: String,
    #[serde(default)]
    pub quantity: i32,
    #[serde(default)]
    pub price: i64,
}

impl OrderRequest {
    pub fn validate(&self) -> AppResult<()> {
        if self.item_name.trim().is_empty() {
            return Err(AppError::Validation("item name required".into()));
        }
        if self.quantity <= 0 {
            return Err(AppError::Validation(
                "quantity must be greater than 0".into(),
            ));
        }
        if self.price <= 0 {
            return Err(AppError::Validation("price must be greater than 0".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderDeleted {
    pub message: String,
    pub id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(item_name: &str, quantity: i32, price: i64) -> OrderRequest {
        OrderRequest {
            item_name: item_name.into(),
            quantity,
            price,
        }
    }

    #[test]
    fn rejects_each_out_of_range_field() {
        assert!(request("Widget", 2, 500).validate().is_ok());
        for bad in [request("", 2, 500), request("  ", 2, 500), request("Widget", 0, 500), request("Widget", 2, -1)] {
            assert!(matches!(bad.validate(), Err(AppError::Validation(_))));
        }
    }

    #[test]
    fn missing_fields_deserialize_to_invalid_values() {
        let parsed: OrderRequest = serde_json::from_str(r#"{"itemName":"Widget"}"#).unwrap();
        assert_eq!(parsed.item_name, "Widget");
        assert!(parsed.validate().is_err());
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Failed => "failed",
        }
    }
}

impl TryFrom<&str> for OrderStatus {
    type Error = AppError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(OrderStatus::Pending),
            "paid" => Ok(OrderStatus::Paid),
            "failed" => Ok(OrderStatus::Failed),
            other => Err(AppError::Internal(anyhow::anyhow!(
                "unknown order status {other:?}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Success => "success",
            PaymentStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

impl TryFrom<&str> for PaymentStatus {
    type Error = AppError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(PaymentStatus::Pending),
            "success" => Ok(PaymentStatus::Success),
            "failed" => Ok(PaymentStatus::Failed),
            other => Err(AppError::Internal(anyhow::anyhow!(
                "unknown payment status {other:?}"
            ))),
        }
    }
}

/// Terminal outcome of a payment, as carried by the settlement callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SettlementOutcome {
    Success,
    Failed,
}

impl SettlementOutcome {
    pub fn as_str(&self) -> &'static str {
        self.payment_status().as_str()
    }

    pub fn payment_status(&self) -> PaymentStatus {
        match self {
            SettlementOutcome::Success => PaymentStatus::Success,
            SettlementOutcome::Failed => PaymentStatus::Failed,
        }
    }
}

impl TryFrom<&str> for SettlementOutcome {
    type Error = AppError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "success" => Ok(SettlementOutcome::Success),
            "failed" => Ok(SettlementOutcome::Failed),
            other => Err(AppError::Internal(anyhow::anyhow!(
                "unknown settlement outcome {other:?}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub item_name: String,
    pub quantity: i32,
    pub price: i64,
    pub total_amount: i64,
    pub status: OrderStatus,
    pub payment_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn new(item_name: String, quantity: i32, price: i64, now: DateTime<Utc>) -> AppResult<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            total_amount: total_amount(price, quantity)?,
            item_name,
            quantity,
            price,
            status: OrderStatus::Pending,
            payment_id: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    pub fn is_paid(&self) -> bool {
        self.status == OrderStatus::Paid
    }
}

/// `price * quantity`, rejecting results that do not fit the amount column.
pub fn total_amount(price: i64, quantity: i32) -> AppResult<i64> {
    price
        .checked_mul(i64::from(quantity))
        .ok_or_else(|| AppError::Validation("total amount is out of range".into()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub amount: i64,
    pub provider: String,
    pub status: PaymentStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Payment {
    pub fn pending(order_id: Uuid, amount: i64, provider: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            amount,
            provider,
            status: PaymentStatus::Pending,
            paid_at: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Applies a terminal outcome. Only valid from `pending`.
    pub fn finalize(&mut self, outcome: SettlementOutcome, now: DateTime<Utc>) -> AppResult<()> {
        if self.status.is_terminal() {
            return Err(AppError::AlreadyFinalized);
        }
        self.status = outcome.payment_status();
        self.paid_at = match outcome {
            SettlementOutcome::Success => Some(now),
            SettlementOutcome::Failed => None,
        };
        self.updated_at = now;
        Ok(())
    }
}

/// Body of `POST /internal/payment-callback`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SettlementCallback {
    #[serde(alias = "orderId")]
    pub order_id: Uuid,
    #[serde(alias = "paymentId")]
    pub payment_id: Uuid,
    #[serde(alias = "paymentStatus")]
    pub payment_status: SettlementOutcome,
}

/// Outbox row: a settlement callback that still has to reach the order service.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementNotification {
    pub id: Uuid,
    pub payment_id: Uuid,
    pub order_id: Uuid,
    pub outcome: SettlementOutcome,
    pub attempts: i32,
    pub next_attempt_at: DateTime<Utc>,
    pub last_error: Option<String>,
    pub delivered_at: Option<DateTime<Utc>>,
    /// Set when delivery was abandoned; the relay skips the entry from then on.
    pub failed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl SettlementNotification {
    pub fn for_payment(payment: &Payment, outcome: SettlementOutcome, first_attempt_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            payment_id: payment.id,
            order_id: payment.order_id,
            outcome,
            attempts: 0,
            next_attempt_at: first_attempt_at,
            last_error: None,
            delivered_at: None,
            failed_at: None,
            created_at: payment.updated_at,
        }
    }

    pub fn callback(&self) -> SettlementCallback {
        SettlementCallback {
            order_id: self.order_id,
            payment_id: self.payment_id,
            payment_status: self.outcome,
        }
    }
}

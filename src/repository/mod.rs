//! Record store ports.
//!
//! Every method is one local transaction. Mutations that depend on a prior read take the
//! expected state as a guard and report whether the guard still held, so callers never
//! rely on a separate read-then-write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{Order, OrderStatus, Payment, SettlementNotification, SettlementOutcome};

pub mod memory;
pub mod orders;
pub mod payments;

pub use memory::{InMemoryOrderRepository, InMemoryPaymentRepository};
pub use orders::SeaOrmOrderRepository;
pub use payments::SeaOrmPaymentRepository;

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn insert(&self, order: Order) -> AppResult<Order>;

    /// Live (not soft-deleted) order by id.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Order>>;

    /// Live orders, newest first.
    async fn find_all(&self) -> AppResult<Vec<Order>>;

    /// Writes every mutable field of `order` if the stored row is live and its status is
    /// still `expected`. `None` means the guard failed and nothing was written.
    async fn update_if_status(&self, order: &Order, expected: OrderStatus) -> AppResult<Option<Order>>;

    /// Sets `status = paid` and `payment_id` on a live pending order, leaving every other
    /// field as stored. `None` means the order was not live and pending.
    async fn mark_paid_if_pending(
        &self,
        id: Uuid,
        payment_id: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Order>>;

    /// Tombstones the order if it is live and its status is still `expected`.
    async fn soft_delete_if_status(
        &self,
        id: Uuid,
        expected: OrderStatus,
        at: DateTime<Utc>,
    ) -> AppResult<bool>;
}

/// Result of an insert that is unique on the live `order_id`.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentInsert {
    Created(Payment),
    /// Another writer already holds the order; this is its payment.
    Existing(Payment),
}

impl PaymentInsert {
    pub fn into_payment(self) -> Payment {
        match self {
            PaymentInsert::Created(payment) | PaymentInsert::Existing(payment) => payment,
        }
    }
}

/// Settlement notifications waiting for delivery to the order service.
#[async_trait]
pub trait SettlementOutbox: Send + Sync {
    /// Undelivered, not abandoned entries whose `next_attempt_at` is not after `now`,
    /// oldest first.
    async fn due_notifications(
        &self,
        now: DateTime<Utc>,
        limit: u64,
    ) -> AppResult<Vec<SettlementNotification>>;

    async fn mark_delivered(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()>;

    async fn reschedule(
        &self,
        id: Uuid,
        attempts: i32,
        next_attempt_at: DateTime<Utc>,
        last_error: &str,
    ) -> AppResult<()>;

    /// Abandons an undelivered entry so it is never due again.
    async fn mark_failed(
        &self,
        id: Uuid,
        attempts: i32,
        at: DateTime<Utc>,
        last_error: &str,
    ) -> AppResult<()>;
}

#[async_trait]
pub trait PaymentRepository: SettlementOutbox {
    async fn insert_unique(&self, payment: Payment) -> AppResult<PaymentInsert>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Payment>>;

    async fn find_live_by_order_id(&self, order_id: Uuid) -> AppResult<Option<Payment>>;

    /// Moves a pending payment to `outcome` and records its outbox entry in the same
    /// transaction. `None` when the payment is missing or no longer pending.
    async fn finalize(
        &self,
        id: Uuid,
        outcome: SettlementOutcome,
        at: DateTime<Utc>,
        first_attempt_at: DateTime<Utc>,
    ) -> AppResult<Option<(Payment, SettlementNotification)>>;
}

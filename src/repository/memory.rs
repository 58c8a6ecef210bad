use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{OrderRepository, PaymentInsert, PaymentRepository, SettlementOutbox};
use crate::error::AppResult;
use crate::models::{Order, OrderStatus, Payment, PaymentStatus, SettlementNotification, SettlementOutcome};

/// A thread-safe in-memory order store.
///
/// Each method holds the lock for its whole body, which gives the same per-operation
/// isolation as a database transaction.
#[derive(Default, Clone)]
pub struct InMemoryOrderRepository {
    orders: Arc<RwLock<HashMap<Uuid, Order>>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn insert(&self, order: Order) -> AppResult<Order> {
        let mut orders = self.orders.write().await;
        orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders.get(&id).filter(|o| o.deleted_at.is_none()).cloned())
    }

    async fn find_all(&self) -> AppResult<Vec<Order>> {
        let orders = self.orders.read().await;
        let mut live: Vec<Order> = orders
            .values()
            .filter(|o| o.deleted_at.is_none())
            .cloned()
            .collect();
        live.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(live)
    }

    async fn update_if_status(&self, order: &Order, expected: OrderStatus) -> AppResult<Option<Order>> {
        let mut orders = self.orders.write().await;
        match orders.get_mut(&order.id) {
            Some(stored) if stored.deleted_at.is_none() && stored.status == expected => {
                *stored = Order {
                    created_at: stored.created_at,
                    deleted_at: None,
                    ..order.clone()
                };
                Ok(Some(stored.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn mark_paid_if_pending(
        &self,
        id: Uuid,
        payment_id: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Order>> {
        let mut orders = self.orders.write().await;
        match orders.get_mut(&id) {
            Some(stored) if stored.deleted_at.is_none() && stored.status == OrderStatus::Pending => {
                stored.status = OrderStatus::Paid;
                stored.payment_id = Some(payment_id);
                stored.updated_at = at;
                Ok(Some(stored.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn soft_delete_if_status(
        &self,
        id: Uuid,
        expected: OrderStatus,
        at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut orders = self.orders.write().await;
        match orders.get_mut(&id) {
            Some(stored) if stored.deleted_at.is_none() && stored.status == expected => {
                stored.deleted_at = Some(at);
                stored.updated_at = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[derive(Default)]
struct PaymentTables {
    payments: HashMap<Uuid, Payment>,
    outbox: Vec<SettlementNotification>,
    inserts: usize,
}

/// A thread-safe in-memory payment store with its settlement outbox.
#[derive(Default, Clone)]
pub struct InMemoryPaymentRepository {
    tables: Arc<RwLock<PaymentTables>>,
}

impl InMemoryPaymentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of payment rows actually written.
    pub async fn insert_count(&self) -> usize {
        self.tables.read().await.inserts
    }

    /// Snapshot of every outbox entry, delivered or not.
    pub async fn notifications(&self) -> Vec<SettlementNotification> {
        self.tables.read().await.outbox.clone()
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn insert_unique(&self, payment: Payment) -> AppResult<PaymentInsert> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables
            .payments
            .values()
            .find(|p| p.order_id == payment.order_id && p.deleted_at.is_none())
        {
            return Ok(PaymentInsert::Existing(existing.clone()));
        }
        tables.payments.insert(payment.id, payment.clone());
        tables.inserts += 1;
        Ok(PaymentInsert::Created(payment))
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Payment>> {
        let tables = self.tables.read().await;
        Ok(tables
            .payments
            .get(&id)
            .filter(|p| p.deleted_at.is_none())
            .cloned())
    }

    async fn find_live_by_order_id(&self, order_id: Uuid) -> AppResult<Option<Payment>> {
        let tables = self.tables.read().await;
        Ok(tables
            .payments
            .values()
            .find(|p| p.order_id == order_id && p.deleted_at.is_none())
            .cloned())
    }

    async fn finalize(
        &self,
        id: Uuid,
        outcome: SettlementOutcome,
        at: DateTime<Utc>,
        first_attempt_at: DateTime<Utc>,
    ) -> AppResult<Option<(Payment, SettlementNotification)>> {
        let mut tables = self.tables.write().await;
        let payment = match tables.payments.get_mut(&id) {
            Some(p) if p.deleted_at.is_none() && p.status == PaymentStatus::Pending => p,
            _ => return Ok(None),
        };
        payment.finalize(outcome, at)?;
        let payment = payment.clone();

        let notification = SettlementNotification::for_payment(&payment, outcome, first_attempt_at);
        tables.outbox.push(notification.clone());
        Ok(Some((payment, notification)))
    }
}

#[async_trait]
impl SettlementOutbox for InMemoryPaymentRepository {
    async fn due_notifications(
        &self,
        now: DateTime<Utc>,
        limit: u64,
    ) -> AppResult<Vec<SettlementNotification>> {
        let tables = self.tables.read().await;
        let mut due: Vec<SettlementNotification> = tables
            .outbox
            .iter()
            .filter(|n| n.delivered_at.is_none() && n.failed_at.is_none() && n.next_attempt_at <= now)
            .cloned()
            .collect();
        due.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        due.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(due)
    }

    async fn mark_delivered(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(entry) = tables.outbox.iter_mut().find(|n| n.id == id) {
            entry.delivered_at = Some(at);
            entry.last_error = None;
        }
        Ok(())
    }

    async fn reschedule(
        &self,
        id: Uuid,
        attempts: i32,
        next_attempt_at: DateTime<Utc>,
        last_error: &str,
    ) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(entry) = tables
            .outbox
            .iter_mut()
            .find(|n| n.id == id && n.delivered_at.is_none())
        {
            entry.attempts = attempts;
            entry.next_attempt_at = next_attempt_at;
            entry.last_error = Some(last_error.to_string());
        }
        Ok(())
    }

    async fn mark_failed(
        &self,
        id: Uuid,
        attempts: i32,
        at: DateTime<Utc>,
        last_error: &str,
    ) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(entry) = tables
            .outbox
            .iter_mut()
            .find(|n| n.id == id && n.delivered_at.is_none())
        {
            entry.attempts = attempts;
            entry.failed_at = Some(at);
            entry.last_error = Some(last_error.to_string());
        }
        Ok(())
    }
}

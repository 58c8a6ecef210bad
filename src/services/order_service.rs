use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    dto::orders::OrderRequest,
    error::{AppError, AppResult},
    models::{Order, SettlementOutcome, total_amount},
    repository::OrderRepository,
};

/// Owns order state: creation, edits while unpaid, soft delete and settlement.
pub struct OrderLifecycleManager {
    orders: Arc<dyn OrderRepository>,
}

impl OrderLifecycleManager {
    pub fn new(orders: Arc<dyn OrderRepository>) -> Self {
        Self { orders }
    }

    pub async fn create(&self, request: &OrderRequest) -> AppResult<Order> {
        request.validate()?;

        let order = Order::new(
            request.item_name.clone(),
            request.quantity,
            request.price,
            Utc::now(),
        )?;
        let order = self.orders.insert(order).await?;

        tracing::info!(
            order_id = %order.id,
            total_amount = order.total_amount,
            "order created"
        );
        Ok(order)
    }

    pub async fn update(&self, id: Uuid, request: &OrderRequest) -> AppResult<Order> {
        let current = self.find_by_id(id).await?;
        if current.is_paid() {
            return Err(AppError::Conflict("paid order cannot be updated".into()));
        }
        request.validate()?;

        let next = Order {
            item_name: request.item_name.clone(),
            quantity: request.quantity,
            price: request.price,
            total_amount: total_amount(request.price, request.quantity)?,
            updated_at: Utc::now(),
            ..current.clone()
        };

        match self.orders.update_if_status(&next, current.status).await? {
            Some(order) => {
                tracing::info!(order_id = %order.id, total_amount = order.total_amount, "order updated");
                Ok(order)
            }
            None => Err(self.lost_race(id, "paid order cannot be updated").await),
        }
    }

    /// Soft-deletes an unpaid order and returns its id.
    pub async fn delete(&self, id: Uuid) -> AppResult<Uuid> {
        let current = self.find_by_id(id).await?;
        if current.is_paid() {
            return Err(AppError::Conflict("paid order cannot be deleted".into()));
        }

        if !self
            .orders
            .soft_delete_if_status(id, current.status, Utc::now())
            .await?
        {
            return Err(self.lost_race(id, "paid order cannot be deleted").await);
        }

        tracing::info!(order_id = %id, "order deleted");
        Ok(id)
    }

    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Order> {
        self.orders
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound("order"))
    }

    pub async fn find_all(&self) -> AppResult<Vec<Order>> {
        self.orders.find_all().await
    }

    /// Applies a payment's terminal outcome delivered by the payment service.
    ///
    /// Redelivery of an already applied success is a no-op. A failed outcome leaves the
    /// order pending so the buyer can pay again.
    pub async fn apply_settlement_outcome(
        &self,
        order_id: Uuid,
        payment_id: Uuid,
        outcome: SettlementOutcome,
    ) -> AppResult<Order> {
        let order = self.find_by_id(order_id).await?;

        if outcome == SettlementOutcome::Failed {
            tracing::info!(%order_id, %payment_id, "payment failed, order left unchanged");
            return Ok(order);
        }

        if order.is_paid() {
            return settled_by(order, payment_id);
        }

        // writes status and payment_id only
        match self
            .orders
            .mark_paid_if_pending(order_id, payment_id, Utc::now())
            .await?
        {
            Some(order) => {
                tracing::info!(%order_id, %payment_id, "order paid");
                Ok(order)
            }
            None => match self.orders.find_by_id(order_id).await? {
                Some(current) if current.is_paid() => settled_by(current, payment_id),
                Some(_) => Err(AppError::Conflict("order was modified concurrently".into())),
                None => Err(AppError::NotFound("order")),
            },
        }
    }

    /// Error for a guarded write that no longer matched the stored row.
    async fn lost_race(&self, id: Uuid, paid_message: &str) -> AppError {
        match self.orders.find_by_id(id).await {
            Ok(None) => AppError::NotFound("order"),
            Ok(Some(order)) if order.is_paid() => AppError::Conflict(paid_message.to_string()),
            Ok(Some(_)) => AppError::Conflict("order was modified concurrently".into()),
            Err(err) => err,
        }
    }
}

fn settled_by(order: Order, payment_id: Uuid) -> AppResult<Order> {
    if order.payment_id == Some(payment_id) {
        Ok(order)
    } else {
        Err(AppError::Conflict("order already paid by another payment".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrderStatus;
    use crate::repository::InMemoryOrderRepository;
    use async_trait::async_trait;
    use chrono::DateTime;

    /// Applies a buyer edit right before the settlement write lands.
    struct EditBeforeSettle {
        inner: InMemoryOrderRepository,
        edit: OrderRequest,
    }

    #[async_trait]
    impl OrderRepository for EditBeforeSettle {
        async fn insert(&self, order: Order) -> AppResult<Order> {
            self.inner.insert(order).await
        }

        async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Order>> {
            self.inner.find_by_id(id).await
        }

        async fn find_all(&self) -> AppResult<Vec<Order>> {
            self.inner.find_all().await
        }

        async fn update_if_status(&self, order: &Order, expected: OrderStatus) -> AppResult<Option<Order>> {
            self.inner.update_if_status(order, expected).await
        }

        async fn mark_paid_if_pending(
            &self,
            id: Uuid,
            payment_id: Uuid,
            at: DateTime<Utc>,
        ) -> AppResult<Option<Order>> {
            if let Some(current) = self.inner.find_by_id(id).await? {
                let edited = Order {
                    item_name: self.edit.item_name.clone(),
                    quantity: self.edit.quantity,
                    price: self.edit.price,
                    total_amount: total_amount(self.edit.price, self.edit.quantity)?,
                    ..current
                };
                self.inner.update_if_status(&edited, OrderStatus::Pending).await?;
            }
            self.inner.mark_paid_if_pending(id, payment_id, at).await
        }

        async fn soft_delete_if_status(
            &self,
            id: Uuid,
            expected: OrderStatus,
            at: DateTime<Utc>,
        ) -> AppResult<bool> {
            self.inner.soft_delete_if_status(id, expected, at).await
        }
    }

    fn manager() -> OrderLifecycleManager {
        OrderLifecycleManager::new(Arc::new(InMemoryOrderRepository::new()))
    }

    fn request(item_name: &str, quantity: i32, price: i64) -> OrderRequest {
        OrderRequest {
            item_name: item_name.into(),
            quantity,
            price,
        }
    }

    #[tokio::test]
    async fn create_derives_total_and_starts_pending() {
        let orders = manager();
        let order = orders.create(&request("Widget", 2, 500)).await.unwrap();
        assert_eq!(order.total_amount, 1000);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(orders.find_by_id(order.id).await.unwrap(), order);
    }

    #[tokio::test]
    async fn create_rejects_invalid_fields() {
        let orders = manager();
        let err = orders.create(&request("Widget", 0, 500)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(orders.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_recomputes_total() {
        let orders = manager();
        let order = orders.create(&request("Widget", 2, 500)).await.unwrap();
        let updated = orders
            .update(order.id, &request("Gadget", 3, 700))
            .await
            .unwrap();
        assert_eq!(updated.item_name, "Gadget");
        assert_eq!(updated.total_amount, 2100);
        assert_eq!(updated.created_at, order.created_at);
    }

    #[tokio::test]
    async fn paid_order_is_frozen() {
        let orders = manager();
        let order = orders.create(&request("Widget", 2, 500)).await.unwrap();
        let payment_id = Uuid::new_v4();
        orders
            .apply_settlement_outcome(order.id, payment_id, SettlementOutcome::Success)
            .await
            .unwrap();

        let err = orders
            .update(order.id, &request("Widget", 3, 500))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // paid check runs before field validation
        let err = orders.update(order.id, &request("", 0, 0)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let err = orders.delete(order.id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let stored = orders.find_by_id(order.id).await.unwrap();
        assert_eq!(stored.total_amount, 1000);
        assert_eq!(stored.payment_id, Some(payment_id));
    }

    #[tokio::test]
    async fn deleted_order_disappears() {
        let orders = manager();
        let order = orders.create(&request("Widget", 2, 500)).await.unwrap();
        assert_eq!(orders.delete(order.id).await.unwrap(), order.id);

        assert!(matches!(
            orders.find_by_id(order.id).await.unwrap_err(),
            AppError::NotFound("order")
        ));
        assert!(orders.find_all().await.unwrap().is_empty());
        assert!(matches!(
            orders.delete(order.id).await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn settlement_success_is_idempotent() {
        let orders = manager();
        let order = orders.create(&request("Widget", 2, 500)).await.unwrap();
        let payment_id = Uuid::new_v4();

        let first = orders
            .apply_settlement_outcome(order.id, payment_id, SettlementOutcome::Success)
            .await
            .unwrap();
        let second = orders
            .apply_settlement_outcome(order.id, payment_id, SettlementOutcome::Success)
            .await
            .unwrap();
        assert_eq!(first.status, OrderStatus::Paid);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn success_from_another_payment_conflicts() {
        let orders = manager();
        let order = orders.create(&request("Widget", 2, 500)).await.unwrap();
        orders
            .apply_settlement_outcome(order.id, Uuid::new_v4(), SettlementOutcome::Success)
            .await
            .unwrap();

        let err = orders
            .apply_settlement_outcome(order.id, Uuid::new_v4(), SettlementOutcome::Success)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn failed_outcome_leaves_order_pending() {
        let orders = manager();
        let order = orders.create(&request("Widget", 2, 500)).await.unwrap();
        let after = orders
            .apply_settlement_outcome(order.id, Uuid::new_v4(), SettlementOutcome::Failed)
            .await
            .unwrap();
        assert_eq!(after.status, OrderStatus::Pending);
        assert!(after.payment_id.is_none());
    }

    #[tokio::test]
    async fn settlement_for_unknown_order_is_not_found() {
        let err = manager()
            .apply_settlement_outcome(Uuid::new_v4(), Uuid::new_v4(), SettlementOutcome::Success)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound("order")));
    }

    #[tokio::test]
    async fn settlement_keeps_edit_that_landed_first() {
        let store = InMemoryOrderRepository::new();
        let orders = OrderLifecycleManager::new(Arc::new(EditBeforeSettle {
            inner: store.clone(),
            edit: request("Gadget", 2, 700),
        }));
        let order = orders.create(&request("Widget", 2, 500)).await.unwrap();
        let payment_id = Uuid::new_v4();

        let paid = orders
            .apply_settlement_outcome(order.id, payment_id, SettlementOutcome::Success)
            .await
            .unwrap();
        assert_eq!(paid.status, OrderStatus::Paid);
        assert_eq!(paid.payment_id, Some(payment_id));
        assert_eq!(paid.item_name, "Gadget");
        assert_eq!(paid.price, 700);
        assert_eq!(paid.total_amount, 1400);
        assert_eq!(store.find_by_id(order.id).await.unwrap().unwrap(), paid);
    }
}

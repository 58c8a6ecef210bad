use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use uuid::Uuid;

use super::OrderRepository;
use crate::{
    entity::{
        db_time,
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
    },
    error::{AppError, AppResult},
    models::{Order, OrderStatus},
};

/// PostgreSQL-backed order store.
#[derive(Clone)]
pub struct SeaOrmOrderRepository {
    db: DatabaseConnection,
}

impl SeaOrmOrderRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OrderRepository for SeaOrmOrderRepository {
    async fn insert(&self, order: Order) -> AppResult<Order> {
        let model = OrderActive {
            id: Set(order.id),
            item_name: Set(order.item_name),
            quantity: Set(order.quantity),
            price: Set(order.price),
            total_amount: Set(order.total_amount),
            status: Set(order.status.as_str().to_string()),
            payment_id: Set(order.payment_id),
            created_at: Set(db_time(order.created_at)),
            updated_at: Set(db_time(order.updated_at)),
            deleted_at: Set(order.deleted_at.map(db_time)),
        }
        .insert(&self.db)
        .await?;

        order_from_entity(model)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Order>> {
        Orders::find_by_id(id)
            .filter(OrderCol::DeletedAt.is_null())
            .one(&self.db)
            .await?
            .map(order_from_entity)
            .transpose()
    }

    async fn find_all(&self) -> AppResult<Vec<Order>> {
        Orders::find()
            .filter(OrderCol::DeletedAt.is_null())
            .order_by_desc(OrderCol::CreatedAt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(order_from_entity)
            .collect()
    }

    async fn update_if_status(&self, order: &Order, expected: OrderStatus) -> AppResult<Option<Order>> {
        let txn = self.db.begin().await?;

        let result = Orders::update_many()
            .col_expr(OrderCol::ItemName, Expr::value(order.item_name.clone()))
            .col_expr(OrderCol::Quantity, Expr::value(order.quantity))
            .col_expr(OrderCol::Price, Expr::value(order.price))
            .col_expr(OrderCol::TotalAmount, Expr::value(order.total_amount))
            .col_expr(OrderCol::Status, Expr::value(order.status.as_str()))
            .col_expr(OrderCol::PaymentId, Expr::value(order.payment_id))
            .col_expr(OrderCol::UpdatedAt, Expr::value(db_time(order.updated_at)))
            .filter(OrderCol::Id.eq(order.id))
            .filter(OrderCol::Status.eq(expected.as_str()))
            .filter(OrderCol::DeletedAt.is_null())
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            return Ok(None);
        }

        let updated = Orders::find_by_id(order.id)
            .one(&txn)
            .await?
            .ok_or(AppError::NotFound("order"))?;

        txn.commit().await?;

        order_from_entity(updated).map(Some)
    }

    async fn mark_paid_if_pending(
        &self,
        id: Uuid,
        payment_id: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Order>> {
        let txn = self.db.begin().await?;

        let result = Orders::update_many()
            .col_expr(OrderCol::Status, Expr::value(OrderStatus::Paid.as_str()))
            .col_expr(OrderCol::PaymentId, Expr::value(Some(payment_id)))
            .col_expr(OrderCol::UpdatedAt, Expr::value(db_time(at)))
            .filter(OrderCol::Id.eq(id))
            .filter(OrderCol::Status.eq(OrderStatus::Pending.as_str()))
            .filter(OrderCol::DeletedAt.is_null())
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            return Ok(None);
        }

        let paid = Orders::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(AppError::NotFound("order"))?;

        txn.commit().await?;

        order_from_entity(paid).map(Some)
    }

    async fn soft_delete_if_status(
        &self,
        id: Uuid,
        expected: OrderStatus,
        at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = Orders::update_many()
            .col_expr(OrderCol::DeletedAt, Expr::value(Some(db_time(at))))
            .col_expr(OrderCol::UpdatedAt, Expr::value(db_time(at)))
            .filter(OrderCol::Id.eq(id))
            .filter(OrderCol::Status.eq(expected.as_str()))
            .filter(OrderCol::DeletedAt.is_null())
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }
}

fn order_from_entity(model: OrderModel) -> AppResult<Order> {
    Ok(Order {
        id: model.id,
        item_name: model.item_name,
        quantity: model.quantity,
        price: model.price,
        total_amount: model.total_amount,
        status: OrderStatus::try_from(model.status.as_str())?,
        payment_id: model.payment_id,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
        deleted_at: model.deleted_at.map(|dt| dt.with_timezone(&Utc)),
    })
}

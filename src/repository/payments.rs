use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, SqlErr, TransactionTrait,
};
use uuid::Uuid;

use super::{PaymentInsert, PaymentRepository, SettlementOutbox};
use crate::{
    entity::{
        db_time,
        payments::{
            ActiveModel as PaymentActive, Column as PaymentCol, Entity as Payments,
            Model as PaymentModel,
        },
        settlement_outbox::{
            ActiveModel as OutboxActive, Column as OutboxCol, Entity as Outbox,
            Model as OutboxModel,
        },
    },
    error::{AppError, AppResult},
    models::{Payment, PaymentStatus, SettlementNotification, SettlementOutcome},
};

/// PostgreSQL-backed payment store and settlement outbox.
///
/// One live payment per order is enforced by the `payments_live_order_id_key` partial
/// unique index; a violation is reported as [`PaymentInsert::Existing`].
#[derive(Clone)]
pub struct SeaOrmPaymentRepository {
    db: DatabaseConnection,
}

impl SeaOrmPaymentRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PaymentRepository for SeaOrmPaymentRepository {
    async fn insert_unique(&self, payment: Payment) -> AppResult<PaymentInsert> {
        let order_id = payment.order_id;
        let active = PaymentActive {
            id: Set(payment.id),
            order_id: Set(payment.order_id),
            amount: Set(payment.amount),
            provider: Set(payment.provider),
            status: Set(payment.status.as_str().to_string()),
            paid_at: Set(payment.paid_at.map(db_time)),
            created_at: Set(db_time(payment.created_at)),
            updated_at: Set(db_time(payment.updated_at)),
            deleted_at: Set(None),
        };

        match active.insert(&self.db).await {
            Ok(model) => Ok(PaymentInsert::Created(payment_from_entity(model)?)),
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                let existing = self.find_live_by_order_id(order_id).await?.ok_or_else(|| {
                    AppError::Internal(anyhow::anyhow!(
                        "unique violation for order {order_id} without a live payment"
                    ))
                })?;
                Ok(PaymentInsert::Existing(existing))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Payment>> {
        Payments::find_by_id(id)
            .filter(PaymentCol::DeletedAt.is_null())
            .one(&self.db)
            .await?
            .map(payment_from_entity)
            .transpose()
    }

    async fn find_live_by_order_id(&self, order_id: Uuid) -> AppResult<Option<Payment>> {
        Payments::find()
            .filter(PaymentCol::OrderId.eq(order_id))
            .filter(PaymentCol::DeletedAt.is_null())
            .one(&self.db)
            .await?
            .map(payment_from_entity)
            .transpose()
    }

    async fn finalize(
        &self,
        id: Uuid,
        outcome: SettlementOutcome,
        at: DateTime<Utc>,
        first_attempt_at: DateTime<Utc>,
    ) -> AppResult<Option<(Payment, SettlementNotification)>> {
        let txn = self.db.begin().await?;

        let paid_at = match outcome {
            SettlementOutcome::Success => Some(db_time(at)),
            SettlementOutcome::Failed => None,
        };

        let result = Payments::update_many()
            .col_expr(PaymentCol::Status, Expr::value(outcome.payment_status().as_str()))
            .col_expr(PaymentCol::PaidAt, Expr::value(paid_at))
            .col_expr(PaymentCol::UpdatedAt, Expr::value(db_time(at)))
            .filter(PaymentCol::Id.eq(id))
            .filter(PaymentCol::Status.eq(PaymentStatus::Pending.as_str()))
            .filter(PaymentCol::DeletedAt.is_null())
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            return Ok(None);
        }

        let model = Payments::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(AppError::NotFound("payment"))?;
        let payment = payment_from_entity(model)?;

        let notification = SettlementNotification::for_payment(&payment, outcome, first_attempt_at);
        let stored = OutboxActive {
            id: Set(notification.id),
            payment_id: Set(notification.payment_id),
            order_id: Set(notification.order_id),
            outcome: Set(notification.outcome.as_str().to_string()),
            attempts: Set(notification.attempts),
            next_attempt_at: Set(db_time(notification.next_attempt_at)),
            last_error: Set(None),
            delivered_at: Set(None),
            failed_at: Set(None),
            created_at: Set(db_time(notification.created_at)),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        Ok(Some((payment, notification_from_entity(stored)?)))
    }
}

#[async_trait]
impl SettlementOutbox for SeaOrmPaymentRepository {
    async fn due_notifications(
        &self,
        now: DateTime<Utc>,
        limit: u64,
    ) -> AppResult<Vec<SettlementNotification>> {
        Outbox::find()
            .filter(OutboxCol::DeliveredAt.is_null())
            .filter(OutboxCol::FailedAt.is_null())
            .filter(OutboxCol::NextAttemptAt.lte(db_time(now)))
            .order_by_asc(OutboxCol::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await?
            .into_iter()
            .map(notification_from_entity)
            .collect()
    }

    async fn mark_delivered(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        Outbox::update_many()
            .col_expr(OutboxCol::DeliveredAt, Expr::value(Some(db_time(at))))
            .col_expr(OutboxCol::LastError, Expr::value(Option::<String>::None))
            .filter(OutboxCol::Id.eq(id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn reschedule(
        &self,
        id: Uuid,
        attempts: i32,
        next_attempt_at: DateTime<Utc>,
        last_error: &str,
    ) -> AppResult<()> {
        Outbox::update_many()
            .col_expr(OutboxCol::Attempts, Expr::value(attempts))
            .col_expr(OutboxCol::NextAttemptAt, Expr::value(db_time(next_attempt_at)))
            .col_expr(OutboxCol::LastError, Expr::value(Some(last_error.to_string())))
            .filter(OutboxCol::Id.eq(id))
            .filter(OutboxCol::DeliveredAt.is_null())
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn mark_failed(
        &self,
        id: Uuid,
        attempts: i32,
        at: DateTime<Utc>,
        last_error: &str,
    ) -> AppResult<()> {
        Outbox::update_many()
            .col_expr(OutboxCol::Attempts, Expr::value(attempts))
            .col_expr(OutboxCol::FailedAt, Expr::value(Some(db_time(at))))
            .col_expr(OutboxCol::LastError, Expr::value(Some(last_error.to_string())))
            .filter(OutboxCol::Id.eq(id))
            .filter(OutboxCol::DeliveredAt.is_null())
            .exec(&self.db)
            .await?;
        Ok(())
    }
}

fn payment_from_entity(model: PaymentModel) -> AppResult<Payment> {
    Ok(Payment {
        id: model.id,
        order_id: model.order_id,
        amount: model.amount,
        provider: model.provider,
        status: PaymentStatus::try_from(model.status.as_str())?,
        paid_at: model.paid_at.map(|dt| dt.with_timezone(&Utc)),
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
        deleted_at: model.deleted_at.map(|dt| dt.with_timezone(&Utc)),
    })
}

fn notification_from_entity(model: OutboxModel) -> AppResult<SettlementNotification> {
    Ok(SettlementNotification {
        id: model.id,
        payment_id: model.payment_id,
        order_id: model.order_id,
        outcome: SettlementOutcome::try_from(model.outcome.as_str())?,
        attempts: model.attempts,
        next_attempt_at: model.next_attempt_at.with_timezone(&Utc),
        last_error: model.last_error,
        delivered_at: model.delivered_at.map(|dt| dt.with_timezone(&Utc)),
        failed_at: model.failed_at.map(|dt| dt.with_timezone(&Utc)),
        created_at: model.created_at.with_timezone(&Utc),
    })
}

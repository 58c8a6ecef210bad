use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    clients::{OrderTotalSource, SettlementNotifier},
    dto::payments::PaymentCreateRequest,
    error::{AppError, AppResult},
    models::{Payment, SettlementOutcome},
    repository::{PaymentInsert, PaymentRepository},
    services::settlement_relay::{RetryPolicy, deliver_notification},
};

/// Owns the payment state machine: `pending -> {success, failed}`, both terminal.
pub struct PaymentLifecycleManager {
    payments: Arc<dyn PaymentRepository>,
    totals: Arc<dyn OrderTotalSource>,
    notifier: Arc<dyn SettlementNotifier>,
    retry: RetryPolicy,
}

impl PaymentLifecycleManager {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        totals: Arc<dyn OrderTotalSource>,
        notifier: Arc<dyn SettlementNotifier>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            payments,
            totals,
            notifier,
            retry,
        }
    }

    /// Accepts a payment for an order whose total matches `amount`.
    ///
    /// Repeated requests for the same order return the one live payment, including when
    /// two requests race past the lookup.
    pub async fn create(&self, request: &PaymentCreateRequest) -> AppResult<Payment> {
        let order_id = request.validate()?;

        let total = self.totals.fetch_order_total(order_id).await?;
        if request.amount != total {
            return Err(AppError::AmountMismatch {
                amount: request.amount,
                total,
            });
        }

        if let Some(existing) = self.payments.find_live_by_order_id(order_id).await? {
            tracing::info!(payment_id = %existing.id, %order_id, "returning existing payment");
            return Ok(existing);
        }

        let payment = Payment::pending(order_id, request.amount, request.provider.clone(), Utc::now());
        match self.payments.insert_unique(payment).await? {
            PaymentInsert::Created(payment) => {
                tracing::info!(
                    payment_id = %payment.id,
                    %order_id,
                    amount = payment.amount,
                    provider = %payment.provider,
                    "payment created"
                );
                Ok(payment)
            }
            PaymentInsert::Existing(payment) => {
                tracing::info!(payment_id = %payment.id, %order_id, "concurrent create resolved to existing payment");
                Ok(payment)
            }
        }
    }

    /// Moves a pending payment to `outcome` and notifies the order side.
    ///
    /// A failed notification does not fail the call: the outbox entry written with the
    /// payment stays undelivered and the relay picks it up.
    pub async fn finalize(&self, id: Uuid, outcome: SettlementOutcome) -> AppResult<Payment> {
        let current = self.find_by_id(id).await?;
        if current.status.is_terminal() {
            return Err(AppError::AlreadyFinalized);
        }

        let now = Utc::now();
        let first_retry_at = self.retry.next_attempt_at(now, 1);
        let (payment, notification) = self
            .payments
            .finalize(id, outcome, now, first_retry_at)
            .await?
            .ok_or(AppError::AlreadyFinalized)?;

        tracing::info!(
            payment_id = %payment.id,
            order_id = %payment.order_id,
            status = payment.status.as_str(),
            "payment finalized"
        );

        if let Err(err) = deliver_notification(
            self.payments.as_ref(),
            self.notifier.as_ref(),
            &self.retry,
            &notification,
            Utc::now(),
        )
        .await
        {
            tracing::warn!(
                notification_id = %notification.id,
                error = %err,
                "failed to record settlement delivery result"
            );
        }

        Ok(payment)
    }

    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Payment> {
        self.payments
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound("payment"))
    }
}

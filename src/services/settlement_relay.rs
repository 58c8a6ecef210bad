//! Settlement relay
//!
//! Background worker that redelivers settlement notifications the order service has not
//! acknowledged yet.

use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::clients::SettlementNotifier;
use crate::error::{AppError, AppResult};
use crate::models::SettlementNotification;
use crate::repository::SettlementOutbox;

/// Exponential backoff between delivery attempts, bounded by `max_attempts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: i32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(300),
            max_attempts: 20,
        }
    }
}

impl RetryPolicy {
    /// `min(base * 2^(attempts-1), max)` after `attempts` failed deliveries.
    pub fn backoff_delay(&self, attempts: i32) -> Duration {
        let exponent = attempts.saturating_sub(1).clamp(0, 30) as u32;
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    pub fn next_attempt_at(&self, now: DateTime<Utc>, attempts: i32) -> DateTime<Utc> {
        TimeDelta::from_std(self.backoff_delay(attempts))
            .ok()
            .and_then(|delay| now.checked_add_signed(delay))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// How often to look for due notifications
    pub interval: Duration,
    /// Maximum notifications handled per pass
    pub batch_size: u64,
    pub retry: RetryPolicy,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            batch_size: 100,
            retry: RetryPolicy::default(),
        }
    }
}

/// What happened to a notification after one delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    Rescheduled,
    /// Rejected for good or out of attempts; never retried.
    Abandoned,
}

/// A 4xx answer will not change on retry, except timeouts and rate limiting.
fn is_permanent(err: &AppError) -> bool {
    matches!(err, AppError::CallbackRejected { status, .. } if *status != 408 && *status != 429)
}

/// Attempts one delivery and records the result in the outbox.
///
/// Errors are outbox write failures only.
pub async fn deliver_notification<O>(
    outbox: &O,
    notifier: &dyn SettlementNotifier,
    retry: &RetryPolicy,
    notification: &SettlementNotification,
    now: DateTime<Utc>,
) -> AppResult<Delivery>
where
    O: SettlementOutbox + ?Sized,
{
    let err = match notifier
        .notify(notification.order_id, notification.payment_id, notification.outcome)
        .await
    {
        Ok(()) => {
            outbox.mark_delivered(notification.id, now).await?;
            return Ok(Delivery::Delivered);
        }
        Err(err) => err,
    };

    let attempts = notification.attempts.saturating_add(1);
    if is_permanent(&err) || attempts >= retry.max_attempts {
        error!(
            notification_id = %notification.id,
            payment_id = %notification.payment_id,
            order_id = %notification.order_id,
            attempts,
            error = %err,
            "settlement callback abandoned"
        );
        outbox
            .mark_failed(notification.id, attempts, now, &err.to_string())
            .await?;
        return Ok(Delivery::Abandoned);
    }

    let next_attempt_at = retry.next_attempt_at(now, attempts);
    warn!(
        notification_id = %notification.id,
        payment_id = %notification.payment_id,
        order_id = %notification.order_id,
        attempts,
        next_attempt_at = %next_attempt_at,
        error = %err,
        "settlement callback failed"
    );
    outbox
        .reschedule(notification.id, attempts, next_attempt_at, &err.to_string())
        .await?;
    Ok(Delivery::Rescheduled)
}

pub struct SettlementRelay {
    outbox: Arc<dyn SettlementOutbox>,
    notifier: Arc<dyn SettlementNotifier>,
    config: RelayConfig,
}

impl SettlementRelay {
    pub fn new(
        outbox: Arc<dyn SettlementOutbox>,
        notifier: Arc<dyn SettlementNotifier>,
        config: RelayConfig,
    ) -> Self {
        Self {
            outbox,
            notifier,
            config,
        }
    }

    /// Runs until the task is dropped.
    pub async fn run(self) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            batch_size = self.config.batch_size,
            "starting settlement relay"
        );

        let mut interval = tokio::time::interval(self.config.interval);
        loop {
            interval.tick().await;
            if let Err(err) = self.relay_due().await {
                error!(error = %err, "settlement relay pass failed");
            }
        }
    }

    /// One pass over the notifications due now. Returns how many were delivered.
    pub async fn relay_due(&self) -> AppResult<usize> {
        self.relay_due_at(Utc::now()).await
    }

    pub async fn relay_due_at(&self, now: DateTime<Utc>) -> AppResult<usize> {
        let due = self
            .outbox
            .due_notifications(now, self.config.batch_size)
            .await?;

        if due.is_empty() {
            debug!("no settlement notifications due");
            return Ok(0);
        }

        let mut delivered = 0;
        for notification in &due {
            let outcome = deliver_notification(
                self.outbox.as_ref(),
                self.notifier.as_ref(),
                &self.config.retry,
                notification,
                now,
            )
            .await?;
            if outcome == Delivery::Delivered {
                delivered += 1;
            }
        }

        info!(due = due.len(), delivered, "settlement relay pass finished");
        Ok(delivered)
    }
}

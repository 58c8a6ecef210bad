use anyhow::{Context, ensure};
use std::env;
use std::time::Duration;

use crate::services::{RelayConfig, RetryPolicy};

#[derive(Debug, Clone)]
pub struct OrderServiceConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
}

impl OrderServiceConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        Ok(Self {
            database_url: required(&lookup, "DATABASE_URL")?,
            host: lookup("APP_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parsed(&lookup, "APP_PORT", 3000),
        })
    }
}

#[derive(Debug, Clone)]
pub struct PaymentServiceConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub order_service_url: String,
    pub order_callback_url: String,
    pub order_service_timeout: Duration,
    /// Finalize every new payment as successful right after creation.
    pub auto_capture: bool,
    pub relay: RelayConfig,
}

impl PaymentServiceConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let order_service_url = required(&lookup, "ORDER_SERVICE_URL")?
            .trim_end_matches('/')
            .to_string();
        let order_callback_url = lookup("ORDER_CALLBACK_URL")
            .unwrap_or_else(|| format!("{order_service_url}/internal/payment-callback"));

        let relay = RelayConfig {
            interval: Duration::from_secs(parsed(&lookup, "SETTLEMENT_RELAY_INTERVAL_SECS", 5)),
            batch_size: parsed(&lookup, "SETTLEMENT_RELAY_BATCH", 100),
            retry: RetryPolicy {
                base_delay: Duration::from_secs(parsed(&lookup, "SETTLEMENT_RETRY_BASE_SECS", 2)),
                max_delay: Duration::from_secs(parsed(&lookup, "SETTLEMENT_RETRY_MAX_SECS", 300)),
                max_attempts: parsed(&lookup, "SETTLEMENT_RELAY_MAX_ATTEMPTS", 20),
            },
        };
        ensure!(
            !relay.interval.is_zero(),
            "SETTLEMENT_RELAY_INTERVAL_SECS must be greater than 0"
        );
        ensure!(relay.batch_size > 0, "SETTLEMENT_RELAY_BATCH must be greater than 0");
        ensure!(
            relay.retry.max_attempts > 0,
            "SETTLEMENT_RELAY_MAX_ATTEMPTS must be greater than 0"
        );

        Ok(Self {
            database_url: required(&lookup, "DATABASE_URL")?,
            host: lookup("APP_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parsed(&lookup, "APP_PORT", 3001),
            order_service_url,
            order_callback_url,
            order_service_timeout: Duration::from_secs(parsed(&lookup, "ORDER_SERVICE_TIMEOUT_SECS", 5)),
            auto_capture: parsed(&lookup, "PAYMENT_AUTO_CAPTURE", false),
            relay,
        })
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<String> {
    lookup(key).with_context(|| format!("{key} must be set"))
}

/// Missing or unparsable values fall back to `default`.
fn parsed<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key)
        .and_then(|value| value.trim().parse::<T>().ok())
        .unwrap_or(default)
}

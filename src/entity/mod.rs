use chrono::{DateTime, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;

pub mod orders;
pub mod payments;
pub mod settlement_outbox;

pub use orders::Entity as Orders;
pub use payments::Entity as Payments;
pub use settlement_outbox::Entity as SettlementOutbox;

/// Column representation of a UTC timestamp.
pub fn db_time(at: DateTime<Utc>) -> DateTimeWithTimeZone {
    at.fixed_offset()
}

pub mod orders;
pub mod payments;

use std::sync::Arc;

use crate::services::{OrderLifecycleManager, PaymentLifecycleManager};

#[derive(Clone)]
pub struct OrderState {
    pub orders: Arc<OrderLifecycleManager>,
}

#[derive(Clone)]
pub struct PaymentState {
    pub payments: Arc<PaymentLifecycleManager>,
    pub auto_capture: bool,
}

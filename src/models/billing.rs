//! Payment order and applied-payment records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::subscription::PlanDuration;

/// A payment order created with the gateway, kept so a later verification
/// or webhook can tell which user and period it pays for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentOrder {
    /// Gateway-assigned order id.
    pub order_id: String,
    pub user_id: String,
    pub plan_duration: PlanDuration,
    /// Charge amount in minor currency units, after any promo discount.
    pub amount: i64,
    pub currency: String,
    /// Promo applied at order creation, if any.
    pub promo_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Parameters for persisting a new order.
#[derive(Debug, Clone)]
pub struct OrderInsertParams {
    pub order_id: String,
    pub user_id: String,
    pub plan_duration: PlanDuration,
    pub amount: i64,
    pub currency: String,
    pub promo_id: Option<Uuid>,
}

//! Storage abstraction for subscription, usage, promo and billing data.
//!
//! This module provides a trait-based storage abstraction with two implementations:
//! - `SqlxStorage`: PostgreSQL storage via SQLx (feature: `sqlx-storage`)
//! - `MemoryStorage`: In-memory storage for testing (feature: `memory-storage`)
//!
//! The cross-request atomicity the entitlement engine relies on lives here:
//! usage increments are a single conditional update, promo redemption is an
//! insert-or-fail on the (promo, user) uniqueness constraint, and payment
//! application is keyed by payment id.

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    OrderInsertParams, PaymentOrder, PromoCode, PromoCreateParams, PromoUpdateParams, SendDecision,
    Subscription, SubscriptionUpsertParams,
};

#[cfg(feature = "sqlx-storage")]
mod sqlx_impl;
#[cfg(feature = "sqlx-storage")]
pub use sqlx_impl::SqlxStorage;

#[cfg(feature = "memory-storage")]
mod memory;
#[cfg(feature = "memory-storage")]
pub use memory::MemoryStorage;

/// Outcome of an atomic redemption attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedemptionOutcome {
    /// Redemption recorded and the usage counter incremented.
    Redeemed,
    /// This user already redeemed this code; nothing was changed.
    AlreadyRedeemed,
    /// The code hit its usage cap during the attempt; nothing was changed.
    Exhausted,
}

/// Storage trait for subscription records.
#[async_trait]
pub trait SubscriptionStorage: Send + Sync {
    /// Fetch a user's subscription record, if any.
    async fn get_subscription(&self, user_id: &str) -> Result<Option<Subscription>>;

    /// Create or replace the per-user subscription record (last write wins).
    async fn upsert_subscription(&self, params: SubscriptionUpsertParams) -> Result<()>;

    /// Remove the subscription record entirely, reverting the user to free.
    async fn delete_subscription(&self, user_id: &str) -> Result<()>;
}

/// Storage trait for daily usage counters.
#[async_trait]
pub trait UsageStorage: Send + Sync {
    /// Messages sent by the user on the given date (0 when no record).
    async fn messages_sent(&self, user_id: &str, date: NaiveDate) -> Result<i32>;

    /// Atomically increment the (user, date) counter, creating it lazily.
    ///
    /// With `cap` set, the increment only happens while the counter is below
    /// the cap; check and increment are one atomic operation, never a
    /// read-then-write across round trips.
    async fn try_increment_usage(
        &self,
        user_id: &str,
        date: NaiveDate,
        cap: Option<i32>,
    ) -> Result<SendDecision>;
}

/// Storage trait for promo codes and redemptions.
#[async_trait]
pub trait PromoStorage: Send + Sync {
    /// Create a promo code. The code is stored upper-cased.
    async fn create_promo(&self, params: PromoCreateParams) -> Result<PromoCode>;

    /// Patch a promo code; returns the updated record, None when missing.
    async fn update_promo(&self, id: Uuid, params: PromoUpdateParams) -> Result<Option<PromoCode>>;

    /// Delete a promo code; returns false when it did not exist.
    async fn delete_promo(&self, id: Uuid) -> Result<bool>;

    /// All promo codes, newest first.
    async fn list_promos(&self) -> Result<Vec<PromoCode>>;

    /// Look up a code case-insensitively.
    async fn get_promo_by_code(&self, code: &str) -> Result<Option<PromoCode>>;

    /// Look up a promo code by id.
    async fn get_promo(&self, id: Uuid) -> Result<Option<PromoCode>>;

    /// Whether the user already redeemed this code. A UX pre-check only;
    /// the atomic insert in [`redeem_promo`](Self::redeem_promo) is the
    /// correctness mechanism.
    async fn has_redeemed(&self, promo_id: Uuid, user_id: &str) -> Result<bool>;

    /// Atomically record a redemption: insert the (promo, user) record
    /// (duplicate => `AlreadyRedeemed`) and increment `times_used` guarded
    /// by `max_uses` (guard failure => `Exhausted`). Either failure leaves
    /// storage untouched.
    async fn redeem_promo(&self, promo_id: Uuid, user_id: &str) -> Result<RedemptionOutcome>;
}

/// Storage trait for payment orders and applied payments.
#[async_trait]
pub trait BillingStorage: Send + Sync {
    /// Persist a freshly created gateway order.
    async fn insert_order(&self, params: OrderInsertParams) -> Result<()>;

    /// Fetch an order by its gateway id.
    async fn get_order(&self, order_id: &str) -> Result<Option<PaymentOrder>>;

    /// Record an applied payment id. Returns false when the payment was
    /// already recorded, letting callers treat duplicates idempotently.
    async fn record_payment(&self, payment_id: &str, order_id: &str) -> Result<bool>;
}

/// Combined storage trait for convenience.
///
/// This trait is object-safe and can be used with `Box<dyn Storage>` for
/// dynamic dispatch, or with concrete types for static dispatch.
pub trait Storage:
    SubscriptionStorage + UsageStorage + PromoStorage + BillingStorage + Send + Sync
{
}

impl<T: SubscriptionStorage + UsageStorage + PromoStorage + BillingStorage + Send + Sync> Storage
    for T
{
}

//! Data models for the persona chat backend.

mod billing;
mod promo;
mod subscription;
mod usage;

pub use billing::{OrderInsertParams, PaymentOrder};
pub use promo::{
    DiscountType, PromoCode, PromoCreateParams, PromoInvalidReason, PromoRedemption, PromoTerms,
    PromoUpdateParams,
};
pub use subscription::{
    Plan, PlanDuration, Subscription, SubscriptionStatus, SubscriptionUpsertParams,
};
pub use usage::{DailyUsage, SendDecision};

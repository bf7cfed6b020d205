//! Entitlement engine: quota gating, plan transitions, promo redemption
//! and payment application.
//!
//! The engine is a thin state machine over (subscription, daily usage,
//! promo) records. It owns no time of its own: "now" comes from the
//! injected [`Clock`], and subscription expiry is evaluated lazily at read
//! time through [`crate::models::Subscription::is_pro`] rather than by any
//! background job.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    clock::Clock,
    config::{BillingConfig, LimitsConfig},
    error::{Error, Result},
    models::{
        OrderInsertParams, PaymentOrder, Plan, PlanDuration, PromoCode, PromoInvalidReason,
        PromoTerms, SendDecision, SubscriptionStatus, SubscriptionUpsertParams,
    },
    storage::{RedemptionOutcome, Storage},
};

/// A user's effective entitlement at one instant.
#[derive(Debug, Clone, Serialize)]
pub struct Entitlement {
    /// Effective plan after the lazy expiry check.
    pub plan: Plan,
    pub status: SubscriptionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_period_end: Option<DateTime<Utc>>,
    pub messages_sent_today: i32,
    /// Daily message cap (None = unlimited).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_limit: Option<u32>,
}

/// Priced order terms before the gateway round trip.
#[derive(Debug, Clone, Serialize)]
pub struct OrderQuote {
    pub plan_duration: PlanDuration,
    /// Amount to charge in minor units, after any promo discount.
    pub amount: i64,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promo_id: Option<Uuid>,
}

/// Entitlement engine over a storage backend and an injected clock.
pub struct EntitlementEngine {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    billing: BillingConfig,
    limits: LimitsConfig,
}

impl EntitlementEngine {
    pub fn new(
        storage: Arc<dyn Storage>,
        clock: Arc<dyn Clock>,
        billing: BillingConfig,
        limits: LimitsConfig,
    ) -> Self {
        Self {
            storage,
            clock,
            billing,
            limits,
        }
    }

    /// Whether the user has pro access right now (lazy expiry applied).
    async fn is_pro_now(&self, user_id: &str) -> Result<bool> {
        let now = self.clock.now();
        Ok(self
            .storage
            .get_subscription(user_id)
            .await?
            .is_some_and(|sub| sub.is_pro(now)))
    }

    /// Current plan, status, period end and today's usage for a user.
    ///
    /// A missing subscription record reads as free/active.
    pub async fn snapshot(&self, user_id: &str) -> Result<Entitlement> {
        let now = self.clock.now();
        let sub = self.storage.get_subscription(user_id).await?;
        let messages_sent_today = self
            .storage
            .messages_sent(user_id, self.clock.today())
            .await?;

        let is_pro = sub.as_ref().is_some_and(|s| s.is_pro(now));
        let (status, period_end) = match &sub {
            Some(s) => (s.status, s.current_period_end),
            None => (SubscriptionStatus::Active, None),
        };

        Ok(Entitlement {
            plan: if is_pro { Plan::Pro } else { Plan::Free },
            status,
            current_period_end: period_end,
            messages_sent_today,
            daily_limit: if is_pro {
                None
            } else {
                Some(self.limits.free_daily_messages)
            },
        })
    }

    /// Count one message send, enforcing the free-tier daily cap.
    ///
    /// The cap check and the increment are a single atomic storage
    /// operation, so concurrent sends from the same user cannot exceed the
    /// limit. Pro users are counted without a cap.
    pub async fn record_send(&self, user_id: &str) -> Result<SendDecision> {
        let cap = if self.is_pro_now(user_id).await? {
            None
        } else {
            Some(self.limits.free_daily_messages as i32)
        };

        let decision = self
            .storage
            .try_increment_usage(user_id, self.clock.today(), cap)
            .await?;

        if !decision.accepted {
            tracing::info!(user_id, count = decision.new_count, "daily quota reached");
        }
        Ok(decision)
    }

    /// Admin or payment-driven subscription write (last write wins).
    ///
    /// A pro plan gets a fresh period starting now; duration `None` leaves
    /// the subscription open ended.
    pub async fn set_subscription(
        &self,
        user_id: &str,
        plan: Plan,
        status: SubscriptionStatus,
        duration: Option<PlanDuration>,
    ) -> Result<()> {
        let now = self.clock.now();
        let (start, end) = if plan.is_pro() {
            (Some(now), duration.map(|d| now + d.period()))
        } else {
            (None, None)
        };

        self.storage
            .upsert_subscription(SubscriptionUpsertParams {
                user_id: user_id.to_string(),
                plan,
                status,
                plan_duration: if plan.is_pro() { duration } else { None },
                current_period_start: start,
                current_period_end: end,
            })
            .await?;

        tracing::info!(user_id, ?plan, ?status, ?duration, "subscription updated");
        Ok(())
    }

    /// Remove the subscription record entirely (admin delete or user data
    /// wipe). The user reverts to default free treatment.
    pub async fn delete_subscription(&self, user_id: &str) -> Result<()> {
        self.storage.delete_subscription(user_id).await?;
        tracing::info!(user_id, "subscription deleted");
        Ok(())
    }

    /// Validate a promo code for a user without consuming it.
    pub async fn validate_promo(&self, user_id: &str, code: &str) -> Result<PromoTerms> {
        let promo = self
            .storage
            .get_promo_by_code(code)
            .await?
            .ok_or(Error::PromoInvalid(PromoInvalidReason::NotFound))?;
        self.check_promo(user_id, &promo).await?;
        Ok(self.terms(&promo))
    }

    /// Redeem a promo code directly, without a payment step.
    ///
    /// Only discounts that fully cover the base price qualify; partial
    /// discounts must go through order creation with a reduced charge.
    /// Re-validates server side; a client-held "validated" flag is never
    /// trusted.
    pub async fn redeem_promo(&self, user_id: &str, promo_id: Uuid) -> Result<PlanDuration> {
        let promo = self
            .storage
            .get_promo(promo_id)
            .await?
            .ok_or(Error::PromoInvalid(PromoInvalidReason::NotFound))?;
        self.check_promo(user_id, &promo).await?;

        if !promo.covers_full_price(self.billing.base_price(promo.plan_duration)) {
            return Err(Error::InvalidRequest(
                "promo code does not cover the full price, create an order instead".to_string(),
            ));
        }

        // Insert-or-fail first: a duplicate or exhausted code aborts before
        // any subscription change.
        match self.storage.redeem_promo(promo_id, user_id).await? {
            RedemptionOutcome::AlreadyRedeemed => {
                return Err(Error::PromoInvalid(PromoInvalidReason::AlreadyRedeemed));
            }
            RedemptionOutcome::Exhausted => {
                return Err(Error::PromoInvalid(PromoInvalidReason::Exhausted));
            }
            RedemptionOutcome::Redeemed => {}
        }

        self.set_subscription(
            user_id,
            Plan::Pro,
            SubscriptionStatus::Active,
            Some(promo.plan_duration),
        )
        .await?;

        tracing::info!(user_id, code = %promo.code, "promo redeemed");
        Ok(promo.plan_duration)
    }

    /// Price an order for one pro period, applying an optional promo.
    ///
    /// Fully covered amounts are rejected here and pointed at direct
    /// redemption instead.
    pub async fn quote_order(
        &self,
        user_id: &str,
        duration: PlanDuration,
        promo_id: Option<Uuid>,
    ) -> Result<OrderQuote> {
        let base = self.billing.base_price(duration);
        let mut amount = base;

        if let Some(promo_id) = promo_id {
            let promo = self
                .storage
                .get_promo(promo_id)
                .await?
                .ok_or(Error::PromoInvalid(PromoInvalidReason::NotFound))?;
            self.check_promo(user_id, &promo).await?;

            if promo.covers_full_price(base) {
                return Err(Error::InvalidRequest(
                    "promo code covers the full price, redeem it directly".to_string(),
                ));
            }
            amount = base - promo.discount_amount(base);
        }

        Ok(OrderQuote {
            plan_duration: duration,
            amount,
            currency: self.billing.currency.clone(),
            promo_id,
        })
    }

    /// Persist a gateway-created order so verification can find it later.
    pub async fn record_order(
        &self,
        user_id: &str,
        order_id: &str,
        quote: &OrderQuote,
    ) -> Result<()> {
        self.storage
            .insert_order(OrderInsertParams {
                order_id: order_id.to_string(),
                user_id: user_id.to_string(),
                plan_duration: quote.plan_duration,
                amount: quote.amount,
                currency: quote.currency.clone(),
                promo_id: quote.promo_id,
            })
            .await?;
        Ok(())
    }

    /// Apply a verified payment: upgrade the order's user to pro for the
    /// ordered period.
    ///
    /// The payment id is recorded under a uniqueness constraint first, so a
    /// webhook racing a synchronous verification applies the upgrade once;
    /// the duplicate is an idempotent success.
    pub async fn apply_payment(&self, order_id: &str, payment_id: &str) -> Result<PaymentOrder> {
        let order = self
            .storage
            .get_order(order_id)
            .await?
            .ok_or_else(|| Error::OrderNotFound(order_id.to_string()))?;

        if !self.storage.record_payment(payment_id, order_id).await? {
            tracing::info!(order_id, payment_id, "payment already applied");
            return Ok(order);
        }

        // A paid order also consumes its promo, recorded through the same
        // insert-or-fail path; a prior redemption is tolerated here since
        // the payment itself already succeeded.
        if let Some(promo_id) = order.promo_id {
            if let Err(e) = self.storage.redeem_promo(promo_id, &order.user_id).await {
                tracing::warn!(order_id, %promo_id, "failed to record promo use: {e}");
            }
        }

        self.set_subscription(
            &order.user_id,
            Plan::Pro,
            SubscriptionStatus::Active,
            Some(order.plan_duration),
        )
        .await?;

        tracing::info!(order_id, payment_id, user_id = %order.user_id, "payment applied");
        Ok(order)
    }

    /// Pure validity check against current state; never mutates.
    async fn check_promo(&self, user_id: &str, promo: &PromoCode) -> Result<()> {
        let now = self.clock.now();

        let reason = if !promo.is_active {
            Some(PromoInvalidReason::Inactive)
        } else if now < promo.valid_from {
            Some(PromoInvalidReason::NotYetActive)
        } else if promo.valid_until.is_some_and(|until| until < now) {
            Some(PromoInvalidReason::Expired)
        } else if promo.is_exhausted() {
            Some(PromoInvalidReason::Exhausted)
        } else if self.storage.has_redeemed(promo.id, user_id).await? {
            // UX pre-check only; the atomic insert in redemption is the
            // correctness mechanism.
            Some(PromoInvalidReason::AlreadyRedeemed)
        } else {
            None
        };

        match reason {
            Some(reason) => Err(Error::PromoInvalid(reason)),
            None => Ok(()),
        }
    }

    fn terms(&self, promo: &PromoCode) -> PromoTerms {
        PromoTerms {
            promo_id: promo.id,
            code: promo.code.clone(),
            discount_type: promo.discount_type,
            discount_value: promo.discount_value,
            plan_duration: promo.plan_duration,
            free_redemption: promo
                .covers_full_price(self.billing.base_price(promo.plan_duration)),
        }
    }
}

#[cfg(all(test, feature = "memory-storage"))]
mod tests {
    use chrono::{Duration, TimeZone};

    use crate::{
        clock::FixedClock,
        models::{DiscountType, PromoCreateParams},
        storage::{MemoryStorage, PromoStorage, UsageStorage},
    };

    use super::*;

    fn billing_config() -> BillingConfig {
        BillingConfig {
            key_id: "key".to_string(),
            key_secret: "secret".to_string(),
            webhook_secret: "hook".to_string(),
            gateway_url: "https://gateway.test/v1".to_string(),
            currency: "INR".to_string(),
            price_week: 19900,
            price_month: 49900,
            price_year: 399900,
        }
    }

    fn make_engine() -> (Arc<EntitlementEngine>, Arc<MemoryStorage>, Arc<FixedClock>) {
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 3, 12, 9, 0, 0).unwrap(),
        ));
        let engine = Arc::new(EntitlementEngine::new(
            storage.clone(),
            clock.clone(),
            billing_config(),
            LimitsConfig {
                free_daily_messages: 10,
            },
        ));
        (engine, storage, clock)
    }

    async fn make_promo(
        storage: &MemoryStorage,
        code: &str,
        discount_type: DiscountType,
        discount_value: i64,
        max_uses: Option<i32>,
    ) -> PromoCode {
        storage
            .create_promo(PromoCreateParams {
                code: code.to_string(),
                discount_type,
                discount_value,
                max_uses,
                valid_from: None,
                valid_until: None,
                plan_duration: PlanDuration::Month,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_snapshot_defaults_to_free() {
        let (engine, _, _) = make_engine();
        let ent = engine.snapshot("u1").await.unwrap();

        assert_eq!(ent.plan, Plan::Free);
        assert_eq!(ent.messages_sent_today, 0);
        assert_eq!(ent.daily_limit, Some(10));
    }

    #[tokio::test]
    async fn test_free_user_capped_at_ten() {
        let (engine, _, _) = make_engine();

        for i in 1..=10 {
            let decision = engine.record_send("u1").await.unwrap();
            assert!(decision.accepted);
            assert_eq!(decision.new_count, i);
        }

        let rejected = engine.record_send("u1").await.unwrap();
        assert!(!rejected.accepted);
        assert_eq!(rejected.new_count, 10);
    }

    #[tokio::test]
    async fn test_quota_resets_on_new_day() {
        let (engine, _, clock) = make_engine();

        for _ in 0..10 {
            engine.record_send("u1").await.unwrap();
        }
        assert!(!engine.record_send("u1").await.unwrap().accepted);

        clock.set(clock.now() + Duration::days(1));
        let decision = engine.record_send("u1").await.unwrap();
        assert!(decision.accepted);
        assert_eq!(decision.new_count, 1);
    }

    #[tokio::test]
    async fn test_pro_user_is_uncapped() {
        let (engine, _, _) = make_engine();
        engine
            .set_subscription(
                "u1",
                Plan::Pro,
                SubscriptionStatus::Active,
                Some(PlanDuration::Month),
            )
            .await
            .unwrap();

        for _ in 0..25 {
            assert!(engine.record_send("u1").await.unwrap().accepted);
        }

        let ent = engine.snapshot("u1").await.unwrap();
        assert_eq!(ent.plan, Plan::Pro);
        assert!(ent.daily_limit.is_none());
    }

    #[tokio::test]
    async fn test_expired_pro_falls_back_to_free_cap() {
        let (engine, _, clock) = make_engine();
        engine
            .set_subscription(
                "u1",
                Plan::Pro,
                SubscriptionStatus::Active,
                Some(PlanDuration::Week),
            )
            .await
            .unwrap();

        // Lazy expiry: nothing mutates the record, the read just re-evaluates.
        clock.set(clock.now() + Duration::days(8));
        let ent = engine.snapshot("u1").await.unwrap();
        assert_eq!(ent.plan, Plan::Free);
        assert_eq!(ent.daily_limit, Some(10));

        for _ in 0..10 {
            engine.record_send("u1").await.unwrap();
        }
        assert!(!engine.record_send("u1").await.unwrap().accepted);
    }

    #[tokio::test]
    async fn test_concurrent_sends_never_exceed_cap() {
        let (engine, storage, clock) = make_engine();
        let date = clock.today();

        let mut handles = Vec::new();
        for _ in 0..40 {
            let engine = engine.clone();
            handles.push(tokio::spawn(
                async move { engine.record_send("u1").await },
            ));
        }

        let mut accepted = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap().accepted {
                accepted += 1;
            }
        }

        assert_eq!(accepted, 10);
        assert_eq!(storage.messages_sent("u1", date).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_validate_full_percentage_promo() {
        let (engine, storage, _) = make_engine();
        make_promo(&storage, "FREE100", DiscountType::Percentage, 100, None).await;

        let terms = engine.validate_promo("u1", "free100").await.unwrap();
        assert!(terms.free_redemption);
        assert_eq!(terms.plan_duration, PlanDuration::Month);
    }

    #[tokio::test]
    async fn test_half_discount_is_not_free_redemption() {
        let (engine, storage, _) = make_engine();
        make_promo(&storage, "HALF", DiscountType::Percentage, 50, None).await;

        let terms = engine.validate_promo("u1", "HALF").await.unwrap();
        assert!(!terms.free_redemption);
    }

    #[tokio::test]
    async fn test_expired_promo_fails_with_expired_reason() {
        let (engine, storage, clock) = make_engine();
        let promo = make_promo(&storage, "OLD", DiscountType::Percentage, 100, Some(100)).await;
        storage
            .update_promo(
                promo.id,
                crate::models::PromoUpdateParams {
                    valid_until: Some(Some(clock.now() - Duration::days(1))),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        // Remaining uses do not matter once expired.
        let err = engine.validate_promo("u1", "OLD").await.unwrap_err();
        assert!(matches!(
            err,
            Error::PromoInvalid(PromoInvalidReason::Expired)
        ));
    }

    #[tokio::test]
    async fn test_not_yet_active_promo() {
        let (engine, storage, clock) = make_engine();
        storage
            .create_promo(PromoCreateParams {
                code: "SOON".to_string(),
                discount_type: DiscountType::Percentage,
                discount_value: 100,
                max_uses: None,
                valid_from: Some(clock.now() + Duration::days(1)),
                valid_until: None,
                plan_duration: PlanDuration::Month,
            })
            .await
            .unwrap();

        let err = engine.validate_promo("u1", "SOON").await.unwrap_err();
        assert!(matches!(
            err,
            Error::PromoInvalid(PromoInvalidReason::NotYetActive)
        ));
    }

    #[tokio::test]
    async fn test_unknown_promo_not_found() {
        let (engine, _, _) = make_engine();
        let err = engine.validate_promo("u1", "NOPE").await.unwrap_err();
        assert!(matches!(
            err,
            Error::PromoInvalid(PromoInvalidReason::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_redeem_full_promo_grants_pro() {
        let (engine, storage, clock) = make_engine();
        let promo = make_promo(&storage, "FREE100", DiscountType::Percentage, 100, None).await;

        let duration = engine.redeem_promo("u1", promo.id).await.unwrap();
        assert_eq!(duration, PlanDuration::Month);

        let ent = engine.snapshot("u1").await.unwrap();
        assert_eq!(ent.plan, Plan::Pro);
        assert_eq!(
            ent.current_period_end,
            Some(clock.now() + Duration::days(30))
        );
    }

    #[tokio::test]
    async fn test_redeem_partial_promo_is_rejected() {
        let (engine, storage, _) = make_engine();
        let promo = make_promo(&storage, "HALF", DiscountType::Percentage, 50, None).await;

        let err = engine.redeem_promo("u1", promo.id).await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));

        // Nothing was consumed or granted.
        assert_eq!(storage.get_promo(promo.id).await.unwrap().unwrap().times_used, 0);
        assert_eq!(engine.snapshot("u1").await.unwrap().plan, Plan::Free);
    }

    #[tokio::test]
    async fn test_redeem_twice_reports_already_redeemed() {
        let (engine, storage, _) = make_engine();
        let promo = make_promo(&storage, "ONCE", DiscountType::Percentage, 100, None).await;

        engine.redeem_promo("u1", promo.id).await.unwrap();
        let err = engine.redeem_promo("u1", promo.id).await.unwrap_err();
        assert!(matches!(
            err,
            Error::PromoInvalid(PromoInvalidReason::AlreadyRedeemed)
        ));
    }

    #[tokio::test]
    async fn test_concurrent_redemptions_single_winner() {
        let (engine, storage, _) = make_engine();
        let promo = make_promo(&storage, "GOLDEN", DiscountType::Percentage, 100, Some(1)).await;
        let promo_id = promo.id;

        let mut handles = Vec::new();
        for i in 0..12 {
            let engine = engine.clone();
            let user = format!("user-{i}");
            handles.push(tokio::spawn(async move {
                engine.redeem_promo(&user, promo_id).await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }

        assert_eq!(successes, 1);
        let promo = storage.get_promo(promo.id).await.unwrap().unwrap();
        assert_eq!(promo.times_used, 1);
    }

    #[tokio::test]
    async fn test_quote_applies_partial_discount() {
        let (engine, storage, _) = make_engine();
        let promo = make_promo(&storage, "HALF", DiscountType::Percentage, 50, None).await;

        let quote = engine
            .quote_order("u1", PlanDuration::Month, Some(promo.id))
            .await
            .unwrap();
        assert_eq!(quote.amount, 24950);
        assert_eq!(quote.currency, "INR");
    }

    #[tokio::test]
    async fn test_quote_rejects_fully_covered_promo() {
        let (engine, storage, _) = make_engine();
        let promo = make_promo(&storage, "FREE100", DiscountType::Percentage, 100, None).await;

        let err = engine
            .quote_order("u1", PlanDuration::Month, Some(promo.id))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_quote_without_promo_uses_base_price() {
        let (engine, _, _) = make_engine();
        let quote = engine
            .quote_order("u1", PlanDuration::Year, None)
            .await
            .unwrap();
        assert_eq!(quote.amount, 399900);
    }

    #[tokio::test]
    async fn test_apply_payment_upgrades_once() {
        let (engine, _, clock) = make_engine();
        let quote = engine
            .quote_order("u1", PlanDuration::Month, None)
            .await
            .unwrap();
        engine.record_order("u1", "order_1", &quote).await.unwrap();

        engine.apply_payment("order_1", "pay_1").await.unwrap();
        let ent = engine.snapshot("u1").await.unwrap();
        assert_eq!(ent.plan, Plan::Pro);
        let first_end = ent.current_period_end;

        // Same payment replayed (webhook racing verification): idempotent,
        // the period is not extended again.
        clock.set(clock.now() + Duration::days(1));
        engine.apply_payment("order_1", "pay_1").await.unwrap();
        let ent = engine.snapshot("u1").await.unwrap();
        assert_eq!(ent.current_period_end, first_end);
    }

    #[tokio::test]
    async fn test_apply_payment_unknown_order() {
        let (engine, _, _) = make_engine();
        let err = engine.apply_payment("missing", "pay_1").await.unwrap_err();
        assert!(matches!(err, Error::OrderNotFound(_)));
    }

    #[tokio::test]
    async fn test_admin_downgrade() {
        let (engine, _, _) = make_engine();
        engine
            .set_subscription(
                "u1",
                Plan::Pro,
                SubscriptionStatus::Active,
                Some(PlanDuration::Year),
            )
            .await
            .unwrap();
        engine
            .set_subscription("u1", Plan::Free, SubscriptionStatus::Cancelled, None)
            .await
            .unwrap();

        let ent = engine.snapshot("u1").await.unwrap();
        assert_eq!(ent.plan, Plan::Free);
        assert_eq!(ent.status, SubscriptionStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_delete_subscription_reverts_to_free() {
        let (engine, storage, _) = make_engine();
        engine
            .set_subscription(
                "u1",
                Plan::Pro,
                SubscriptionStatus::Active,
                Some(PlanDuration::Month),
            )
            .await
            .unwrap();
        engine.delete_subscription("u1").await.unwrap();

        assert_eq!(storage.subscription_count(), 0);
        assert_eq!(engine.snapshot("u1").await.unwrap().plan, Plan::Free);
    }

    #[tokio::test]
    async fn test_duration_change_resets_period_from_now() {
        let (engine, _, clock) = make_engine();
        engine
            .set_subscription(
                "u1",
                Plan::Pro,
                SubscriptionStatus::Active,
                Some(PlanDuration::Week),
            )
            .await
            .unwrap();

        clock.set(clock.now() + Duration::days(2));
        engine
            .set_subscription(
                "u1",
                Plan::Pro,
                SubscriptionStatus::Active,
                Some(PlanDuration::Year),
            )
            .await
            .unwrap();

        let ent = engine.snapshot("u1").await.unwrap();
        assert_eq!(
            ent.current_period_end,
            Some(clock.now() + Duration::days(365))
        );
    }
}

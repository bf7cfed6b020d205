//! In-memory storage implementation for testing.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::{
    error::Result,
    models::{
        OrderInsertParams, PaymentOrder, Plan, PromoCode, PromoCreateParams, PromoUpdateParams,
        SendDecision, Subscription, SubscriptionUpsertParams,
    },
    storage::{
        BillingStorage, PromoStorage, RedemptionOutcome, SubscriptionStorage, UsageStorage,
    },
};

/// In-memory storage backend for testing and development.
///
/// Atomicity is provided by holding the relevant write lock across the whole
/// check-and-mutate sequence, matching the single-statement guarantees of the
/// SQL backend.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    subscriptions: RwLock<HashMap<String, Subscription>>,
    usage: RwLock<HashMap<(String, NaiveDate), i32>>,
    promos: RwLock<PromoState>,
    orders: RwLock<HashMap<String, PaymentOrder>>,
    payments: RwLock<HashMap<String, String>>,
}

#[derive(Debug, Default)]
struct PromoState {
    codes: HashMap<Uuid, PromoCode>,
    redemptions: HashSet<(Uuid, String)>,
}

impl MemoryStorage {
    /// Create a new empty in-memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all stored data (useful for test cleanup).
    pub fn clear(&self) {
        self.subscriptions.write().clear();
        self.usage.write().clear();
        let mut promos = self.promos.write();
        promos.codes.clear();
        promos.redemptions.clear();
        drop(promos);
        self.orders.write().clear();
        self.payments.write().clear();
    }

    /// Number of stored subscription records.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// Number of stored promo codes.
    pub fn promo_count(&self) -> usize {
        self.promos.read().codes.len()
    }
}

#[async_trait]
impl SubscriptionStorage for MemoryStorage {
    async fn get_subscription(&self, user_id: &str) -> Result<Option<Subscription>> {
        Ok(self.subscriptions.read().get(user_id).cloned())
    }

    async fn upsert_subscription(&self, params: SubscriptionUpsertParams) -> Result<()> {
        let mut subs = self.subscriptions.write();
        let now = Utc::now();

        if let Some(existing) = subs.get_mut(&params.user_id) {
            existing.plan = params.plan;
            existing.status = params.status;
            existing.plan_duration = params.plan_duration;
            existing.current_period_start = params.current_period_start;
            existing.current_period_end = params.current_period_end;
            existing.updated_at = now;
        } else {
            subs.insert(
                params.user_id.clone(),
                Subscription {
                    user_id: params.user_id,
                    plan: params.plan,
                    status: params.status,
                    plan_duration: params.plan_duration,
                    current_period_start: params.current_period_start,
                    current_period_end: params.current_period_end,
                    created_at: now,
                    updated_at: now,
                },
            );
        }

        Ok(())
    }

    async fn delete_subscription(&self, user_id: &str) -> Result<()> {
        self.subscriptions.write().remove(user_id);
        Ok(())
    }
}

#[async_trait]
impl UsageStorage for MemoryStorage {
    async fn messages_sent(&self, user_id: &str, date: NaiveDate) -> Result<i32> {
        Ok(self
            .usage
            .read()
            .get(&(user_id.to_string(), date))
            .copied()
            .unwrap_or(0))
    }

    async fn try_increment_usage(
        &self,
        user_id: &str,
        date: NaiveDate,
        cap: Option<i32>,
    ) -> Result<SendDecision> {
        let mut usage = self.usage.write();
        let count = usage.entry((user_id.to_string(), date)).or_insert(0);

        if let Some(cap) = cap {
            if *count >= cap {
                return Ok(SendDecision {
                    accepted: false,
                    new_count: *count,
                });
            }
        }

        *count += 1;
        Ok(SendDecision {
            accepted: true,
            new_count: *count,
        })
    }
}

#[async_trait]
impl PromoStorage for MemoryStorage {
    async fn create_promo(&self, params: PromoCreateParams) -> Result<PromoCode> {
        let now = Utc::now();
        let promo = PromoCode {
            id: Uuid::new_v4(),
            code: params.code.trim().to_uppercase(),
            discount_type: params.discount_type,
            discount_value: params.discount_value,
            max_uses: params.max_uses,
            times_used: 0,
            valid_from: params.valid_from.unwrap_or(now),
            valid_until: params.valid_until,
            plan_duration: params.plan_duration,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.promos.write().codes.insert(promo.id, promo.clone());
        Ok(promo)
    }

    async fn update_promo(&self, id: Uuid, params: PromoUpdateParams) -> Result<Option<PromoCode>> {
        let mut promos = self.promos.write();
        let Some(promo) = promos.codes.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(value) = params.discount_value {
            promo.discount_value = value;
        }
        if let Some(max_uses) = params.max_uses {
            promo.max_uses = max_uses;
        }
        if let Some(valid_until) = params.valid_until {
            promo.valid_until = valid_until;
        }
        if let Some(is_active) = params.is_active {
            promo.is_active = is_active;
        }
        promo.updated_at = Utc::now();

        Ok(Some(promo.clone()))
    }

    async fn delete_promo(&self, id: Uuid) -> Result<bool> {
        Ok(self.promos.write().codes.remove(&id).is_some())
    }

    async fn list_promos(&self) -> Result<Vec<PromoCode>> {
        let mut codes: Vec<_> = self.promos.read().codes.values().cloned().collect();
        codes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(codes)
    }

    async fn get_promo_by_code(&self, code: &str) -> Result<Option<PromoCode>> {
        let needle = code.trim().to_uppercase();
        Ok(self
            .promos
            .read()
            .codes
            .values()
            .find(|p| p.code == needle)
            .cloned())
    }

    async fn get_promo(&self, id: Uuid) -> Result<Option<PromoCode>> {
        Ok(self.promos.read().codes.get(&id).cloned())
    }

    async fn has_redeemed(&self, promo_id: Uuid, user_id: &str) -> Result<bool> {
        Ok(self
            .promos
            .read()
            .redemptions
            .contains(&(promo_id, user_id.to_string())))
    }

    async fn redeem_promo(&self, promo_id: Uuid, user_id: &str) -> Result<RedemptionOutcome> {
        // One write lock across the whole sequence keeps the redemption
        // insert and the guarded counter increment atomic.
        let mut promos = self.promos.write();

        let key = (promo_id, user_id.to_string());
        if promos.redemptions.contains(&key) {
            return Ok(RedemptionOutcome::AlreadyRedeemed);
        }

        let Some(promo) = promos.codes.get(&promo_id) else {
            return Ok(RedemptionOutcome::Exhausted);
        };
        if promo.is_exhausted() {
            return Ok(RedemptionOutcome::Exhausted);
        }

        promos.redemptions.insert(key);
        if let Some(promo) = promos.codes.get_mut(&promo_id) {
            promo.times_used += 1;
            promo.updated_at = Utc::now();
        }

        Ok(RedemptionOutcome::Redeemed)
    }
}

#[async_trait]
impl BillingStorage for MemoryStorage {
    async fn insert_order(&self, params: OrderInsertParams) -> Result<()> {
        let order = PaymentOrder {
            order_id: params.order_id.clone(),
            user_id: params.user_id,
            plan_duration: params.plan_duration,
            amount: params.amount,
            currency: params.currency,
            promo_id: params.promo_id,
            created_at: Utc::now(),
        };
        self.orders.write().insert(params.order_id, order);
        Ok(())
    }

    async fn get_order(&self, order_id: &str) -> Result<Option<PaymentOrder>> {
        Ok(self.orders.read().get(order_id).cloned())
    }

    async fn record_payment(&self, payment_id: &str, order_id: &str) -> Result<bool> {
        let mut payments = self.payments.write();
        if payments.contains_key(payment_id) {
            return Ok(false);
        }
        payments.insert(payment_id.to_string(), order_id.to_string());
        Ok(true)
    }
}

//! `SQLx` `PostgreSQL` storage implementation.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{Result, StorageError},
    models::{
        DiscountType, OrderInsertParams, PaymentOrder, Plan, PlanDuration, PromoCode,
        PromoCreateParams, PromoUpdateParams, SendDecision, Subscription, SubscriptionStatus,
        SubscriptionUpsertParams,
    },
    storage::{
        BillingStorage, PromoStorage, RedemptionOutcome, SubscriptionStorage, UsageStorage,
    },
};

/// `SQLx` `PostgreSQL` storage backend.
#[derive(Debug, Clone)]
pub struct SqlxStorage {
    pool: PgPool,
}

impl SqlxStorage {
    /// Create a new `SQLx` storage with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    ///
    /// # Errors
    ///    - Returns `StorageError` if migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::Database(e.into()))?;
        Ok(())
    }
}

#[async_trait]
impl SubscriptionStorage for SqlxStorage {
    async fn get_subscription(&self, user_id: &str) -> Result<Option<Subscription>> {
        let row = sqlx::query_as::<_, SubscriptionRow>(
            r"
            SELECT
                user_id, plan, status, plan_duration,
                current_period_start, current_period_end,
                created_at, updated_at
            FROM subscriptions
            WHERE user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::Database)?;

        Ok(row.map(|row| Subscription {
            user_id: row.user_id,
            plan: row.plan,
            status: row.status,
            plan_duration: row.plan_duration,
            current_period_start: row.current_period_start,
            current_period_end: row.current_period_end,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }))
    }

    async fn upsert_subscription(&self, params: SubscriptionUpsertParams) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO subscriptions (user_id, plan, status, plan_duration, current_period_start, current_period_end)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id) DO UPDATE SET
                plan = EXCLUDED.plan,
                status = EXCLUDED.status,
                plan_duration = EXCLUDED.plan_duration,
                current_period_start = EXCLUDED.current_period_start,
                current_period_end = EXCLUDED.current_period_end,
                updated_at = NOW()
            ",
        )
        .bind(&params.user_id)
        .bind(params.plan)
        .bind(params.status)
        .bind(params.plan_duration)
        .bind(params.current_period_start)
        .bind(params.current_period_end)
        .execute(&self.pool)
        .await
        .map_err(StorageError::Database)?;

        Ok(())
    }

    async fn delete_subscription(&self, user_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM subscriptions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(StorageError::Database)?;

        Ok(())
    }
}

#[async_trait]
impl UsageStorage for SqlxStorage {
    async fn messages_sent(&self, user_id: &str, date: NaiveDate) -> Result<i32> {
        let count: Option<i32> = sqlx::query_scalar(
            "SELECT messages_sent FROM daily_usage WHERE user_id = $1 AND usage_date = $2",
        )
        .bind(user_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::Database)?;

        Ok(count.unwrap_or(0))
    }

    async fn try_increment_usage(
        &self,
        user_id: &str,
        date: NaiveDate,
        cap: Option<i32>,
    ) -> Result<SendDecision> {
        // Check and increment in one statement: the conditional upsert only
        // fires while the counter is below the cap, so concurrent sends can
        // never push past it.
        let new_count: Option<i32> = match cap {
            Some(cap) => sqlx::query_scalar(
                r"
                INSERT INTO daily_usage (user_id, usage_date, messages_sent)
                VALUES ($1, $2, 1)
                ON CONFLICT (user_id, usage_date) DO UPDATE
                    SET messages_sent = daily_usage.messages_sent + 1
                    WHERE daily_usage.messages_sent < $3
                RETURNING messages_sent
                ",
            )
            .bind(user_id)
            .bind(date)
            .bind(cap)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::Database)?,
            None => sqlx::query_scalar(
                r"
                INSERT INTO daily_usage (user_id, usage_date, messages_sent)
                VALUES ($1, $2, 1)
                ON CONFLICT (user_id, usage_date) DO UPDATE
                    SET messages_sent = daily_usage.messages_sent + 1
                RETURNING messages_sent
                ",
            )
            .bind(user_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::Database)?,
        };

        match new_count {
            Some(count) => Ok(SendDecision {
                accepted: true,
                new_count: count,
            }),
            None => {
                let current = self.messages_sent(user_id, date).await?;
                Ok(SendDecision {
                    accepted: false,
                    new_count: current,
                })
            }
        }
    }
}

#[async_trait]
impl PromoStorage for SqlxStorage {
    async fn create_promo(&self, params: PromoCreateParams) -> Result<PromoCode> {
        let row = sqlx::query_as::<_, PromoRow>(
            r"
            INSERT INTO promo_codes
                (id, code, discount_type, discount_value, max_uses, valid_from, valid_until, plan_duration)
            VALUES ($1, UPPER(TRIM($2)), $3, $4, $5, COALESCE($6, NOW()), $7, $8)
            RETURNING
                id, code, discount_type, discount_value, max_uses, times_used,
                valid_from, valid_until, plan_duration, is_active, created_at, updated_at
            ",
        )
        .bind(Uuid::new_v4())
        .bind(&params.code)
        .bind(params.discount_type)
        .bind(params.discount_value)
        .bind(params.max_uses)
        .bind(params.valid_from)
        .bind(params.valid_until)
        .bind(params.plan_duration)
        .fetch_one(&self.pool)
        .await
        .map_err(StorageError::Database)?;

        Ok(row.into())
    }

    async fn update_promo(&self, id: Uuid, params: PromoUpdateParams) -> Result<Option<PromoCode>> {
        // Admin-path read-modify-write inside one transaction; the row lock
        // keeps the patch consistent with concurrent redemptions.
        let mut tx = self.pool.begin().await.map_err(StorageError::Database)?;

        let existing = sqlx::query_as::<_, PromoRow>(
            r"
            SELECT
                id, code, discount_type, discount_value, max_uses, times_used,
                valid_from, valid_until, plan_duration, is_active, created_at, updated_at
            FROM promo_codes
            WHERE id = $1
            FOR UPDATE
            ",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(StorageError::Database)?;

        let Some(existing) = existing else {
            tx.rollback().await.map_err(StorageError::Database)?;
            return Ok(None);
        };

        let discount_value = params.discount_value.unwrap_or(existing.discount_value);
        let max_uses = params.max_uses.unwrap_or(existing.max_uses);
        let valid_until = params.valid_until.unwrap_or(existing.valid_until);
        let is_active = params.is_active.unwrap_or(existing.is_active);

        let row = sqlx::query_as::<_, PromoRow>(
            r"
            UPDATE promo_codes
            SET discount_value = $2, max_uses = $3, valid_until = $4, is_active = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING
                id, code, discount_type, discount_value, max_uses, times_used,
                valid_from, valid_until, plan_duration, is_active, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(discount_value)
        .bind(max_uses)
        .bind(valid_until)
        .bind(is_active)
        .fetch_one(&mut *tx)
        .await
        .map_err(StorageError::Database)?;

        tx.commit().await.map_err(StorageError::Database)?;
        Ok(Some(row.into()))
    }

    async fn delete_promo(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM promo_codes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(StorageError::Database)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_promos(&self) -> Result<Vec<PromoCode>> {
        let rows = sqlx::query_as::<_, PromoRow>(
            r"
            SELECT
                id, code, discount_type, discount_value, max_uses, times_used,
                valid_from, valid_until, plan_duration, is_active, created_at, updated_at
            FROM promo_codes
            ORDER BY created_at DESC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::Database)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_promo_by_code(&self, code: &str) -> Result<Option<PromoCode>> {
        let row = sqlx::query_as::<_, PromoRow>(
            r"
            SELECT
                id, code, discount_type, discount_value, max_uses, times_used,
                valid_from, valid_until, plan_duration, is_active, created_at, updated_at
            FROM promo_codes
            WHERE code = UPPER(TRIM($1))
            ",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::Database)?;

        Ok(row.map(Into::into))
    }

    async fn get_promo(&self, id: Uuid) -> Result<Option<PromoCode>> {
        let row = sqlx::query_as::<_, PromoRow>(
            r"
            SELECT
                id, code, discount_type, discount_value, max_uses, times_used,
                valid_from, valid_until, plan_duration, is_active, created_at, updated_at
            FROM promo_codes
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::Database)?;

        Ok(row.map(Into::into))
    }

    async fn has_redeemed(&self, promo_id: Uuid, user_id: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM promo_redemptions WHERE promo_id = $1 AND user_id = $2)",
        )
        .bind(promo_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(StorageError::Database)?;

        Ok(exists)
    }

    async fn redeem_promo(&self, promo_id: Uuid, user_id: &str) -> Result<RedemptionOutcome> {
        let mut tx = self.pool.begin().await.map_err(StorageError::Database)?;

        // The primary key on (promo_id, user_id) is the correctness
        // mechanism: a duplicate redemption fails the insert, it is never
        // pre-checked here.
        let insert = sqlx::query(
            "INSERT INTO promo_redemptions (promo_id, user_id) VALUES ($1, $2)",
        )
        .bind(promo_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await;

        if let Err(e) = insert {
            let duplicate = e
                .as_database_error()
                .is_some_and(sqlx::error::DatabaseError::is_unique_violation);
            tx.rollback().await.map_err(StorageError::Database)?;
            if duplicate {
                return Ok(RedemptionOutcome::AlreadyRedeemed);
            }
            return Err(StorageError::Database(e).into());
        }

        // Guarded increment: zero rows means the cap was hit (or the code
        // vanished) and the whole redemption rolls back.
        let updated = sqlx::query(
            r"
            UPDATE promo_codes
            SET times_used = times_used + 1, updated_at = NOW()
            WHERE id = $1 AND (max_uses IS NULL OR times_used < max_uses)
            ",
        )
        .bind(promo_id)
        .execute(&mut *tx)
        .await
        .map_err(StorageError::Database)?;

        if updated.rows_affected() == 0 {
            tx.rollback().await.map_err(StorageError::Database)?;
            return Ok(RedemptionOutcome::Exhausted);
        }

        tx.commit().await.map_err(StorageError::Database)?;
        Ok(RedemptionOutcome::Redeemed)
    }
}

#[async_trait]
impl BillingStorage for SqlxStorage {
    async fn insert_order(&self, params: OrderInsertParams) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO orders (order_id, user_id, plan_duration, amount, currency, promo_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(&params.order_id)
        .bind(&params.user_id)
        .bind(params.plan_duration)
        .bind(params.amount)
        .bind(&params.currency)
        .bind(params.promo_id)
        .execute(&self.pool)
        .await
        .map_err(StorageError::Database)?;

        Ok(())
    }

    async fn get_order(&self, order_id: &str) -> Result<Option<PaymentOrder>> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT order_id, user_id, plan_duration, amount, currency, promo_id, created_at
            FROM orders
            WHERE order_id = $1
            ",
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::Database)?;

        Ok(row.map(|row| PaymentOrder {
            order_id: row.order_id,
            user_id: row.user_id,
            plan_duration: row.plan_duration,
            amount: row.amount,
            currency: row.currency,
            promo_id: row.promo_id,
            created_at: row.created_at,
        }))
    }

    async fn record_payment(&self, payment_id: &str, order_id: &str) -> Result<bool> {
        let result = sqlx::query(
            r"
            INSERT INTO payments (payment_id, order_id)
            VALUES ($1, $2)
            ON CONFLICT (payment_id) DO NOTHING
            ",
        )
        .bind(payment_id)
        .bind(order_id)
        .execute(&self.pool)
        .await
        .map_err(StorageError::Database)?;

        Ok(result.rows_affected() > 0)
    }
}

/// Internal row type for subscription queries.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    user_id: String,
    plan: Plan,
    status: SubscriptionStatus,
    plan_duration: Option<PlanDuration>,
    current_period_start: Option<DateTime<Utc>>,
    current_period_end: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Internal row type for promo-code queries.
#[derive(Debug, sqlx::FromRow)]
struct PromoRow {
    id: Uuid,
    code: String,
    discount_type: DiscountType,
    discount_value: i64,
    max_uses: Option<i32>,
    times_used: i32,
    valid_from: DateTime<Utc>,
    valid_until: Option<DateTime<Utc>>,
    plan_duration: PlanDuration,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PromoRow> for PromoCode {
    fn from(row: PromoRow) -> Self {
        Self {
            id: row.id,
            code: row.code,
            discount_type: row.discount_type,
            discount_value: row.discount_value,
            max_uses: row.max_uses,
            times_used: row.times_used,
            valid_from: row.valid_from,
            valid_until: row.valid_until,
            plan_duration: row.plan_duration,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Internal row type for order queries.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    order_id: String,
    user_id: String,
    plan_duration: PlanDuration,
    amount: i64,
    currency: String,
    promo_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

//! Subscription plan state for persona chat users.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Subscription plan for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    /// Free tier (default), limited to a daily message quota.
    #[default]
    Free,
    /// Pro tier with unlimited messages.
    Pro,
}

impl Plan {
    /// Returns true if this plan grants unlimited messaging.
    #[must_use]
    pub fn is_pro(&self) -> bool {
        matches!(self, Self::Pro)
    }
}

/// Lifecycle status of a subscription record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Subscription is in good standing.
    #[default]
    Active,
    /// Cancelled by the user or an admin; access ends with the period.
    Cancelled,
    /// Stored as expired by an explicit admin write. Never set implicitly;
    /// expiry is otherwise evaluated lazily against the period end.
    Expired,
}

/// Billing period length for a pro subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanDuration {
    Week,
    Month,
    Year,
}

impl PlanDuration {
    /// Calendar length of one billing period.
    #[must_use]
    pub fn period(&self) -> Duration {
        match self {
            Self::Week => Duration::days(7),
            Self::Month => Duration::days(30),
            Self::Year => Duration::days(365),
        }
    }
}

/// A user's subscription record.
///
/// There is at most one per user. Absence of a record means free tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    /// Identifier from the external auth provider.
    pub user_id: String,
    pub plan: Plan,
    pub status: SubscriptionStatus,
    /// Billing period granted, when the plan is pro.
    pub plan_duration: Option<PlanDuration>,
    pub current_period_start: Option<DateTime<Utc>>,
    /// End of the paid period (None = no expiry).
    pub current_period_end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// Returns true if the subscription grants pro access at `now`.
    ///
    /// This is the single expiry check: no code path mutates status to
    /// `Expired` proactively, every consumer compares the period end here.
    pub fn is_pro(&self, now: DateTime<Utc>) -> bool {
        if !self.plan.is_pro() || self.status != SubscriptionStatus::Active {
            return false;
        }
        match self.current_period_end {
            Some(end) => end > now,
            None => true,
        }
    }
}

/// Parameters for creating or replacing a subscription record.
#[derive(Debug, Clone)]
pub struct SubscriptionUpsertParams {
    pub user_id: String,
    pub plan: Plan,
    pub status: SubscriptionStatus,
    pub plan_duration: Option<PlanDuration>,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
}

#[cfg(feature = "sqlx-storage")]
impl sqlx::Type<sqlx::Postgres> for Plan {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }
}

#[cfg(feature = "sqlx-storage")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Plan {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        match s.as_str() {
            "pro" => Ok(Self::Pro),
            _ => Ok(Self::Free),
        }
    }
}

#[cfg(feature = "sqlx-storage")]
impl sqlx::Encode<'_, sqlx::Postgres> for Plan {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        let s = match self {
            Self::Free => "free",
            Self::Pro => "pro",
        };
        <&str as sqlx::Encode<sqlx::Postgres>>::encode(s, buf)
    }
}

#[cfg(feature = "sqlx-storage")]
impl sqlx::Type<sqlx::Postgres> for SubscriptionStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }
}

#[cfg(feature = "sqlx-storage")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for SubscriptionStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        match s.as_str() {
            "cancelled" => Ok(Self::Cancelled),
            "expired" => Ok(Self::Expired),
            _ => Ok(Self::Active),
        }
    }
}

#[cfg(feature = "sqlx-storage")]
impl sqlx::Encode<'_, sqlx::Postgres> for SubscriptionStatus {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        let s = match self {
            Self::Active => "active",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        };
        <&str as sqlx::Encode<sqlx::Postgres>>::encode(s, buf)
    }
}

#[cfg(feature = "sqlx-storage")]
impl sqlx::Type<sqlx::Postgres> for PlanDuration {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }
}

#[cfg(feature = "sqlx-storage")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for PlanDuration {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        match s.as_str() {
            "week" => Ok(Self::Week),
            "year" => Ok(Self::Year),
            _ => Ok(Self::Month),
        }
    }
}

#[cfg(feature = "sqlx-storage")]
impl sqlx::Encode<'_, sqlx::Postgres> for PlanDuration {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        let s = match self {
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        };
        <&str as sqlx::Encode<sqlx::Postgres>>::encode(s, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_subscription(plan: Plan, status: SubscriptionStatus) -> Subscription {
        Subscription {
            user_id: "user-1".to_string(),
            plan,
            status,
            plan_duration: Some(PlanDuration::Month),
            current_period_start: Some(Utc::now()),
            current_period_end: Some(Utc::now() + Duration::days(30)),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_plan_default_is_free() {
        let plan: Plan = Default::default();
        assert_eq!(plan, Plan::Free);
        assert!(!plan.is_pro());
    }

    #[test]
    fn test_pro_active_within_period() {
        let sub = make_subscription(Plan::Pro, SubscriptionStatus::Active);
        assert!(sub.is_pro(Utc::now()));
    }

    #[test]
    fn test_pro_lazy_expiry() {
        let mut sub = make_subscription(Plan::Pro, SubscriptionStatus::Active);
        sub.current_period_end = Some(Utc::now() - Duration::days(1));
        assert!(!sub.is_pro(Utc::now()));
    }

    #[test]
    fn test_pro_without_period_end_is_open_ended() {
        let mut sub = make_subscription(Plan::Pro, SubscriptionStatus::Active);
        sub.current_period_end = None;
        assert!(sub.is_pro(Utc::now()));
    }

    #[test]
    fn test_cancelled_is_not_pro() {
        let sub = make_subscription(Plan::Pro, SubscriptionStatus::Cancelled);
        assert!(!sub.is_pro(Utc::now()));
    }

    #[test]
    fn test_free_plan_is_never_pro() {
        let sub = make_subscription(Plan::Free, SubscriptionStatus::Active);
        assert!(!sub.is_pro(Utc::now()));
    }

    #[test]
    fn test_plan_duration_periods() {
        assert_eq!(PlanDuration::Week.period(), Duration::days(7));
        assert_eq!(PlanDuration::Month.period(), Duration::days(30));
        assert_eq!(PlanDuration::Year.period(), Duration::days(365));
    }

    #[test]
    fn test_plan_serde() {
        let json = serde_json::to_string(&Plan::Pro).unwrap();
        assert_eq!(json, "\"pro\"");
        let parsed: Plan = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Plan::Pro);
    }

    #[test]
    fn test_plan_duration_serde() {
        let json = serde_json::to_string(&PlanDuration::Week).unwrap();
        assert_eq!(json, "\"week\"");
    }
}

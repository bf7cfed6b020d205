//! Promo code types and discount classification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::subscription::PlanDuration;

/// How a promo code discounts the base price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// Percentage off the base price (100 = free).
    Percentage,
    /// Fixed amount off, in minor currency units.
    Fixed,
}

/// A redeemable promo code.
///
/// Codes are matched case-insensitively and stored upper-cased.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoCode {
    pub id: Uuid,
    pub code: String,
    pub discount_type: DiscountType,
    /// Percent (0-100+) or minor units depending on `discount_type`.
    pub discount_value: i64,
    /// Redemption cap (None = unlimited).
    pub max_uses: Option<i32>,
    pub times_used: i32,
    pub valid_from: DateTime<Utc>,
    /// End of validity (None = open ended).
    pub valid_until: Option<DateTime<Utc>>,
    /// Pro period granted on redemption.
    pub plan_duration: PlanDuration,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PromoCode {
    /// Discount in minor units against `base_amount`.
    ///
    /// Never exceeds the base amount.
    #[must_use]
    pub fn discount_amount(&self, base_amount: i64) -> i64 {
        let raw = match self.discount_type {
            DiscountType::Percentage => base_amount * self.discount_value / 100,
            DiscountType::Fixed => self.discount_value,
        };
        raw.clamp(0, base_amount)
    }

    /// True when the discount fully covers the base price, making the code
    /// directly redeemable without a payment step.
    #[must_use]
    pub fn covers_full_price(&self, base_amount: i64) -> bool {
        match self.discount_type {
            DiscountType::Percentage => self.discount_value >= 100,
            DiscountType::Fixed => self.discount_value >= base_amount,
        }
    }

    /// True when the redemption cap has been reached.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        match self.max_uses {
            Some(max) => self.times_used >= max,
            None => false,
        }
    }
}

/// Discount terms returned by validation, without consuming the code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoTerms {
    pub promo_id: Uuid,
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub plan_duration: PlanDuration,
    /// True when redemption needs no payment step.
    pub free_redemption: bool,
}

/// A recorded (promo, user) redemption. At most one per pairing, enforced
/// by the storage backend as a uniqueness constraint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoRedemption {
    pub promo_id: Uuid,
    pub user_id: String,
    pub redeemed_at: DateTime<Utc>,
}

/// Why a promo code failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromoInvalidReason {
    /// No such code.
    NotFound,
    /// Disabled by an admin.
    Inactive,
    /// Campaign has not started yet.
    NotYetActive,
    /// Campaign has ended.
    Expired,
    /// Redemption cap reached.
    Exhausted,
    /// The requesting user already redeemed this code.
    AlreadyRedeemed,
}

impl PromoInvalidReason {
    /// User-facing message for the failure.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotFound => "invalid promo code",
            Self::Inactive => "this promo code is no longer valid",
            Self::NotYetActive => "this promo code is not active yet",
            Self::Expired => "this promo code has expired",
            Self::Exhausted => "this promo code has been fully redeemed",
            Self::AlreadyRedeemed => "you have already used this promo code",
        }
    }
}

impl std::fmt::Display for PromoInvalidReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

/// Parameters for creating a promo code.
#[derive(Debug, Clone, Deserialize)]
pub struct PromoCreateParams {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub max_uses: Option<i32>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub plan_duration: PlanDuration,
}

/// Parameters for updating a promo code. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PromoUpdateParams {
    pub discount_value: Option<i64>,
    pub max_uses: Option<Option<i32>>,
    pub valid_until: Option<Option<DateTime<Utc>>>,
    pub is_active: Option<bool>,
}

#[cfg(feature = "sqlx-storage")]
impl sqlx::Type<sqlx::Postgres> for DiscountType {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }
}

#[cfg(feature = "sqlx-storage")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for DiscountType {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        match s.as_str() {
            "fixed" => Ok(Self::Fixed),
            _ => Ok(Self::Percentage),
        }
    }
}

#[cfg(feature = "sqlx-storage")]
impl sqlx::Encode<'_, sqlx::Postgres> for DiscountType {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        let s = match self {
            Self::Percentage => "percentage",
            Self::Fixed => "fixed",
        };
        <&str as sqlx::Encode<sqlx::Postgres>>::encode(s, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_promo(discount_type: DiscountType, discount_value: i64) -> PromoCode {
        PromoCode {
            id: Uuid::new_v4(),
            code: "WELCOME".to_string(),
            discount_type,
            discount_value,
            max_uses: Some(100),
            times_used: 0,
            valid_from: Utc::now(),
            valid_until: None,
            plan_duration: PlanDuration::Month,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_full_percentage_covers_price() {
        let promo = make_promo(DiscountType::Percentage, 100);
        assert!(promo.covers_full_price(49900));
        assert_eq!(promo.discount_amount(49900), 49900);
    }

    #[test]
    fn test_half_percentage_is_partial() {
        let promo = make_promo(DiscountType::Percentage, 50);
        assert!(!promo.covers_full_price(49900));
        assert_eq!(promo.discount_amount(49900), 24950);
    }

    #[test]
    fn test_fixed_discount_covering_price() {
        let promo = make_promo(DiscountType::Fixed, 50000);
        assert!(promo.covers_full_price(49900));
    }

    #[test]
    fn test_fixed_discount_never_exceeds_base() {
        let promo = make_promo(DiscountType::Fixed, 50000);
        assert_eq!(promo.discount_amount(49900), 49900);
    }

    #[test]
    fn test_exhaustion() {
        let mut promo = make_promo(DiscountType::Percentage, 100);
        promo.max_uses = Some(1);
        promo.times_used = 1;
        assert!(promo.is_exhausted());

        promo.max_uses = None;
        assert!(!promo.is_exhausted());
    }

    #[test]
    fn test_invalid_reason_messages_are_specific() {
        assert_eq!(
            PromoInvalidReason::Expired.user_message(),
            "this promo code has expired"
        );
        assert_eq!(
            PromoInvalidReason::Exhausted.user_message(),
            "this promo code has been fully redeemed"
        );
        assert_eq!(
            PromoInvalidReason::AlreadyRedeemed.user_message(),
            "you have already used this promo code"
        );
    }

    #[test]
    fn test_reason_serde() {
        let json = serde_json::to_string(&PromoInvalidReason::AlreadyRedeemed).unwrap();
        assert_eq!(json, "\"already_redeemed\"");
    }
}

//! Admin routes: promo campaign management and manual subscription control.
//!
//! Every handler here takes [`AdminUser`], so the admin claim is checked
//! before any body parsing happens.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rand::{distr::Alphanumeric, Rng};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::AdminUser,
    error::{Error, Result},
    models::{
        DiscountType, Plan, PlanDuration, PromoCode, PromoCreateParams, PromoUpdateParams,
        SubscriptionStatus,
    },
    AppState,
};

/// Length of generated promo codes.
const GENERATED_CODE_LEN: usize = 8;

/// Create an Axum router with the admin routes.
///
/// Routes:
/// - `POST /promos` - Create a promo code (generated when none supplied)
/// - `GET /promos` - List all promo codes
/// - `PATCH /promos/{id}` - Patch a promo code
/// - `DELETE /promos/{id}` - Delete a promo code
/// - `PUT /subscriptions/{user_id}` - Set a user's subscription directly
/// - `DELETE /subscriptions/{user_id}` - Remove a user's subscription record
pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/promos", get(list_promos).post(create_promo))
        .route("/promos/{id}", delete(delete_promo).patch(update_promo))
        .route(
            "/subscriptions/{user_id}",
            put(set_subscription).delete(delete_subscription),
        )
}

#[derive(Debug, Deserialize)]
pub struct CreatePromoRequest {
    /// Explicit code; a random one is generated when omitted.
    #[serde(default)]
    pub code: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    #[serde(default)]
    pub max_uses: Option<i32>,
    #[serde(default)]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
    pub plan_duration: PlanDuration,
}

#[derive(Debug, Deserialize)]
pub struct SetSubscriptionRequest {
    pub plan: Plan,
    pub status: SubscriptionStatus,
    #[serde(default)]
    pub plan_duration: Option<PlanDuration>,
}

fn generate_code() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_CODE_LEN)
        .map(char::from)
        .collect::<String>()
        .to_uppercase()
}

/// Create a promo code.
pub async fn create_promo(
    admin: AdminUser,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreatePromoRequest>,
) -> Result<(StatusCode, Json<PromoCode>)> {
    if payload.discount_value <= 0 {
        return Err(Error::InvalidRequest(
            "discount_value must be positive".to_string(),
        ));
    }
    if payload.max_uses.is_some_and(|max| max <= 0) {
        return Err(Error::InvalidRequest(
            "max_uses must be positive".to_string(),
        ));
    }

    let code = match payload.code {
        Some(code) if !code.trim().is_empty() => code,
        _ => generate_code(),
    };

    let promo = state
        .storage
        .create_promo(PromoCreateParams {
            code,
            discount_type: payload.discount_type,
            discount_value: payload.discount_value,
            max_uses: payload.max_uses,
            valid_from: payload.valid_from,
            valid_until: payload.valid_until,
            plan_duration: payload.plan_duration,
        })
        .await?;

    tracing::info!(admin = %admin.0.user_id, code = %promo.code, "promo code created");
    Ok((StatusCode::CREATED, Json(promo)))
}

/// List all promo codes, newest first.
pub async fn list_promos(
    _admin: AdminUser,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PromoCode>>> {
    let promos = state.storage.list_promos().await?;
    Ok(Json(promos))
}

/// Patch a promo code. Absent fields are left unchanged.
pub async fn update_promo(
    admin: AdminUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PromoUpdateParams>,
) -> Result<Json<PromoCode>> {
    let promo = state
        .storage
        .update_promo(id, payload)
        .await?
        .ok_or(Error::PromoNotFound)?;

    tracing::info!(admin = %admin.0.user_id, code = %promo.code, "promo code updated");
    Ok(Json(promo))
}

/// Delete a promo code.
pub async fn delete_promo(
    admin: AdminUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    if !state.storage.delete_promo(id).await? {
        return Err(Error::PromoNotFound);
    }

    tracing::info!(admin = %admin.0.user_id, promo_id = %id, "promo code deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Set a user's subscription directly (support overrides, refunds).
pub async fn set_subscription(
    admin: AdminUser,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(payload): Json<SetSubscriptionRequest>,
) -> Result<StatusCode> {
    state
        .entitlements
        .set_subscription(&user_id, payload.plan, payload.status, payload.plan_duration)
        .await?;

    tracing::info!(admin = %admin.0.user_id, user_id, "subscription set by admin");
    Ok(StatusCode::NO_CONTENT)
}

/// Remove a user's subscription record.
pub async fn delete_subscription(
    admin: AdminUser,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<StatusCode> {
    state.entitlements.delete_subscription(&user_id).await?;

    tracing::info!(admin = %admin.0.user_id, user_id, "subscription deleted by admin");
    Ok(StatusCode::NO_CONTENT)
}

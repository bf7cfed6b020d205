//! Entitlement routes: current plan/usage, promo validation and redemption.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    entitlement::Entitlement,
    error::Result,
    models::{PlanDuration, PromoTerms},
    AppState,
};

/// Create an Axum router with the entitlement routes.
///
/// Routes:
/// - `GET /me` - Current plan, period end and today's usage
/// - `DELETE /me` - Delete the caller's subscription data
/// - `POST /promo/validate` - Check a promo code without consuming it
/// - `POST /promo/redeem` - Redeem a fully-covering promo code
pub fn entitlement_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/me", get(get_entitlement))
        .route("/me", delete(delete_my_data))
        .route("/promo/validate", post(validate_promo))
        .route("/promo/redeem", post(redeem_promo))
}

#[derive(Debug, Deserialize)]
pub struct ValidatePromoRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct ValidatePromoResponse {
    pub valid: bool,
    pub terms: PromoTerms,
}

#[derive(Debug, Deserialize)]
pub struct RedeemPromoRequest {
    pub promo_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct RedeemPromoResponse {
    pub success: bool,
    pub plan_duration: PlanDuration,
}

/// Current entitlement snapshot for the caller.
pub async fn get_entitlement(
    user: AuthenticatedUser,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Entitlement>> {
    let entitlement = state.entitlements.snapshot(&user.user_id).await?;
    Ok(Json(entitlement))
}

/// User-initiated data wipe: removes the subscription record, reverting the
/// caller to default free treatment.
pub async fn delete_my_data(
    user: AuthenticatedUser,
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode> {
    state.entitlements.delete_subscription(&user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Validate a promo code for the caller without consuming it.
///
/// Invalid codes come back as a 422 with the specific reason ("expired",
/// "fully redeemed", ...) rather than a generic failure.
pub async fn validate_promo(
    user: AuthenticatedUser,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ValidatePromoRequest>,
) -> Result<Json<ValidatePromoResponse>> {
    let terms = state
        .entitlements
        .validate_promo(&user.user_id, &payload.code)
        .await?;

    Ok(Json(ValidatePromoResponse { valid: true, terms }))
}

/// Redeem a promo code that fully covers the base price.
///
/// Validation happens server side again here; partial discounts are turned
/// away toward order creation.
pub async fn redeem_promo(
    user: AuthenticatedUser,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RedeemPromoRequest>,
) -> Result<Json<RedeemPromoResponse>> {
    let plan_duration = state
        .entitlements
        .redeem_promo(&user.user_id, payload.promo_id)
        .await?;

    tracing::info!(user_id = %user.user_id, promo_id = %payload.promo_id, "promo redeemed");

    Ok(Json(RedeemPromoResponse {
        success: true,
        plan_duration,
    }))
}

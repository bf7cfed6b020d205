//! Billing routes: order creation, payment verification and the gateway
//! webhook.
//!
//! Everything here is fail-closed: no entitlement changes without a
//! positive, verified signature.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    error::{Error, Result},
    models::PlanDuration,
    payment::{self, WebhookEvent},
    AppState,
};

const WEBHOOK_SIGNATURE_HEADER: &str = "x-razorpay-signature";

/// Create an Axum router with the billing routes.
///
/// Routes:
/// - `POST /order` - Create a payment order for a pro period
/// - `POST /verify` - Verify a completed checkout and apply the upgrade
/// - `POST /webhook` - Gateway notification endpoint (signature over raw body)
pub fn billing_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/order", post(create_order))
        .route("/verify", post(verify_payment))
        .route("/webhook", post(payment_webhook))
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub plan_duration: PlanDuration,
    #[serde(default)]
    pub promo_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    pub order_id: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyPaymentRequest {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyPaymentResponse {
    pub success: bool,
}

/// Create a gateway order for one pro period, applying an optional partial
/// promo discount. Fully covered promos are rejected here and redeemed
/// directly instead.
pub async fn create_order(
    user: AuthenticatedUser,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<CreateOrderResponse>> {
    let quote = state
        .entitlements
        .quote_order(&user.user_id, payload.plan_duration, payload.promo_id)
        .await?;

    let receipt = Uuid::new_v4().to_string();
    let order = state
        .gateway
        .create_order(quote.amount, &quote.currency, &receipt)
        .await
        .map_err(|e| {
            tracing::error!(user_id = %user.user_id, "gateway order creation failed: {e}");
            Error::PaymentGateway("order creation failed".to_string())
        })?;

    state
        .entitlements
        .record_order(&user.user_id, &order.id, &quote)
        .await?;

    tracing::info!(
        user_id = %user.user_id,
        order_id = %order.id,
        amount = quote.amount,
        "payment order created"
    );

    Ok(Json(CreateOrderResponse {
        order_id: order.id,
        amount: quote.amount,
        currency: quote.currency,
    }))
}

/// Verify a completed checkout.
///
/// The signature covers `"{order_id}|{payment_id}"` with the key secret; a
/// mismatch rejects the request without touching entitlement state.
pub async fn verify_payment(
    user: AuthenticatedUser,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<VerifyPaymentRequest>,
) -> Result<Json<VerifyPaymentResponse>> {
    payment::verify_payment_signature(
        &payload.order_id,
        &payload.payment_id,
        &payload.signature,
        &state.config.billing.key_secret,
    )
    .inspect_err(|_| {
        tracing::warn!(
            user_id = %user.user_id,
            order_id = %payload.order_id,
            "payment signature mismatch"
        );
    })?;

    state
        .entitlements
        .apply_payment(&payload.order_id, &payload.payment_id)
        .await?;

    Ok(Json(VerifyPaymentResponse { success: true }))
}

/// Gateway webhook: signature over the raw body, then apply the captured
/// payment. Responds 200/400 only.
pub async fn payment_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode> {
    let signature = headers
        .get(WEBHOOK_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(Error::SignatureMismatch)?;

    payment::verify_webhook_signature(
        &body,
        signature,
        &state.config.billing.webhook_secret,
    )
    .inspect_err(|_| tracing::warn!("webhook signature mismatch"))?;

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| Error::InvalidRequest(format!("malformed webhook body: {e}")))?;

    if event.event != "payment.captured" {
        tracing::debug!(event = %event.event, "ignoring webhook event");
        return Ok(StatusCode::OK);
    }

    let entity = event.payload.payment.entity;
    state
        .entitlements
        .apply_payment(&entity.order_id, &entity.id)
        .await
        .map_err(|e| {
            tracing::warn!(order_id = %entity.order_id, "webhook payment not applied: {e}");
            Error::InvalidRequest("unknown order".to_string())
        })?;

    Ok(StatusCode::OK)
}

//! Payment gateway boundary: signature verification and order creation.
//!
//! A payment is trusted only after a keyed-hash check: HMAC-SHA256 over
//! `"{order_id}|{payment_id}"` for the synchronous verification call, or
//! over the raw notification body for webhooks. Mismatches are rejected
//! outright and never touch entitlement state.

use ring::hmac;
use serde::{Deserialize, Serialize};

use crate::{
    config::BillingConfig,
    error::{Error, Result},
};

/// Verify the signature returned by the checkout flow.
///
/// Fail-closed: any decoding or verification failure is a mismatch.
pub fn verify_payment_signature(
    order_id: &str,
    payment_id: &str,
    signature_hex: &str,
    secret: &str,
) -> Result<()> {
    verify_hex_hmac(format!("{order_id}|{payment_id}").as_bytes(), signature_hex, secret)
}

/// Verify an asynchronous webhook notification against its raw body.
pub fn verify_webhook_signature(raw_body: &[u8], signature_hex: &str, secret: &str) -> Result<()> {
    verify_hex_hmac(raw_body, signature_hex, secret)
}

fn verify_hex_hmac(message: &[u8], signature_hex: &str, secret: &str) -> Result<()> {
    let expected = hex::decode(signature_hex.trim()).map_err(|_| Error::SignatureMismatch)?;
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    hmac::verify(&key, message, &expected).map_err(|_| Error::SignatureMismatch)
}

/// Hex-encoded HMAC-SHA256 tag, used by tests and by tooling that needs to
/// produce signatures the verifier accepts.
#[must_use]
pub fn sign_hex(message: &[u8], secret: &str) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    hex::encode(hmac::sign(&key, message).as_ref())
}

/// Order created with the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Serialize)]
struct GatewayOrderRequest<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

/// Thin client for the payment gateway's order API.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http_client: reqwest::Client,
    gateway_url: String,
    key_id: String,
    key_secret: String,
}

impl GatewayClient {
    pub fn new(http_client: reqwest::Client, config: &BillingConfig) -> Self {
        Self {
            http_client,
            gateway_url: config.gateway_url.clone(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
        }
    }

    /// Create an order for the given amount, returning the gateway order id.
    pub async fn create_order(
        &self,
        amount: i64,
        currency: &str,
        receipt: &str,
    ) -> anyhow::Result<GatewayOrder> {
        let response = self
            .http_client
            .post(format!("{}/orders", self.gateway_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&GatewayOrderRequest {
                amount,
                currency,
                receipt,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            tracing::error!("gateway order creation failed: {} - {}", status, error_text);
            anyhow::bail!("gateway order creation failed with status {status}");
        }

        Ok(response.json::<GatewayOrder>().await?)
    }
}

/// Payment-captured webhook event, reduced to the fields the handler uses.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    pub payload: WebhookPayload,
}

#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    pub payment: WebhookPaymentWrapper,
}

#[derive(Debug, Deserialize)]
pub struct WebhookPaymentWrapper {
    pub entity: WebhookPaymentEntity,
}

#[derive(Debug, Deserialize)]
pub struct WebhookPaymentEntity {
    pub id: String,
    pub order_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test_secret";

    #[test]
    fn test_payment_signature_round_trip() {
        let sig = sign_hex(b"order_1|pay_1", SECRET);
        assert!(verify_payment_signature("order_1", "pay_1", &sig, SECRET).is_ok());
    }

    #[test]
    fn test_tampered_payment_id_rejected() {
        let sig = sign_hex(b"order_1|pay_1", SECRET);
        let err = verify_payment_signature("order_1", "pay_2", &sig, SECRET).unwrap_err();
        assert!(matches!(err, Error::SignatureMismatch));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let sig = sign_hex(b"order_1|pay_1", "other_secret");
        assert!(verify_payment_signature("order_1", "pay_1", &sig, SECRET).is_err());
    }

    #[test]
    fn test_non_hex_signature_rejected() {
        let err = verify_payment_signature("order_1", "pay_1", "not-hex!", SECRET).unwrap_err();
        assert!(matches!(err, Error::SignatureMismatch));
    }

    #[test]
    fn test_webhook_signature_over_raw_body() {
        let body = br#"{"event":"payment.captured"}"#;
        let sig = sign_hex(body, SECRET);
        assert!(verify_webhook_signature(body, &sig, SECRET).is_ok());

        let tampered = br#"{"event":"payment.captured" }"#;
        assert!(verify_webhook_signature(tampered, &sig, SECRET).is_err());
    }

    #[test]
    fn test_webhook_event_deserialization() {
        let json = r#"{
            "event": "payment.captured",
            "payload": {
                "payment": {
                    "entity": {"id": "pay_9", "order_id": "order_9", "amount": 49900}
                }
            }
        }"#;
        let event: WebhookEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.event, "payment.captured");
        assert_eq!(event.payload.payment.entity.id, "pay_9");
        assert_eq!(event.payload.payment.entity.order_id, "order_9");
    }
}

//! Error types for the persona chat backend.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::models::PromoInvalidReason;

/// Result type alias using the library's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for persona chat operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Storage operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Promo code failed validation.
    #[error("{}", .0.user_message())]
    PromoInvalid(PromoInvalidReason),

    /// Free-tier daily message quota reached. A normal, expected state.
    #[error("daily free message limit reached, upgrade to pro for unlimited messages")]
    QuotaExceeded,

    /// Payment or webhook signature did not verify.
    #[error("could not verify payment")]
    SignatureMismatch,

    /// Payment gateway request failed.
    #[error("payment gateway error: {0}")]
    PaymentGateway(String),

    /// LLM completion request failed.
    #[error("language model error: {0}")]
    LlmApi(String),

    /// JWT token operation failed.
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// Authentication failed.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// Caller lacks the admin capability.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Referenced order does not exist.
    #[error("order not found: {0}")]
    OrderNotFound(String),

    /// Referenced promo code does not exist.
    #[error("promo code not found")]
    PromoNotFound,

    /// Invalid request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Storage-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database query failed.
    #[cfg(feature = "sqlx-storage")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Generic storage error for non-sqlx backends.
    #[error("storage error: {0}")]
    Other(String),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Error::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            Error::PromoInvalid(_) => (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()),
            Error::QuotaExceeded => (StatusCode::TOO_MANY_REQUESTS, self.to_string()),
            // Deliberately generic, no cryptographic detail in the body.
            Error::SignatureMismatch => (StatusCode::BAD_REQUEST, self.to_string()),
            Error::PaymentGateway(_) | Error::LlmApi(_) => {
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
            Error::Jwt(_) => (StatusCode::UNAUTHORIZED, "invalid token".to_string()),
            Error::AuthFailed(_) => (StatusCode::UNAUTHORIZED, self.to_string()),
            Error::Forbidden(_) => (StatusCode::FORBIDDEN, self.to_string()),
            Error::OrderNotFound(_) | Error::PromoNotFound => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            Error::InvalidRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
        };

        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::OrderNotFound("order_123".to_string());
        assert_eq!(err.to_string(), "order not found: order_123");
    }

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::Other("test error".to_string());
        assert_eq!(err.to_string(), "storage error: test error");
    }

    #[test]
    fn test_error_from_storage_error() {
        let storage_err = StorageError::Other("test".to_string());
        let err: Error = storage_err.into();
        assert!(matches!(err, Error::Storage(_)));
    }

    #[test]
    fn test_promo_invalid_uses_specific_message() {
        let err = Error::PromoInvalid(PromoInvalidReason::Expired);
        assert_eq!(err.to_string(), "this promo code has expired");
    }

    #[test]
    fn test_signature_mismatch_is_generic() {
        let err = Error::SignatureMismatch;
        assert_eq!(err.to_string(), "could not verify payment");
    }

    #[test]
    fn test_quota_exceeded_prompts_upgrade() {
        let err = Error::QuotaExceeded;
        assert!(err.to_string().contains("upgrade"));
    }
}

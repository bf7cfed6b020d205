//! JWT-based request authentication.
//!
//! Identity provisioning itself lives with the external auth provider; this
//! module only issues and validates the backend's own bearer tokens and
//! exposes the [`AuthenticatedUser`] and [`AdminUser`] extractors.

use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts, RequestPartsExt};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    AppState,
};

/// Token lifetime in seconds (24 hours).
const TOKEN_TTL_SECS: i64 = 60 * 60 * 24;

/// JWT claims carried by a bearer token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User identifier from the auth provider.
    pub sub: String,
    /// Display name, for logging.
    pub name: String,
    /// Admin capability flag.
    #[serde(default)]
    pub admin: bool,
    /// Expiration (seconds since epoch).
    pub exp: i64,
    /// Issued at (seconds since epoch).
    pub iat: i64,
}

/// Generate a signed JWT for a user.
pub fn generate_token(user_id: &str, name: &str, admin: bool, secret: &str) -> Result<String> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        name: name.to_string(),
        admin,
        exp: now + TOKEN_TTL_SECS,
        iat: now,
    };

    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

/// Verify a JWT and return its claims.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

/// An authenticated request principal, extracted from the bearer token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub name: String,
    pub is_admin: bool,
}

impl FromRequestParts<Arc<AppState>> for AuthenticatedUser {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| Error::AuthFailed("missing bearer token".to_string()))?;

        let claims = verify_token(bearer.token(), &state.config.security.jwt_secret)?;

        Ok(Self {
            user_id: claims.sub,
            name: claims.name,
            is_admin: claims.admin,
        })
    }
}

/// An authenticated principal that also holds the admin capability.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthenticatedUser);

impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            tracing::warn!(user_id = %user.user_id, "non-admin invoked admin operation");
            return Err(Error::Forbidden("admin access required".to_string()));
        }
        Ok(Self(user))
    }
}

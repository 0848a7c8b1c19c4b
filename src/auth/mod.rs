//! Thin bearer-token authentication.
//!
//! Token issuance and account management live in a separate identity
//! service; this module only verifies the JWT a caller presents so route
//! handlers get a typed user identity and real 401/403 semantics.

use crate::{errors::ServiceError, AppState};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const ROLE_ADMIN: &str = "admin";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(default)]
    pub role: String,
    pub exp: i64,
}

/// Authenticated caller extracted from the Authorization header.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }

    pub fn require_admin(&self) -> Result<(), ServiceError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(
                "admin role required".to_string(),
            ))
        }
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);

        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ServiceError::Unauthorized("missing bearer token".to_string()))?;

        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or_else(|| ServiceError::Unauthorized("missing bearer token".to_string()))?
            .trim();

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(state.config.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| ServiceError::Unauthorized(format!("invalid token: {e}")))?;

        Ok(AuthUser {
            user_id: data.claims.sub,
            role: data.claims.role,
        })
    }
}

/// Issues a signed token for the given user. Used by the test harness and
/// local tooling; production tokens come from the identity service.
pub fn issue_token(
    secret: &str,
    user_id: Uuid,
    role: &str,
    ttl_secs: i64,
) -> Result<String, ServiceError> {
    let claims = Claims {
        sub: user_id,
        role: role.to_string(),
        exp: Utc::now().timestamp() + ttl_secs,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ServiceError::InternalError(format!("token encoding failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_check() {
        let admin = AuthUser {
            user_id: Uuid::new_v4(),
            role: ROLE_ADMIN.to_string(),
        };
        let guest = AuthUser {
            user_id: Uuid::new_v4(),
            role: "customer".to_string(),
        };
        assert!(admin.require_admin().is_ok());
        assert!(matches!(
            guest.require_admin(),
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[test]
    fn issued_tokens_decode_back() {
        let secret = "a_test_secret_that_is_long_enough_to_pass";
        let user_id = Uuid::new_v4();
        let token = issue_token(secret, user_id, "customer", 3600).expect("token");

        let data = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )
        .expect("decode");
        assert_eq!(data.claims.sub, user_id);
        assert_eq!(data.claims.role, "customer");
    }
}

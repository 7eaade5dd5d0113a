//! API-token validation and the optional-identity extractor.
//!
//! Tokens are HS256-signed JWTs. Long-lived keys are issued without an
//! `exp` claim; temporary tokens carry one and are rejected once past
//! it. Validation is deliberately thin -- identity management is an
//! external concern.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use runbridge_core::error::CoreError;
use runbridge_core::types::ApiCaller;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

/// Claims embedded in an API token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ApiTokenClaims {
    /// Subject -- the credential owner's user id.
    pub sub: String,
    /// Organization the credential is scoped to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Expiration (UTC Unix timestamp). Absent on long-lived keys.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// Validate a bearer token and extract its claims.
pub fn validate_token(token: &str, secret: &str) -> Result<ApiTokenClaims, CoreError> {
    // Expiry is optional for long-lived keys, so the library-level exp
    // check is disabled and applied by hand below.
    let mut validation = Validation::default();
    validation.required_spec_claims.clear();
    validation.validate_exp = false;

    let data = decode::<ApiTokenClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|_| CoreError::Unauthorized("Invalid token".into()))?;

    if let Some(exp) = data.claims.exp {
        if exp < chrono::Utc::now().timestamp() {
            return Err(CoreError::Unauthorized("Expired token".into()));
        }
    }

    Ok(data.claims)
}

/// Sign an API token. Used by operational tooling and tests.
pub fn generate_token(
    claims: &ApiTokenClaims,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Optional API identity extracted from an `Authorization` header.
///
/// Requests without the header pass through as anonymous (`None`); a
/// present-but-invalid credential is rejected with 401. Handlers use
/// the inner [`ApiCaller`] to trigger the ownership check.
#[derive(Debug, Clone)]
pub struct MaybeApiUser(pub Option<ApiCaller>);

impl FromRequestParts<AppState> for MaybeApiUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(auth_header) = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
        else {
            return Ok(MaybeApiUser(None));
        };

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <token>".into(),
            ))
        })?;

        let claims = validate_token(token, &state.config.token_secret)?;

        Ok(MaybeApiUser(Some(ApiCaller {
            user_id: claims.sub,
            org_id: claims.org_id,
        })))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const SECRET: &str = "test-secret";

    fn claims(exp: Option<i64>) -> ApiTokenClaims {
        ApiTokenClaims {
            sub: "user-1".into(),
            org_id: Some("org-1".into()),
            iat: chrono::Utc::now().timestamp(),
            exp,
        }
    }

    #[test]
    fn round_trips_long_lived_token() {
        let token = generate_token(&claims(None), SECRET).unwrap();
        let parsed = validate_token(&token, SECRET).unwrap();
        assert_eq!(parsed.sub, "user-1");
        assert_eq!(parsed.org_id.as_deref(), Some("org-1"));
        assert!(parsed.exp.is_none());
    }

    #[test]
    fn accepts_unexpired_token() {
        let exp = chrono::Utc::now().timestamp() + 3600;
        let token = generate_token(&claims(Some(exp)), SECRET).unwrap();
        assert!(validate_token(&token, SECRET).is_ok());
    }

    #[test]
    fn rejects_expired_token() {
        let exp = chrono::Utc::now().timestamp() - 10;
        let token = generate_token(&claims(Some(exp)), SECRET).unwrap();
        assert_matches!(
            validate_token(&token, SECRET),
            Err(CoreError::Unauthorized(_))
        );
    }

    #[test]
    fn rejects_wrong_secret() {
        let token = generate_token(&claims(None), SECRET).unwrap();
        assert_matches!(
            validate_token(&token, "other-secret"),
            Err(CoreError::Unauthorized(_))
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_matches!(
            validate_token("not-a-token", SECRET),
            Err(CoreError::Unauthorized(_))
        );
    }
}

//! JWT authentication middleware.

use axum::{
    async_trait,
    body::Body,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, Request},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::web::error::ApiError;

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID).
    pub sub: i64,
    /// Username.
    pub username: String,
    /// Issued at timestamp.
    pub iat: u64,
    /// Expiration timestamp.
    pub exp: u64,
    /// JWT ID (unique identifier).
    pub jti: String,
}

/// Application state for JWT authentication.
#[derive(Clone)]
pub struct JwtState {
    /// Decoding key for JWT verification.
    pub decoding_key: DecodingKey,
    /// Validation settings.
    pub validation: Validation,
}

impl JwtState {
    /// Create a new JWT state from a secret key.
    pub fn new(secret: &str) -> Self {
        let decoding_key = DecodingKey::from_secret(secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;
        validation.leeway = 0;

        Self {
            decoding_key,
            validation,
        }
    }

    /// Decode and validate a token.
    pub fn verify(&self, token: &str) -> Result<JwtClaims, ApiError> {
        decode::<JwtClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("JWT validation failed: {}", e);
                ApiError::unauthorized("Invalid or expired token")
            })
    }
}

/// Extractor for authenticated users.
///
/// The token is read from the `Authorization: Bearer` header, or from a
/// `token` query parameter so download links can be opened directly.
#[derive(Debug, Clone)]
pub struct AuthUser(pub JwtClaims);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = match parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
        {
            Some(header) => header
                .strip_prefix("Bearer ")
                .map(str::to_string)
                .ok_or_else(|| ApiError::unauthorized("Invalid authorization header"))?,
            None => token_from_query(parts.uri.query().unwrap_or(""))
                .ok_or_else(|| ApiError::unauthorized("Missing authorization"))?,
        };

        let jwt_state = parts
            .extensions
            .get::<Arc<JwtState>>()
            .ok_or_else(|| ApiError::internal("JWT state not configured"))?;

        Ok(AuthUser(jwt_state.verify(&token)?))
    }
}

fn token_from_query(query: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        if key == "token" {
            urlencoding::decode(value).ok().map(|s| s.into_owned())
        } else {
            None
        }
    })
}

/// Middleware function to inject JWT state into request extensions.
pub async fn jwt_auth(
    jwt_state: Arc<JwtState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    request.extensions_mut().insert(jwt_state);
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn create_test_token(secret: &str, claims: &JwtClaims) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn claims_expiring_in(secs: i64) -> JwtClaims {
        let now = chrono::Utc::now().timestamp();
        JwtClaims {
            sub: 1,
            username: "testuser".to_string(),
            iat: now as u64,
            exp: (now + secs) as u64,
            jti: uuid::Uuid::new_v4().to_string(),
        }
    }

    #[test]
    fn test_create_and_verify_token() {
        let secret = "test-secret";
        let state = JwtState::new(secret);

        let token = create_test_token(secret, &claims_expiring_in(3600));

        let claims = state.verify(&token).unwrap();
        assert_eq!(claims.sub, 1);
        assert_eq!(claims.username, "testuser");
    }

    #[test]
    fn test_expired_token() {
        let secret = "test-secret";
        let state = JwtState::new(secret);

        let token = create_test_token(secret, &claims_expiring_in(-3600));
        assert!(state.verify(&token).is_err());
    }

    #[test]
    fn test_invalid_secret() {
        let token = create_test_token("secret1", &claims_expiring_in(3600));
        let state = JwtState::new("secret2");

        assert!(state.verify(&token).is_err());
    }

    #[test]
    fn test_token_from_query() {
        assert_eq!(
            token_from_query("a=1&token=abc%2Edef"),
            Some("abc.def".to_string())
        );
        assert_eq!(token_from_query("a=1"), None);
        assert_eq!(token_from_query(""), None);
    }
}

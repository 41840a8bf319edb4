//! API handlers for the vasvault HTTP API.

pub mod auth;
pub mod file;
pub mod user;

pub use auth::*;
pub use file::*;
pub use user::*;

use jsonwebtoken::{encode, EncodingKey, Header};
use std::sync::Arc;

use crate::db::{NewRefreshToken, RefreshTokenRepository, User};
use crate::file::{FileService, DEFAULT_MAX_FILE_SIZE};
use crate::web::dto::TokenResponse;
use crate::web::error::ApiError;
use crate::web::middleware::JwtClaims;
use crate::Database;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<Database>,
    /// File service.
    pub files: Arc<FileService>,
    /// JWT encoding key.
    pub encoding_key: EncodingKey,
    /// Access token expiry in seconds.
    pub access_token_expiry: u64,
    /// Refresh token expiry in days.
    pub refresh_token_expiry: u64,
    /// Maximum upload size in bytes.
    pub max_upload_size: u64,
}

impl AppState {
    /// Create a new application state.
    pub fn new(
        db: Arc<Database>,
        files: Arc<FileService>,
        jwt_secret: &str,
        access_expiry: u64,
        refresh_expiry: u64,
    ) -> Self {
        Self {
            db,
            files,
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            access_token_expiry: access_expiry,
            refresh_token_expiry: refresh_expiry,
            max_upload_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    /// Set the maximum upload size in megabytes, saturating at `u64::MAX` bytes.
    pub fn with_max_upload_size_mb(mut self, max_mb: u64) -> Self {
        self.max_upload_size = max_mb.saturating_mul(1024 * 1024);
        self
    }

    /// Generate an access token for a user.
    pub fn generate_access_token(&self, user_id: i64, username: &str) -> Result<String, ApiError> {
        let now = chrono::Utc::now().timestamp() as u64;
        let claims = JwtClaims {
            sub: user_id,
            username: username.to_string(),
            iat: now,
            exp: now + self.access_token_expiry,
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to encode JWT: {}", e);
            ApiError::internal("Failed to generate token")
        })
    }

    /// Generate a refresh token.
    pub fn generate_refresh_token(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Issue and persist a new access/refresh token pair for a user.
    pub async fn issue_tokens(&self, user: &User) -> Result<TokenResponse, ApiError> {
        let access_token = self.generate_access_token(user.id, &user.username)?;
        let refresh_token = self.generate_refresh_token();

        let expires_at =
            chrono::Utc::now() + chrono::Duration::days(self.refresh_token_expiry as i64);
        let new_token = NewRefreshToken {
            user_id: user.id,
            token: refresh_token.clone(),
            expires_at: expires_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        };
        RefreshTokenRepository::new(self.db.pool())
            .create(&new_token)
            .await
            .map_err(|e| {
                tracing::error!("Failed to store refresh token: {}", e);
                ApiError::internal("Failed to create session")
            })?;

        Ok(TokenResponse {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry,
        })
    }
}

//! Authentication handlers.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::auth::{hash_password, verify_password};
use crate::db::{NewUser, RefreshTokenRepository, UserRepository};
use crate::web::dto::{
    ApiResponse, AuthResponse, LoginRequest, LogoutRequest, RefreshRequest, RegisterRequest,
    ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::VaultError;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Hash a password on the blocking pool.
pub(crate) async fn hash_password_blocking(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| {
            tracing::error!("Password hashing task failed: {}", e);
            ApiError::internal("Failed to hash password")
        })?
        .map_err(|e| {
            tracing::error!("Password hashing failed: {}", e);
            ApiError::internal("Failed to hash password")
        })
}

/// Verify a password on the blocking pool. Returns false on mismatch.
async fn verify_password_blocking(password: String, hash: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash).is_ok())
        .await
        .map_err(|e| {
            tracing::error!("Password verification task failed: {}", e);
            ApiError::internal("Failed to verify password")
        })
}

/// POST /api/auth/register - User registration.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = AuthResponse),
        (status = 409, description = "Email or username already exists"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthResponse>>), ApiError> {
    let repo = UserRepository::new(state.db.pool());

    if repo.email_exists(&req.email).await? {
        return Err(VaultError::Conflict("email".to_string()).into());
    }
    if repo.username_exists(&req.username).await? {
        return Err(VaultError::Conflict("username".to_string()).into());
    }

    let password_hash = hash_password_blocking(req.password).await?;

    // The unique indexes still catch a concurrent registration
    let user = repo
        .create(&NewUser::new(req.username, req.email, password_hash))
        .await?;

    tracing::info!(user_id = user.id, username = %user.username, "User registered");

    let token = state.issue_tokens(&user).await?;
    let response = AuthResponse {
        user: user.into(),
        token,
    };

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            response,
            "User registered successfully",
        )),
    ))
}

/// POST /api/auth/login - User login.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid email or password")
    )
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<ApiResponse<AuthResponse>>, ApiError> {
    let user = UserRepository::new(state.db.pool())
        .get_by_email(&req.email)
        .await
        .map_err(|e| {
            tracing::error!("Failed to look up user: {}", e);
            ApiError::internal("Failed to log in")
        })?
        .ok_or_else(|| ApiError::unauthorized(INVALID_CREDENTIALS))?;

    if !verify_password_blocking(req.password, user.password.clone()).await? {
        tracing::debug!(user_id = user.id, "Login rejected: wrong password");
        return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
    }

    let token = state.issue_tokens(&user).await?;
    tracing::info!(user_id = user.id, "User logged in");

    Ok(Json(ApiResponse::new(AuthResponse {
        user: user.into(),
        token,
    })))
}

/// POST /api/auth/refresh - Exchange a refresh token for a new token pair.
///
/// The presented refresh token is revoked.
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    tag = "auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Tokens refreshed", body = AuthResponse),
        (status = 401, description = "Invalid or expired refresh token")
    )
)]
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<ApiResponse<AuthResponse>>, ApiError> {
    let token_repo = RefreshTokenRepository::new(state.db.pool());

    let stored = token_repo
        .get_valid_token(&req.refresh_token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired refresh token"))?;

    // Lost a race with another refresh of the same token
    if !token_repo.revoke(&stored.token).await? {
        return Err(ApiError::unauthorized("Invalid or expired refresh token"));
    }

    let user = UserRepository::new(state.db.pool())
        .get_by_id(stored.user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User not found"))?;

    let token = state.issue_tokens(&user).await?;

    Ok(Json(ApiResponse::new(AuthResponse {
        user: user.into(),
        token,
    })))
}

/// POST /api/auth/logout - Revoke a refresh token.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    request_body = LogoutRequest,
    responses(
        (status = 200, description = "Logged out")
    )
)]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LogoutRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let revoked = RefreshTokenRepository::new(state.db.pool())
        .revoke(&req.refresh_token)
        .await?;
    if !revoked {
        tracing::debug!("Logout with unknown or already revoked refresh token");
    }

    Ok(Json(ApiResponse::with_message((), "Logged out")))
}

//! User handlers for Web API.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::db::{RefreshTokenRepository, UserRepository, UserUpdate};
use crate::web::dto::{ApiResponse, UpdateProfileRequest, UserResponse, ValidatedJson};
use crate::web::error::ApiError;
use crate::web::handlers::auth::hash_password_blocking;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;
use crate::VaultError;

/// GET /api/users/me - Get the current user.
#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "users",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn me(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let user = UserRepository::new(state.db.pool())
        .get_by_id(claims.sub)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(ApiResponse::new(user.into())))
}

/// PUT /api/users/me - Update the current user's profile.
#[utoipa::path(
    put,
    path = "/api/users/me",
    tag = "users",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Email or username already exists"),
        (status = 422, description = "Validation failed")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let repo = UserRepository::new(state.db.pool());

    let current = repo
        .get_by_id(claims.sub)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let mut update = UserUpdate::new();

    if let Some(email) = req.email {
        if !email.eq_ignore_ascii_case(&current.email) && repo.email_exists(&email).await? {
            return Err(VaultError::Conflict("email".to_string()).into());
        }
        update = update.email(email);
    }
    if let Some(username) = req.username {
        if !username.eq_ignore_ascii_case(&current.username)
            && repo.username_exists(&username).await?
        {
            return Err(VaultError::Conflict("username".to_string()).into());
        }
        update = update.username(username);
    }
    let password_changed = req.password.is_some();
    if let Some(password) = req.password {
        update = update.password(hash_password_blocking(password).await?);
    }

    let user = repo
        .update(claims.sub, &update)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    // A new password ends every existing session
    if password_changed {
        let revoked = RefreshTokenRepository::new(state.db.pool())
            .revoke_all_for_user(user.id)
            .await?;
        tracing::info!(user_id = user.id, revoked, "Password changed, refresh tokens revoked");
    }

    tracing::info!(user_id = user.id, "Profile updated");

    Ok(Json(ApiResponse::with_message(
        user.into(),
        "Profile updated successfully",
    )))
}

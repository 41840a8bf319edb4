//! Validation utilities for Web API DTOs.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::web::error::ApiError;

/// Minimum username length (in characters).
pub const MIN_USERNAME_LENGTH: usize = 3;

/// Maximum username length (in characters).
pub const MAX_USERNAME_LENGTH: usize = 32;

/// A JSON extractor that validates the request body.
///
/// This extractor deserializes the request body as JSON and then validates it
/// using the `validator` crate. If validation fails, it returns a detailed
/// error response with field-level error information.
///
/// # Example
///
/// ```ignore
/// use vasvault::web::dto::ValidatedJson;
///
/// async fn register(
///     ValidatedJson(payload): ValidatedJson<RegisterRequest>,
/// ) -> Result<Json<ApiResponse<AuthResponse>>, ApiError> {
///     // payload is already validated
///     // ...
/// }
/// ```
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid JSON: {}", e)))?;

        value.validate().map_err(ApiError::from)?;

        Ok(ValidatedJson(value))
    }
}

/// Validate a username: 3-32 characters of ASCII letters, digits or underscore.
pub fn validate_username(value: &str) -> Result<(), validator::ValidationError> {
    let len = value.chars().count();
    if !(MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).contains(&len) {
        return Err(validator::ValidationError::new("username_length")
            .with_message("Username must be between 3 and 32 characters".into()));
    }
    if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(validator::ValidationError::new("username_chars").with_message(
            "Username may only contain letters, digits and underscores".into(),
        ));
    }
    Ok(())
}

//! Request DTOs for Web API.

use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use super::validation::validate_username;

/// User registration request.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    /// Username (3-32 characters, letters, digits and underscore).
    #[validate(custom(function = "validate_username"))]
    pub username: String,
    /// Email address.
    #[validate(email(message = "Must be a valid email address"))]
    pub email: String,
    /// Password.
    #[validate(length(
        min = 8,
        max = 128,
        message = "Password must be between 8 and 128 characters"
    ))]
    pub password: String,
}

/// Login request.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    /// Email address.
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    /// Password.
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Token refresh request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    /// Refresh token.
    pub refresh_token: String,
}

/// Logout request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LogoutRequest {
    /// Refresh token to invalidate.
    pub refresh_token: String,
}

/// Profile update request. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileRequest {
    /// New username.
    #[validate(custom(function = "validate_username"))]
    pub username: Option<String>,
    /// New email address.
    #[validate(email(message = "Must be a valid email address"))]
    pub email: Option<String>,
    /// New password.
    #[validate(length(
        min = 8,
        max = 128,
        message = "Password must be between 8 and 128 characters"
    ))]
    pub password: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_valid() {
        let req = RegisterRequest {
            username: "alice_01".to_string(),
            email: "alice@example.com".to_string(),
            password: "password123".to_string(),
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_register_request_invalid_fields() {
        let req = RegisterRequest {
            username: "a!".to_string(),
            email: "not-an-email".to_string(),
            password: "short".to_string(),
        };
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn test_update_profile_request_partial() {
        let req = UpdateProfileRequest {
            email: Some("new@example.com".to_string()),
            ..Default::default()
        };
        assert!(req.validate().is_ok());

        let req = UpdateProfileRequest {
            username: Some("no spaces allowed".to_string()),
            ..Default::default()
        };
        assert!(req.validate().is_err());
    }
}

//! JSON error responses for the HTTP API.
//!
//! Every failure leaves the API as
//! `{"error": {"code": "...", "message": "...", "details": {...}?}}`.

use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::VaultError;

/// Field name to the messages explaining why it was rejected.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    ValidationError,
    InternalError,
}

impl ErrorCode {
    /// HTTP status sent with this code.
    pub fn status(self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// An error answered to an API client.
#[derive(Debug, Error, Serialize)]
#[error("{message}")]
pub struct ApiError {
    code: ErrorCode,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<FieldErrors>,
}

#[derive(Serialize)]
struct Envelope<'a> {
    error: &'a ApiError,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// A 500 whose message is safe to show; log the cause before calling.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// A 422 listing the rejected fields.
    pub fn invalid_fields(details: FieldErrors) -> Self {
        Self {
            code: ErrorCode::ValidationError,
            message: "Validation failed".to_string(),
            details: Some(details),
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(Envelope { error: &self })).into_response()
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let messages = errs
                    .iter()
                    .map(|e| match &e.message {
                        Some(m) => m.to_string(),
                        None => format!("Invalid value for {field}"),
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect();
        Self::invalid_fields(details)
    }
}

impl From<VaultError> for ApiError {
    fn from(err: VaultError) -> Self {
        let code = match &err {
            VaultError::Auth(_) => ErrorCode::Unauthorized,
            VaultError::Permission(_) => ErrorCode::Forbidden,
            VaultError::NotFound(_) => ErrorCode::NotFound,
            VaultError::Conflict(_) => ErrorCode::Conflict,
            VaultError::Validation(_) => ErrorCode::ValidationError,
            _ => {
                tracing::error!(error = %err, "Request failed with an internal error");
                return Self::internal("An internal error occurred");
            }
        };

        let message = match err {
            VaultError::Auth(msg) | VaultError::Permission(msg) | VaultError::Validation(msg) => {
                msg
            }
            // "file not found" -> "File not found"
            other => sentence_case(&other.to_string()),
        };
        Self::new(code, message)
    }
}

fn sentence_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Signup {
        #[validate(length(min = 3, message = "Too short"))]
        name: String,
        #[validate(email)]
        email: String,
    }

    fn body(err: &ApiError) -> serde_json::Value {
        serde_json::to_value(Envelope { error: err }).unwrap()
    }

    #[test]
    fn test_vault_errors_map_to_status_and_message() {
        let cases = [
            (VaultError::NotFound("file".into()), StatusCode::NOT_FOUND, "File not found"),
            (VaultError::Conflict("email".into()), StatusCode::CONFLICT, "Email already exists"),
            (VaultError::Auth("Invalid token".into()), StatusCode::UNAUTHORIZED, "Invalid token"),
            (VaultError::Permission("nope".into()), StatusCode::FORBIDDEN, "nope"),
            (VaultError::Validation("bad".into()), StatusCode::UNPROCESSABLE_ENTITY, "bad"),
        ];

        for (err, status, message) in cases {
            let api = ApiError::from(err);
            assert_eq!(api.code().status(), status);
            assert_eq!(api.message(), message);
        }
    }

    #[test]
    fn test_internal_errors_are_masked() {
        let api = ApiError::from(VaultError::Storage(
            "failed to save file: /srv/uploads/x".to_string(),
        ));
        assert_eq!(api.code(), ErrorCode::InternalError);
        assert_eq!(api.message(), "An internal error occurred");

        let api = ApiError::from(VaultError::Database("locked".to_string()));
        assert_eq!(api.code().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_body_shape_without_details() {
        let json = body(&ApiError::bad_request("No file provided"));
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
        assert_eq!(json["error"]["message"], "No file provided");
        assert!(json["error"].get("details").is_none());
    }

    #[test]
    fn test_validation_errors_list_fields() {
        let errors = Signup {
            name: "ab".to_string(),
            email: "nope".to_string(),
        }
        .validate()
        .unwrap_err();

        let api = ApiError::from(errors);
        assert_eq!(api.code().status(), StatusCode::UNPROCESSABLE_ENTITY);

        let json = body(&api);
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(json["error"]["details"]["name"][0], "Too short");
        assert_eq!(json["error"]["details"]["email"][0], "Invalid value for email");
    }
}

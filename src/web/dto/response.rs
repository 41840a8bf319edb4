//! Response DTOs for Web API.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::db::User;
use crate::file::FileRecord;

// ============================================================================
// Generic Response Wrappers
// ============================================================================

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Response data.
    pub data: T,
    /// Optional human-readable message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a new API response.
    pub fn new(data: T) -> Self {
        Self {
            data,
            message: None,
        }
    }

    /// Create a new API response with a message.
    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            message: Some(message.into()),
        }
    }
}

// ============================================================================
// Auth and User DTOs
// ============================================================================

/// User information in responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    /// User ID.
    pub id: i64,
    /// Username.
    pub username: String,
    /// Email address.
    pub email: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
        }
    }
}

/// Access and refresh token pair.
#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    /// Access token (JWT).
    pub access_token: String,
    /// Refresh token.
    pub refresh_token: String,
    /// Token type, always `Bearer`.
    pub token_type: String,
    /// Access token expiry in seconds.
    pub expires_in: u64,
}

/// Response for register, login and refresh.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    /// Authenticated user.
    pub user: UserResponse,
    /// Issued tokens.
    pub token: TokenResponse,
}

// ============================================================================
// File DTOs
// ============================================================================

/// External representation of a stored file.
#[derive(Debug, Serialize, ToSchema)]
pub struct FileResponse {
    /// File ID.
    pub id: i64,
    /// Owner user ID.
    pub user_id: i64,
    /// Folder ID, null when the file is not in a folder.
    pub folder_id: Option<i64>,
    /// Stored (generated) file name.
    pub file_name: String,
    /// Path of the stored file.
    pub file_path: String,
    /// MIME type supplied at upload.
    pub mime_type: String,
    /// Size in bytes.
    pub size: i64,
    /// Upload timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<FileRecord> for FileResponse {
    fn from(record: FileRecord) -> Self {
        Self {
            id: record.id,
            user_id: record.owner_id,
            folder_id: record.group_id,
            file_name: record.stored_name,
            file_path: record.stored_path,
            mime_type: record.content_type,
            size: record.size,
            created_at: record.uploaded_at,
        }
    }
}

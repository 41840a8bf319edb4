//! File handlers for Web API.
//!
//! Every route answers 404 for files owned by another user.

use axum::{
    body::Body,
    extract::{multipart::Field, Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
    Json,
};
use std::sync::Arc;

use crate::file::{FileRecord, UploadRequest};
use crate::web::dto::{ApiResponse, FileResponse};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;
use crate::VaultError;

const OCTET_STREAM: &str = "application/octet-stream";

/// Look up a file and make sure it belongs to `user_id`.
async fn owned_file(state: &AppState, file_id: i64, user_id: i64) -> Result<FileRecord, ApiError> {
    let record = state.files.get_file_by_id(file_id).await?;
    if record.owner_id != user_id {
        tracing::debug!(file_id, user_id, "Rejected access to another user's file");
        return Err(VaultError::NotFound("file".to_string()).into());
    }
    Ok(record)
}

/// A file part read from a multipart upload.
struct UploadedPart {
    filename: String,
    content_type: String,
    declared_size: Option<u64>,
    content: Vec<u8>,
}

/// Size the client announced in the part's own `Content-Length` header.
fn declared_part_size(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Read the `file` part chunk by chunk, refusing more than `max_size` bytes.
async fn read_file_field(mut field: Field<'_>, max_size: u64) -> Result<UploadedPart, ApiError> {
    let filename = field
        .file_name()
        .map(str::to_string)
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("File name is required"))?;

    let content_type = field
        .content_type()
        .map(str::to_string)
        .filter(|ct| !ct.is_empty() && ct != OCTET_STREAM)
        .unwrap_or_else(|| {
            mime_guess::from_path(&filename)
                .first_or_octet_stream()
                .to_string()
        });

    let declared_size = declared_part_size(field.headers());

    let mut content = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(|e| {
        tracing::warn!("Failed to read upload body: {}", e);
        ApiError::bad_request("Failed to read file")
    })? {
        if (content.len() + chunk.len()) as u64 > max_size {
            let max_mb = max_size / 1024 / 1024;
            return Err(ApiError::bad_request(format!(
                "File too large (max {}MB)",
                max_mb
            )));
        }
        content.extend_from_slice(&chunk);
    }

    Ok(UploadedPart {
        filename,
        content_type,
        declared_size,
        content,
    })
}

/// POST /api/files - Upload a file.
///
/// Request body: multipart/form-data with a "file" field and an optional
/// "folder_id" field.
#[utoipa::path(
    post,
    path = "/api/files",
    tag = "files",
    responses(
        (status = 201, description = "File uploaded", body = FileResponse),
        (status = 400, description = "Invalid input or file too large"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<FileResponse>>), ApiError> {
    let mut part: Option<UploadedPart> = None;
    let mut folder_id: Option<i64> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::warn!("Failed to read multipart field: {}", e);
        ApiError::bad_request("Invalid multipart data")
    })? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => part = Some(read_file_field(field, state.max_upload_size).await?),
            "folder_id" => {
                let text = field
                    .text()
                    .await
                    .map_err(|_| ApiError::bad_request("Invalid folder_id"))?;
                let text = text.trim();
                if !text.is_empty() {
                    folder_id = Some(
                        text.parse()
                            .map_err(|_| ApiError::bad_request("folder_id must be an integer"))?,
                    );
                }
            }
            _ => {}
        }
    }

    let part = part.ok_or_else(|| ApiError::bad_request("No file provided"))?;

    let mut request = UploadRequest::new(claims.sub, part.filename, part.content_type);
    if let Some(size) = part.declared_size {
        request = request.with_declared_size(size);
    }
    if let Some(folder_id) = folder_id {
        request = request.with_group(folder_id);
    }

    let record = state
        .files
        .upload_file(&request, &mut part.content.as_slice())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            record.into(),
            "File uploaded successfully",
        )),
    ))
}

/// GET /api/files - List the current user's files.
#[utoipa::path(
    get,
    path = "/api/files",
    tag = "files",
    responses(
        (status = 200, description = "Files owned by the current user", body = Vec<FileResponse>),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ApiResponse<Vec<FileResponse>>>, ApiError> {
    let files = state.files.list_user_files(claims.sub).await?;
    Ok(Json(ApiResponse::new(
        files.into_iter().map(FileResponse::from).collect(),
    )))
}

/// GET /api/files/:id - Get file metadata.
#[utoipa::path(
    get,
    path = "/api/files/{id}",
    tag = "files",
    params(
        ("id" = i64, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "File metadata", body = FileResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "File not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(file_id): Path<i64>,
) -> Result<Json<ApiResponse<FileResponse>>, ApiError> {
    let record = owned_file(&state, file_id, claims.sub).await?;
    Ok(Json(ApiResponse::new(record.into())))
}

/// GET /api/files/:id/download - Download a file.
#[utoipa::path(
    get,
    path = "/api/files/{id}/download",
    tag = "files",
    params(
        ("id" = i64, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "File content", content_type = "application/octet-stream"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "File not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(file_id): Path<i64>,
) -> Result<Response<Body>, ApiError> {
    owned_file(&state, file_id, claims.sub).await?;

    let download = state.files.read_file(file_id).await?;
    let record = download.record;

    let content_type = if record.content_type.is_empty() {
        OCTET_STREAM.to_string()
    } else {
        record.content_type.clone()
    };

    Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", record.stored_name),
        )
        .header(header::CONTENT_LENGTH, download.content.len())
        .body(Body::from(download.content))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Failed to build response")
        })
}

/// DELETE /api/files/:id - Delete a file.
#[utoipa::path(
    delete,
    path = "/api/files/{id}",
    tag = "files",
    params(
        ("id" = i64, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "File deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "File not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(file_id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    owned_file(&state, file_id, claims.sub).await?;
    state.files.delete_file(file_id).await?;

    Ok(Json(ApiResponse::with_message((), "File deleted successfully")))
}

//! Router configuration for Web API.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use super::dto::{
    AuthResponse, FileResponse, LoginRequest, LogoutRequest, RefreshRequest, RegisterRequest,
    TokenResponse, UpdateProfileRequest, UserResponse,
};
use super::handlers::{self, AppState};
use super::middleware::{create_cors_layer, jwt_auth, JwtState};

/// Slack on top of the upload limit for multipart framing.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// OpenAPI document for the HTTP API.
#[derive(OpenApi)]
#[openapi(
    info(title = "vasvault", description = "Multi-tenant file vault API"),
    paths(
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::refresh,
        handlers::auth::logout,
        handlers::user::me,
        handlers::user::update_profile,
        handlers::file::upload_file,
        handlers::file::list_files,
        handlers::file::get_file,
        handlers::file::download_file,
        handlers::file::delete_file,
    ),
    components(schemas(
        RegisterRequest,
        LoginRequest,
        RefreshRequest,
        LogoutRequest,
        UpdateProfileRequest,
        UserResponse,
        TokenResponse,
        AuthResponse,
        FileResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration and tokens"),
        (name = "users", description = "Current user profile"),
        (name = "files", description = "File upload and download")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the main API router.
pub fn create_router(
    app_state: Arc<AppState>,
    jwt_state: Arc<JwtState>,
    cors_origins: &[String],
) -> Router {
    let upload_limit = usize::try_from(app_state.max_upload_size)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    let auth_routes = Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
        .route("/logout", post(handlers::logout));

    let user_routes = Router::new().route(
        "/me",
        get(handlers::me).put(handlers::update_profile),
    );

    let file_routes = Router::new()
        .route(
            "/",
            get(handlers::list_files)
                .post(handlers::upload_file)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/:id",
            get(handlers::get_file).delete(handlers::delete_file),
        )
        .route("/:id/download", get(handlers::download_file));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/users", user_routes)
        .nest("/files", file_routes)
        .route("/openapi.json", get(openapi_json));

    let jwt_state_for_middleware = jwt_state.clone();

    Router::new()
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins))
                .layer(middleware::from_fn(move |req, next| {
                    let state = jwt_state_for_middleware.clone();
                    jwt_auth(state, req, next)
                })),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}

/// Serve the OpenAPI document.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_health_router() {
        let _router = create_health_router();
    }

    #[test]
    fn test_openapi_document_lists_routes() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();

        assert!(paths.iter().any(|p| p.as_str() == "/api/files"));
        assert!(paths.iter().any(|p| p.as_str() == "/api/files/{id}/download"));
        assert!(paths.iter().any(|p| p.as_str() == "/api/auth/register"));
        assert!(doc
            .components
            .as_ref()
            .unwrap()
            .security_schemes
            .contains_key("bearer_auth"));
    }
}

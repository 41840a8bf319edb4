//! Shared helpers for HTTP API integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum_test::TestServer;
use serde_json::{json, Value};
use tempfile::TempDir;

use vasvault::file::{FileRepository, FileService, FileStorage};
use vasvault::web::handlers::AppState;
use vasvault::web::middleware::JwtState;
use vasvault::web::router::{create_health_router, create_router};
use vasvault::Database;

/// JWT secret used by test servers.
pub const TEST_JWT_SECRET: &str = "test-secret-key-for-testing-only";

/// A running in-process API plus the resources behind it.
pub struct TestApp {
    pub server: TestServer,
    pub db: Arc<Database>,
    pub files: Arc<FileService>,
    pub storage_dir: PathBuf,
    _temp_dir: TempDir,
}

/// Create a test server with an in-memory database and a temporary upload directory.
pub async fn create_test_app() -> TestApp {
    create_test_app_with_limit(10).await
}

/// Same as [`create_test_app`] with a custom upload limit in megabytes.
pub async fn create_test_app_with_limit(max_upload_size_mb: u64) -> TestApp {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let storage_dir = temp_dir.path().join("uploads");

    let db = Arc::new(
        Database::open_in_memory()
            .await
            .expect("Failed to create test database"),
    );

    let store = Arc::new(FileRepository::new(db.pool().clone()));
    let files = Arc::new(FileService::new(store, FileStorage::new(&storage_dir)));

    let app_state = Arc::new(
        AppState::new(db.clone(), files.clone(), TEST_JWT_SECRET, 900, 7)
            .with_max_upload_size_mb(max_upload_size_mb),
    );
    let jwt_state = Arc::new(JwtState::new(TEST_JWT_SECRET));

    let router = create_router(app_state, jwt_state, &[]).merge(create_health_router());
    let server = TestServer::new(router).expect("Failed to create test server");

    TestApp {
        server,
        db,
        files,
        storage_dir,
        _temp_dir: temp_dir,
    }
}

/// Register a user and return the response body.
pub async fn register_user(server: &TestServer, username: &str, email: &str, password: &str) -> Value {
    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "username": username,
            "email": email,
            "password": password
        }))
        .await;

    response.json::<Value>()
}

/// Get the access token from an auth response.
pub fn access_token(response: &Value) -> String {
    response["data"]["token"]["access_token"]
        .as_str()
        .unwrap()
        .to_string()
}

/// Get the refresh token from an auth response.
pub fn refresh_token(response: &Value) -> String {
    response["data"]["token"]["refresh_token"]
        .as_str()
        .unwrap()
        .to_string()
}

/// Get the user ID from an auth response.
pub fn user_id(response: &Value) -> i64 {
    response["data"]["user"]["id"].as_i64().unwrap()
}

/// Names of the files currently in the upload directory.
pub fn stored_files(app: &TestApp) -> Vec<String> {
    if !app.storage_dir.exists() {
        return Vec::new();
    }
    let mut names: Vec<String> = std::fs::read_dir(&app.storage_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

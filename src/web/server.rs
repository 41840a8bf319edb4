//! Web server for vasvault.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::db::RefreshTokenRepository;
use crate::file::{FileRepository, FileService, FileStorage, RECONCILE_MIN_AGE_SECS};
use crate::{Database, Result, VaultError};

use super::handlers::AppState;
use super::middleware::JwtState;
use super::router::{create_health_router, create_router};

/// Token cleanup interval.
const CLEANUP_INTERVAL_SECS: u64 = 3600;

/// Web server for the API.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
    /// JWT state.
    jwt_state: Arc<JwtState>,
    /// CORS allowed origins.
    cors_origins: Vec<String>,
    /// Orphan reconciliation interval (zero disables it).
    reconcile_interval: Duration,
}

impl WebServer {
    /// Create a new web server from configuration and an opened database.
    pub fn new(config: &Config, db: Database) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .map_err(|e| VaultError::Config(format!("invalid server address: {e}")))?;

        let db = Arc::new(db);
        let store = Arc::new(FileRepository::new(db.pool().clone()));
        let storage = FileStorage::new(&config.files.storage_path);
        let files = Arc::new(FileService::new(store, storage));

        tracing::info!(
            storage_path = %files.storage().base_path().display(),
            max_upload_size_mb = config.files.max_upload_size_mb,
            "File storage configured"
        );

        let app_state = AppState::new(
            db,
            files,
            &config.auth.jwt_secret,
            config.auth.jwt_access_token_expiry_secs,
            config.auth.jwt_refresh_token_expiry_days,
        )
        .with_max_upload_size_mb(config.files.max_upload_size_mb);

        Ok(Self {
            addr,
            app_state: Arc::new(app_state),
            jwt_state: Arc::new(JwtState::new(&config.auth.jwt_secret)),
            cors_origins: config.server.cors_origins.clone(),
            reconcile_interval: Duration::from_secs(config.files.reconcile_interval_secs),
        })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Build the complete router.
    pub fn router(&self) -> Router {
        create_router(
            self.app_state.clone(),
            self.jwt_state.clone(),
            &self.cors_origins,
        )
        .merge(create_health_router())
    }

    /// Start the token cleanup background task.
    ///
    /// Removes expired and revoked refresh tokens once an hour.
    fn start_token_cleanup_task(db: Arc<Database>) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(CLEANUP_INTERVAL_SECS));

            // Skip the first immediate tick
            interval.tick().await;

            loop {
                interval.tick().await;

                let refresh_repo = RefreshTokenRepository::new(db.pool());
                match refresh_repo.cleanup_expired().await {
                    Ok(count) => {
                        if count > 0 {
                            tracing::info!(
                                deleted_count = count,
                                "Cleaned up expired/revoked refresh tokens"
                            );
                        } else {
                            tracing::debug!("No expired refresh tokens to clean up");
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to cleanup refresh tokens");
                    }
                }
            }
        });
    }

    /// Start the orphan reconciliation background task.
    fn start_reconcile_task(files: Arc<FileService>, every: Duration) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.tick().await;

            loop {
                interval.tick().await;

                match files
                    .reconcile(Duration::from_secs(RECONCILE_MIN_AGE_SECS))
                    .await
                {
                    Ok(report) if report.is_clean() => {
                        tracing::debug!("Storage reconciliation found nothing to fix");
                    }
                    Ok(report) => {
                        tracing::warn!(
                            removed = report.removed_files.len(),
                            missing = report.missing_files.len(),
                            "Storage reconciliation finished"
                        );
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Storage reconciliation failed");
                    }
                }
            }
        });
    }

    async fn bind(self) -> std::io::Result<(TcpListener, Router)> {
        let router = self.router();
        let listener = TcpListener::bind(self.addr).await?;

        // Background tasks start only after a successful bind
        Self::start_token_cleanup_task(self.app_state.db.clone());
        tracing::info!("Token cleanup task started (runs every hour)");

        if !self.reconcile_interval.is_zero() {
            Self::start_reconcile_task(self.app_state.files.clone(), self.reconcile_interval);
            tracing::info!(
                interval_secs = self.reconcile_interval.as_secs(),
                "Storage reconciliation task started"
            );
        }

        Ok((listener, router))
    }

    /// Run the web server.
    pub async fn run(self) -> std::io::Result<()> {
        let (listener, router) = self.bind().await?;
        tracing::info!("Web server listening on http://{}", listener.local_addr()?);
        axum::serve(listener, router).await
    }

    /// Run the server in the background and return the bound address.
    ///
    /// Useful for tests binding to port 0.
    pub async fn run_with_addr(self) -> std::io::Result<SocketAddr> {
        let (listener, router) = self.bind().await?;
        let local_addr = listener.local_addr()?;
        tracing::info!("Web server listening on http://{}", local_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_test::TestServer;
    use tempfile::TempDir;

    fn create_test_config(temp_dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 0;
        config.auth.jwt_secret = "test-secret-key".to_string();
        config.files.storage_path = temp_dir.path().join("uploads").display().to_string();
        config
    }

    #[tokio::test]
    async fn test_web_server_new() {
        let temp_dir = TempDir::new().unwrap();
        let config = create_test_config(&temp_dir);
        let db = Database::open_in_memory().await.unwrap();

        let server = WebServer::new(&config, db).unwrap();
        assert_eq!(server.addr().ip().to_string(), "127.0.0.1");
        assert_eq!(server.app_state.max_upload_size, 10 * 1024 * 1024);
    }

    #[tokio::test]
    async fn test_web_server_invalid_address() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = create_test_config(&temp_dir);
        config.server.host = "not an address".to_string();
        let db = Database::open_in_memory().await.unwrap();

        assert!(matches!(
            WebServer::new(&config, db),
            Err(VaultError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let temp_dir = TempDir::new().unwrap();
        let config = create_test_config(&temp_dir);
        let db = Database::open_in_memory().await.unwrap();

        let server = WebServer::new(&config, db).unwrap();
        let test_server = TestServer::new(server.router()).unwrap();

        let response = test_server.get("/health").await;
        response.assert_status_ok();
        response.assert_text("OK");
    }

    #[tokio::test]
    async fn test_run_with_addr_binds() {
        let temp_dir = TempDir::new().unwrap();
        let config = create_test_config(&temp_dir);
        let db = Database::open_in_memory().await.unwrap();

        let server = WebServer::new(&config, db).unwrap();
        let addr = server.run_with_addr().await.unwrap();
        assert_ne!(addr.port(), 0);
    }
}

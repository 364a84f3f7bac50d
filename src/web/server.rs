//! HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;

use crate::auth::AuthService;
use crate::config::Config;
use crate::db::{ConfirmationTokenRepository, Database, SessionRepository};
use crate::error::{DenticaError, Result};

use super::handlers::AppState;
use super::middleware::{JwtState, RateLimitState};
use super::router::{create_health_router, create_router};

/// Build the full application router for the given service.
///
/// Shared by the server and the integration tests, which drive the
/// router directly without binding a socket.
pub fn build_router(service: AuthService, config: &Config) -> Router {
    let app_state = Arc::new(AppState::new(
        service,
        config.auth.jwt_refresh_token_expiry_days,
    ));
    let jwt_state = Arc::new(JwtState::new(&config.auth.jwt_secret));
    let rate_limits = Arc::new(RateLimitState::new(
        config.auth.login_rate_limit,
        config.auth.api_rate_limit,
    ));

    create_router(app_state, jwt_state, rate_limits, &config.server.cors_origins)
        .merge(create_health_router())
}

/// Web server for the API.
pub struct WebServer {
    addr: SocketAddr,
    router: Router,
    db: Database,
}

impl WebServer {
    /// Create a new web server.
    pub fn new(config: &Config, service: AuthService) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .map_err(|e| DenticaError::Config(format!("Invalid server address: {}", e)))?;
        let db = service.database().clone();
        let router = build_router(service, config);
        Ok(Self { addr, router, db })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Start the hourly token cleanup background task. Removes expired
    /// sessions and confirmation tokens.
    fn start_cleanup_task(db: Database) {
        tokio::spawn(async move {
            const CLEANUP_INTERVAL_SECS: u64 = 3600;

            let mut interval = tokio::time::interval(Duration::from_secs(CLEANUP_INTERVAL_SECS));
            // Skip the first immediate tick
            interval.tick().await;

            loop {
                interval.tick().await;

                let sessions = SessionRepository::new(db.pool());
                match sessions.cleanup_expired().await {
                    Ok(count) if count > 0 => {
                        tracing::info!(deleted_count = count, "Cleaned up expired sessions");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to clean up sessions");
                    }
                }

                let confirmations = ConfirmationTokenRepository::new(db.pool());
                match confirmations.cleanup_expired().await {
                    Ok(count) if count > 0 => {
                        tracing::info!(
                            deleted_count = count,
                            "Cleaned up expired confirmation tokens"
                        );
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to clean up confirmation tokens");
                    }
                }
            }
        });
    }

    /// Run the web server until ctrl-c.
    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        Self::start_cleanup_task(self.db);
        tracing::info!("Token cleanup task started (runs every hour)");
        tracing::info!("Server listening on http://{}", local_addr);

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

/// Resolve when the process receives ctrl-c.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::LogMailer;

    async fn test_service() -> (AuthService, Config) {
        let db = Database::open_in_memory().await.unwrap();
        db.migrate().await.unwrap();
        let mut config = Config::default();
        config.auth.jwt_secret = "test-secret".to_string();
        config.server.port = 0;
        let service = AuthService::new(db, &config, Arc::new(LogMailer));
        (service, config)
    }

    #[tokio::test]
    async fn test_web_server_new() {
        let (service, config) = test_service().await;
        let server = WebServer::new(&config, service).unwrap();
        assert_eq!(server.addr().ip().to_string(), "0.0.0.0");
    }

    #[tokio::test]
    async fn test_build_router() {
        let (service, config) = test_service().await;
        let _router = build_router(service, &config);
    }
}

//! Router configuration for the API.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{
    change_password, confirm, login, logout, logout_all, me, recover, refresh, register, AppState,
};
use super::middleware::{
    api_rate_limit, create_cors_layer, jwt_auth, login_rate_limit, JwtState, RateLimitState,
};

/// Create the main API router.
pub fn create_router(
    app_state: Arc<AppState>,
    jwt_state: Arc<JwtState>,
    rate_limits: Arc<RateLimitState>,
    cors_origins: &[String],
) -> Router {
    // Credential endpoints carry the strict quota
    let limits_for_login = rate_limits.clone();
    let credential_routes = Router::new()
        .route("/login", post(login))
        .route("/recuperar", post(recover))
        .layer(middleware::from_fn(move |req, next| {
            let state = limits_for_login.clone();
            login_rate_limit(state, req, next)
        }));

    let limits_for_api = rate_limits.clone();
    let general_routes = Router::new()
        .route("/register", post(register))
        .route("/confirm", get(confirm))
        .route("/cambiar-password", post(change_password))
        .route("/refresh-token", post(refresh))
        .route("/logout", post(logout))
        .route("/logout-all", post(logout_all))
        .route("/me", get(me))
        .layer(middleware::from_fn(move |req, next| {
            let state = limits_for_api.clone();
            api_rate_limit(state, req, next)
        }));

    let auth_routes = Router::new()
        .merge(credential_routes)
        .merge(general_routes);

    let jwt_state_for_middleware = jwt_state.clone();

    Router::new()
        .nest("/api/auth", auth_routes)
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_health_router() {
        let _router = create_health_router();
    }
}

//! Middleware for the API.

pub mod auth;
pub mod cors;
pub mod rate_limit;

pub use auth::{jwt_auth, AuthUser, JwtState};
pub use cors::create_cors_layer;
pub use rate_limit::{api_rate_limit, get_client_ip, login_rate_limit, RateLimitState};

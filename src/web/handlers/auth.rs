//! Authentication handlers.

use axum::{
    extract::{Query, State},
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse},
    Json,
};
use std::sync::Arc;

use crate::auth::{AuthService, RegisterInput};
use crate::db::Role;
use crate::web::dto::{
    ApiResponse, ChangePasswordRequest, ConfirmQuery, LoginRequest, LoginResponse, LogoutRequest,
    MeResponse, MessageResponse, RecoverRequest, RefreshRequest, RefreshResponse, RegisterRequest,
    UserInfo,
};
use crate::web::error::ApiError;
use crate::web::middleware::AuthUser;

/// Name of the refresh token cookie.
pub const REFRESH_COOKIE: &str = "refresh_token";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Authentication service.
    pub auth: AuthService,
    /// Refresh cookie lifetime in seconds.
    pub refresh_cookie_max_age: i64,
}

impl AppState {
    /// Create a new application state.
    pub fn new(auth: AuthService, refresh_expiry_days: u64) -> Self {
        Self {
            auth,
            refresh_cookie_max_age: refresh_expiry_days as i64 * 24 * 3600,
        }
    }
}

/// Build the Set-Cookie value carrying the refresh token.
fn refresh_cookie(token: &str, max_age_secs: i64) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/api/auth; Max-Age={}",
        REFRESH_COOKIE, token, max_age_secs
    )
}

/// Build the Set-Cookie value that clears the refresh token.
fn clear_refresh_cookie() -> String {
    format!(
        "{}=; HttpOnly; SameSite=Strict; Path=/api/auth; Max-Age=0",
        REFRESH_COOKIE
    )
}

/// Read a cookie value from the request headers.
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookies = headers.get("cookie")?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        if key == name {
            Some(value.to_string())
        } else {
            None
        }
    })
}

/// Client IP from proxy headers, for audit entries.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(ip) = forwarded.split(',').next() {
            return Some(ip.trim().to_string());
        }
    }
    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Client user agent, for audit entries.
fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// POST /api/auth/register - Create a pending account.
pub async fn register(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let ip = client_ip(&headers);
    let input = RegisterInput {
        first_name: req.first_name,
        last_name: req.last_name,
        email: req.email,
        password: req.password,
        document_type: req.document_type,
        document_number: req.document_number,
        phone: req.phone,
        address: req.address,
        birthdate: req.birthdate,
    };
    let user = state.auth.register(input, ip.as_deref()).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(UserInfo::from(&user))),
    ))
}

/// GET /api/auth/confirm?token= - Activate a pending account.
pub async fn confirm(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ConfirmQuery>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let token = query
        .token
        .ok_or_else(|| ApiError::bad_request("Confirmation token is required"))?;
    let ip = client_ip(&headers);
    state.auth.confirm(&token, ip.as_deref()).await?;
    Ok(Json(ApiResponse::new(MessageResponse::new(
        "Account confirmed, you can now sign in",
    ))))
}

/// POST /api/auth/login - Authenticate and issue a token pair.
pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let role = match req.role.as_deref() {
        Some(r) => Some(r.parse::<Role>().map_err(ApiError::bad_request)?),
        None => None,
    };
    let ip = client_ip(&headers);
    let agent = user_agent(&headers);

    let outcome = state
        .auth
        .login(&req.email, &req.password, role, ip.as_deref(), agent.as_deref())
        .await?;

    let cookie = refresh_cookie(&outcome.refresh_token, state.refresh_cookie_max_age);
    let response = LoginResponse {
        access_token: outcome.access_token,
        refresh_token: outcome.refresh_token,
        expires_in: outcome.expires_in,
        token_login: outcome.token_login,
        user: UserInfo::from(&outcome.user),
    };
    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(ApiResponse::new(response)),
    ))
}

/// POST /api/auth/recuperar - Issue and mail a recovery code.
pub async fn recover(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<RecoverRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let ip = client_ip(&headers);
    state
        .auth
        .recover(&req.email, &req.document_number, ip.as_deref())
        .await?;
    Ok(Json(ApiResponse::new(MessageResponse::new(
        "A recovery code has been sent to your email",
    ))))
}

/// POST /api/auth/cambiar-password - Change the password of the
/// authenticated user. The user is taken from the access token.
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    headers: HeaderMap,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let ip = client_ip(&headers);
    state
        .auth
        .change_password(
            claims.sub,
            &req.current_password,
            &req.new_password,
            ip.as_deref(),
        )
        .await?;
    Ok(Json(ApiResponse::new(MessageResponse::new(
        "Password updated",
    ))))
}

/// POST /api/auth/refresh-token - Mint a new access token.
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Option<Json<RefreshRequest>>,
) -> Result<Json<ApiResponse<RefreshResponse>>, ApiError> {
    let token = body
        .and_then(|Json(req)| req.refresh_token)
        .or_else(|| cookie_value(&headers, REFRESH_COOKIE))
        .ok_or_else(|| ApiError::token_invalid("Refresh token is required"))?;
    let ip = client_ip(&headers);

    let outcome = state.auth.refresh(&token, ip.as_deref()).await?;
    Ok(Json(ApiResponse::new(RefreshResponse {
        access_token: outcome.access_token,
        expires_in: outcome.expires_in,
    })))
}

/// POST /api/auth/logout - Revoke the presented refresh token.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Option<Json<LogoutRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let token = body
        .and_then(|Json(req)| req.refresh_token)
        .or_else(|| cookie_value(&headers, REFRESH_COOKIE));
    let ip = client_ip(&headers);

    if let Some(token) = token {
        state.auth.logout(&token, ip.as_deref()).await?;
    }
    Ok((
        AppendHeaders([(SET_COOKIE, clear_refresh_cookie())]),
        Json(ApiResponse::new(MessageResponse::new("Signed out"))),
    ))
}

/// POST /api/auth/logout-all - Revoke all sessions for the
/// authenticated user and invalidate previously issued tokens.
pub async fn logout_all(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let ip = client_ip(&headers);
    state.auth.logout_all(claims.sub, ip.as_deref()).await?;
    Ok((
        AppendHeaders([(SET_COOKIE, clear_refresh_cookie())]),
        Json(ApiResponse::new(MessageResponse::new(
            "All sessions revoked",
        ))),
    ))
}

/// GET /api/auth/me - Current user info.
pub async fn me(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ApiResponse<MeResponse>>, ApiError> {
    let user = state.auth.get_user(claims.sub).await?;
    Ok(Json(ApiResponse::new(MeResponse {
        user: UserInfo::from(&user),
        created_at: user.created_at.clone(),
        last_login: user.last_login.clone(),
    })))
}

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tower_cookies::cookie::time::Duration;
use tower_cookies::{Cookie, Cookies};

use crate::{
    config::Config,
    error::{AppError, Result, SessionRejection},
    models::session::IssuedTokens,
    models::user::UserResponse,
    state::AppState,
};

/// Name of the cookie carrying the refresh session id.
pub const REFRESH_COOKIE: &str = "refresh_session_id";

/// The request payload for user registration.
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// The request payload for user login.
#[derive(Deserialize)]
pub struct LoginRequest {
    /// Username or email, depending on configuration.
    #[serde(alias = "email", alias = "username")]
    pub identifier: String,
    pub password: String,
    pub fingerprint: String,
}

/// The request payload for refreshing an access token.
#[derive(Deserialize)]
pub struct RefreshRequest {
    pub fingerprint: String,
}

/// The response payload carrying a fresh access token.
#[derive(Serialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

/// The response payload for requests with nothing else to return.
#[derive(Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
}

/// Creates the HttpOnly refresh session cookie.
fn refresh_cookie(config: &Config, value: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(REFRESH_COOKIE, value);
    cookie.set_http_only(true);
    cookie.set_secure(config.cookie_secure);
    cookie.set_same_site(tower_cookies::cookie::SameSite::Lax);
    cookie.set_max_age(Duration::seconds(config.refresh_cookie_max_age_secs()));
    cookie.set_path(config.cookie_path.clone());
    cookie
}

/// Tells the client to drop its refresh session cookie.
fn clear_refresh_cookie(config: &Config, cookies: &Cookies) {
    let mut expired = Cookie::new(REFRESH_COOKIE, "");
    expired.set_path(config.cookie_path.clone());
    cookies.remove(expired);
}

/// Sets the rotated cookie and builds the token body.
fn issue_response(state: &AppState, cookies: &Cookies, tokens: IssuedTokens) -> Response {
    cookies.add(refresh_cookie(
        &state.config,
        tokens.refresh_session_id.to_string(),
    ));

    let body = AccessTokenResponse {
        access_token: tokens.access_token,
        token_type: "Bearer",
    };
    (StatusCode::OK, Json(body)).into_response()
}

/// Handles user registration.
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Response> {
    tracing::info!("📝 Register attempt: {}", payload.username);

    let user = state
        .auth
        .register(&payload.username, &payload.email, &payload.password)
        .await?;

    Ok((StatusCode::CREATED, Json(user)).into_response())
}

/// Handles user login.
pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(payload): Json<LoginRequest>,
) -> Result<Response> {
    tracing::info!("🔐 Login attempt");

    let tokens = state
        .auth
        .login(&payload.identifier, &payload.password, &payload.fingerprint)
        .await?;

    Ok(issue_response(&state, &cookies, tokens))
}

/// Handles access token refresh, rotating the refresh session cookie.
pub async fn refresh(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(payload): Json<RefreshRequest>,
) -> Result<Response> {
    let session_id = cookies
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(|| {
            tracing::warn!("❌ No refresh_session_id cookie found");
            AppError::SessionInvalid(SessionRejection::NotFound)
        })?;

    match state.auth.refresh(&session_id, &payload.fingerprint).await {
        Ok(tokens) => Ok(issue_response(&state, &cookies, tokens)),
        Err(e @ AppError::SessionInvalid(_)) => {
            // The presented id is consumed either way.
            clear_refresh_cookie(&state.config, &cookies);
            Err(e)
        }
        Err(e) => Err(e),
    }
}

/// Handles logout by ending the refresh session lineage.
pub async fn logout(State(state): State<AppState>, cookies: Cookies) -> Result<Response> {
    if let Some(cookie) = cookies.get(REFRESH_COOKIE) {
        state.auth.logout(cookie.value()).await?;
    }

    clear_refresh_cookie(&state.config, &cookies);

    let response = AuthResponse {
        success: true,
        message: "Logout successful".to_string(),
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Returns the user behind the bearer token.
pub async fn me(Extension(user): Extension<UserResponse>) -> Json<UserResponse> {
    Json(user)
}

use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::Response,
};

use crate::{error::AppError, state::AppState};

/// Extracts the bearer token from the `Authorization` header.
///
/// # Arguments
///
/// * `request` - The incoming request.
///
/// # Returns
///
/// An `Option` containing the raw token if present.
fn extract_bearer_token(request: &Request<Body>) -> Option<&str> {
    let value = request.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return None;
    }
    Some(token.trim())
}

/// A middleware that requires a valid, unexpired access token.
///
/// On success the authenticated `UserResponse` is placed in the request
/// extensions.
pub async fn require_access_token(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    tracing::debug!("🔐 Checking access token...");

    let token = extract_bearer_token(&request)
        .ok_or_else(|| {
            tracing::warn!("❌ No bearer token found");
            AppError::InvalidAccessToken
        })?
        .to_string();

    let user = state.auth.current_user(&token).await?;
    tracing::debug!("✅ User authenticated: {}", user.id);

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

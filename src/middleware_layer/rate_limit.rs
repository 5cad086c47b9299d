use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;

use crate::{error::AppError, repositories::AttemptCounter, state::AppState};

/// Registrations allowed per client IP per window.
pub const REGISTER_LIMIT: i64 = 5;
/// Failed logins allowed per client IP per window.
pub const LOGIN_FAILURE_LIMIT: i64 = 5;
/// Window length in seconds.
pub const WINDOW_SECS: i64 = 43200;

/// Extracts the real IP address from the request extensions.
///
/// # Arguments
///
/// * `req` - The incoming request.
///
/// # Returns
///
/// The IP address as a string, or "unknown" if not found.
fn extract_real_ip(req: &Request<Body>) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Builds the 429 response when `key` has used up `limit`.
///
/// Counter failures let the request through.
async fn over_limit(
    counter: &dyn AttemptCounter,
    key: &str,
    limit: i64,
    message: &str,
) -> Option<Response> {
    let attempts = match counter.count(key).await {
        Ok(attempts) => attempts,
        Err(e) => {
            tracing::warn!("⚠️ Rate limit lookup failed for {}: {}", key, e);
            return None;
        }
    };

    if attempts < limit {
        return None;
    }

    let minutes = (counter.seconds_left(key).await.unwrap_or(0) + 59) / 60;
    Some(
        AppError::RateLimitExceeded(format!("{}. Try again in {} minutes", message, minutes))
            .into_response(),
    )
}

async fn record(counter: &dyn AttemptCounter, key: &str) {
    if let Err(e) = counter
        .record(key, chrono::Duration::seconds(WINDOW_SECS))
        .await
    {
        tracing::warn!("⚠️ Could not record attempt for {}: {}", key, e);
    }
}

/// A middleware that rate limits user registration per client IP.
pub async fn rate_limit_register(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let Some(counter) = state.attempts.clone() else {
        return next.run(req).await;
    };

    let key = format!("rate_limit:register:{}", extract_real_ip(&req));

    if let Some(rejection) =
        over_limit(counter.as_ref(), &key, REGISTER_LIMIT, "Registration limit exceeded").await
    {
        return rejection;
    }

    record(counter.as_ref(), &key).await;
    next.run(req).await
}

/// A middleware that rate limits failed logins per client IP.
///
/// Only rejected credentials count toward the limit; a successful login
/// from the same address clears it.
pub async fn rate_limit_login(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let Some(counter) = state.attempts.clone() else {
        return next.run(req).await;
    };

    let key = format!("rate_limit:login:{}", extract_real_ip(&req));

    if let Some(rejection) = over_limit(
        counter.as_ref(),
        &key,
        LOGIN_FAILURE_LIMIT,
        "Too many failed login attempts",
    )
    .await
    {
        return rejection;
    }

    let response = next.run(req).await;

    if response.status() == StatusCode::UNAUTHORIZED {
        record(counter.as_ref(), &key).await;
    } else if response.status().is_success() {
        if let Err(e) = counter.clear(&key).await {
            tracing::warn!("⚠️ Could not clear login attempts for {}: {}", key, e);
        }
    }

    response
}

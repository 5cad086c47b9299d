use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Why a set of login credentials was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// No user matches the identifier.
    NotFound,
    /// The password does not match the stored hash.
    BadPassword,
    /// The credentials were correct but the account is disabled.
    Inactive,
}

/// Why a refresh session could not be rotated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRejection {
    /// The session id is unknown, already consumed, or malformed.
    NotFound,
    /// The session outlived its `expires_at`.
    Expired,
    /// The presented fingerprint differs from the one bound at issue time.
    FingerprintMismatch,
}

/// The application's error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// A database error.
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    /// A connection pool error.
    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    /// A pool construction error.
    #[error("Pool creation error: {0}")]
    CreatePool(#[from] deadpool_postgres::CreatePoolError),

    /// A Redis error.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// An I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A (de)serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Malformed input, e.g. a password that breaks the policy.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The username or email is already registered.
    #[error("User already exists")]
    UserExists,

    /// Login credentials were rejected.
    #[error("Authentication rejected: {0:?}")]
    AuthenticationRejected(AuthRejection),

    /// A refresh session could not be rotated.
    #[error("Refresh session invalid: {0:?}")]
    SessionInvalid(SessionRejection),

    /// A bearer access token is missing, mis-signed or stale.
    #[error("Invalid access token")]
    InvalidAccessToken,

    /// Signing keys are missing or corrupt.
    #[error("Signing error: {0}")]
    Signing(String),

    /// An internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),

    /// A rate limit exceeded error.
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// The status code and client-facing message for this error.
    ///
    /// Credential and session failures collapse to a single message each so
    /// callers cannot tell which check failed.
    pub fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::UserExists => (StatusCode::CONFLICT, "User already exists".to_string()),
            AppError::AuthenticationRejected(AuthRejection::Inactive) => {
                (StatusCode::FORBIDDEN, "Inactive user".to_string())
            }
            AppError::AuthenticationRejected(_) | AppError::InvalidAccessToken => (
                StatusCode::UNAUTHORIZED,
                "Could not validate credentials".to_string(),
            ),
            AppError::SessionInvalid(_) => (
                StatusCode::UNAUTHORIZED,
                "Invalid refresh session".to_string(),
            ),
            AppError::RateLimitExceeded(msg) => (StatusCode::TOO_MANY_REQUESTS, msg.clone()),
            AppError::Database(_)
            | AppError::Pool(_)
            | AppError::CreatePool(_)
            | AppError::Redis(_)
            | AppError::Io(_)
            | AppError::Serialization(_)
            | AppError::Signing(_)
            | AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Validation(msg) => tracing::debug!("Validation error: {}", msg),
            AppError::UserExists => tracing::debug!("Registration conflict"),
            AppError::AuthenticationRejected(reason) => {
                tracing::warn!("Authentication rejected: {:?}", reason)
            }
            AppError::SessionInvalid(reason) => {
                tracing::warn!("Refresh session rejected: {:?}", reason)
            }
            AppError::InvalidAccessToken => tracing::warn!("Invalid access token"),
            AppError::RateLimitExceeded(msg) => tracing::warn!("Rate limit exceeded: {}", msg),
            other => tracing::error!("{}", other),
        }

        let (status, message) = self.status_and_message();

        let body = sonic_rs::to_string(&sonic_rs::json!({
            "error": message
        }))
        .unwrap_or_else(|_| r#"{"error":"Internal server error"}"#.to_string());

        (
            status,
            [(http::header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response()
    }
}

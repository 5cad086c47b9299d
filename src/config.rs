use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use jsonwebtoken::Algorithm;

/// Which unique user attribute a login identifier is matched against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoginIdentifier {
    Username,
    Email,
}

impl FromStr for LoginIdentifier {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "username" => Ok(Self::Username),
            "email" => Ok(Self::Email),
            other => anyhow::bail!("LOGIN_IDENTIFIER must be 'username' or 'email', got '{}'", other),
        }
    }
}

/// Lifetimes handed to the session rotator.
#[derive(Clone, Copy, Debug)]
pub struct TokenSettings {
    /// How long a minted access token stays fresh.
    pub access_ttl: chrono::Duration,
    /// How long a refresh session may wait before it is rotated.
    pub refresh_ttl: chrono::Duration,
}

/// The application's configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// The address the HTTP server binds to.
    pub bind_addr: SocketAddr,
    /// The URL of the PostgreSQL database.
    pub database_url: String,
    /// The URL of the Redis server.
    pub redis_url: String,
    /// PEM file holding the RSA private key used to sign access tokens.
    pub private_key_path: PathBuf,
    /// PEM file holding the RSA public key used to verify access tokens.
    pub public_key_path: PathBuf,
    /// The JWT signing algorithm.
    pub token_algorithm: Algorithm,
    /// Access token lifetime in minutes.
    pub access_token_ttl_minutes: i64,
    /// Refresh session lifetime in days.
    pub refresh_session_ttl_days: i64,
    /// Path attribute of the refresh session cookie.
    pub cookie_path: String,
    /// Whether the refresh session cookie is marked `Secure`.
    pub cookie_secure: bool,
    /// Attribute used to look users up at login.
    pub login_identifier: LoginIdentifier,
}

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        let token_algorithm = parse_algorithm(
            &env::var("JWT_ALGORITHM").unwrap_or_else(|_| "RS256".to_string()),
        )?;

        let access_token_ttl_minutes: i64 = env::var("ACCESS_TOKEN_EXPIRE_MINUTES")
            .unwrap_or_else(|_| "7".to_string())
            .parse()
            .context("Invalid ACCESS_TOKEN_EXPIRE_MINUTES")?;
        if access_token_ttl_minutes <= 0 {
            anyhow::bail!("ACCESS_TOKEN_EXPIRE_MINUTES must be positive");
        }

        let refresh_session_ttl_days: i64 = env::var("REFRESH_SESSION_EXPIRE_DAYS")
            .unwrap_or_else(|_| "7".to_string())
            .parse()
            .context("Invalid REFRESH_SESSION_EXPIRE_DAYS")?;
        if refresh_session_ttl_days <= 0 {
            anyhow::bail!("REFRESH_SESSION_EXPIRE_DAYS must be positive");
        }

        Ok(Self {
            bind_addr: env::var("BIND_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:8000".to_string())
                .parse()
                .context("Invalid BIND_ADDR")?,
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            private_key_path: env::var("JWT_PRIVATE_KEY_PATH")
                .unwrap_or_else(|_| "certs/private.pem".to_string())
                .into(),
            public_key_path: env::var("JWT_PUBLIC_KEY_PATH")
                .unwrap_or_else(|_| "certs/public.pem".to_string())
                .into(),
            token_algorithm,
            access_token_ttl_minutes,
            refresh_session_ttl_days,
            cookie_path: env::var("COOKIE_PATH")
                .unwrap_or_else(|_| "/api/auth".to_string()),
            cookie_secure: env::var("COOKIE_SECURE")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .context("COOKIE_SECURE must be 'true' or 'false'")?,
            login_identifier: env::var("LOGIN_IDENTIFIER")
                .unwrap_or_else(|_| "email".to_string())
                .parse()?,
        })
    }

    /// Returns the token lifetimes as durations.
    pub fn token_settings(&self) -> TokenSettings {
        TokenSettings {
            access_ttl: chrono::Duration::minutes(self.access_token_ttl_minutes),
            refresh_ttl: chrono::Duration::days(self.refresh_session_ttl_days),
        }
    }

    /// Refresh cookie max-age in seconds.
    pub fn refresh_cookie_max_age_secs(&self) -> i64 {
        self.refresh_session_ttl_days * 86400
    }
}

/// Parses a JWT algorithm name, accepting only the RSA families.
pub fn parse_algorithm(name: &str) -> Result<Algorithm> {
    let algorithm = Algorithm::from_str(name.trim())
        .map_err(|e| anyhow::anyhow!("Unknown JWT_ALGORITHM '{}': {}", name, e))?;

    match algorithm {
        Algorithm::RS256
        | Algorithm::RS384
        | Algorithm::RS512
        | Algorithm::PS256
        | Algorithm::PS384
        | Algorithm::PS512 => Ok(algorithm),
        other => anyhow::bail!("JWT_ALGORITHM must be an RSA algorithm, got {:?}", other),
    }
}

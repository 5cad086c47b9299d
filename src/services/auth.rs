use std::sync::Arc;

use uuid::Uuid;

use crate::{
    crypto::password::hash_password,
    error::{AppError, Result, SessionRejection},
    models::session::IssuedTokens,
    models::user::{NewUser, UserResponse},
    repositories::{RefreshSessionStore, UserStore},
    services::{credentials::CredentialValidator, rotator::SessionRotator},
    validation::auth::{validate_email, validate_password, validate_username},
};

/// Everything the HTTP layer and the CLI call into.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn RefreshSessionStore>,
    validator: CredentialValidator,
    rotator: SessionRotator,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn RefreshSessionStore>,
        validator: CredentialValidator,
        rotator: SessionRotator,
    ) -> Self {
        Self {
            users,
            sessions,
            validator,
            rotator,
        }
    }

    /// Creates a new user.
    ///
    /// # Arguments
    ///
    /// * `username` - The user's username.
    /// * `email` - The user's email address.
    /// * `password` - The user's password.
    ///
    /// # Returns
    ///
    /// The stored user without its password hash.
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<UserResponse> {
        tracing::debug!("🔐 Creating user: {}", username);
        validate_username(username)?;
        validate_email(email)?;
        validate_password(password)?;

        let user = self
            .users
            .insert(NewUser {
                username: username.to_string(),
                email: email.to_string(),
                hashed_password: hash_password(password)?,
            })
            .await?;

        tracing::info!("✅ User registered: {}", user.id);
        Ok(user.into())
    }

    /// Validates credentials and opens a new refresh session lineage.
    pub async fn login(&self, identifier: &str, password: &str, fingerprint: &str) -> Result<IssuedTokens> {
        if fingerprint.trim().is_empty() {
            return Err(AppError::Validation("Fingerprint is required".to_string()));
        }

        let user = self.validator.validate(identifier, password).await?;
        let tokens = self.rotator.issue(user.id, fingerprint).await?;

        tracing::info!("✅ User logged in: {}", user.id);
        Ok(tokens)
    }

    /// Rotates the refresh session named by `session_id`.
    pub async fn refresh(&self, session_id: &str, fingerprint: &str) -> Result<IssuedTokens> {
        let Ok(id) = Uuid::parse_str(session_id) else {
            tracing::warn!("Malformed refresh session id presented");
            return Err(AppError::SessionInvalid(SessionRejection::NotFound));
        };

        self.rotator.rotate(id, fingerprint).await
    }

    /// Ends a refresh session lineage. Unknown or malformed ids are ignored.
    pub async fn logout(&self, session_id: &str) -> Result<()> {
        let Ok(id) = Uuid::parse_str(session_id) else {
            return Ok(());
        };

        if self.sessions.delete_by_id(id).await? {
            tracing::info!("👋 Refresh session {} ended", id);
        }
        Ok(())
    }

    /// Resolves a bearer access token to its user.
    ///
    /// The signature is checked by the minter; freshness against the clock
    /// is checked here.
    pub async fn current_user(&self, access_token: &str) -> Result<UserResponse> {
        let claims = self
            .rotator
            .minter()
            .verify(access_token)
            .ok_or(AppError::InvalidAccessToken)?;

        if claims.is_expired_at(self.rotator.clock().now()) {
            tracing::debug!("Access token for {} is expired", claims.sub);
            return Err(AppError::InvalidAccessToken);
        }

        let user_id = claims.user_id().ok_or(AppError::InvalidAccessToken)?;
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::InvalidAccessToken)?;

        if !user.is_active {
            return Err(AppError::InvalidAccessToken);
        }

        Ok(user.into())
    }
}

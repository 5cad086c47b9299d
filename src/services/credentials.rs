use std::sync::Arc;

use crate::{
    config::LoginIdentifier,
    crypto::password::{verify_dummy_password, verify_password},
    error::{AppError, AuthRejection, Result},
    models::user::User,
    repositories::UserStore,
};

/// Checks login credentials against the user store.
#[derive(Clone)]
pub struct CredentialValidator {
    users: Arc<dyn UserStore>,
    lookup: LoginIdentifier,
}

impl CredentialValidator {
    pub fn new(users: Arc<dyn UserStore>, lookup: LoginIdentifier) -> Self {
        Self { users, lookup }
    }

    /// Authenticates a user.
    ///
    /// Rejections come back as `AppError::AuthenticationRejected` carrying
    /// the precise reason; the HTTP layer renders `NotFound` and
    /// `BadPassword` identically.
    ///
    /// # Arguments
    ///
    /// * `identifier` - Username or email, depending on configuration.
    /// * `password` - The plaintext password.
    pub async fn validate(&self, identifier: &str, password: &str) -> Result<User> {
        let user = match self.lookup {
            LoginIdentifier::Username => self.users.find_by_username(identifier).await?,
            LoginIdentifier::Email => self.users.find_by_email(identifier).await?,
        };

        let Some(user) = user else {
            // Same Argon2 cost as a wrong password.
            verify_dummy_password(password);
            tracing::info!("Login rejected: no user for identifier");
            return Err(AppError::AuthenticationRejected(AuthRejection::NotFound));
        };

        if !verify_password(password, &user.hashed_password) {
            tracing::info!("Login rejected: bad password for user {}", user.id);
            return Err(AppError::AuthenticationRejected(AuthRejection::BadPassword));
        }

        if !user.is_active {
            tracing::info!("Login rejected: user {} is inactive", user.id);
            return Err(AppError::AuthenticationRejected(AuthRejection::Inactive));
        }

        tracing::info!("✅ User authenticated: {}", user.id);
        Ok(user)
    }
}

use garde::Validate;

use crate::error::{AppError, Result};

#[derive(Validate)]
struct EmailInput<'a> {
    #[garde(email, length(max = 254))]
    email: &'a str,
}

/// Validates a username.
///
/// # Arguments
///
/// * `username` - The username to validate.
///
/// # Returns
///
/// A `Result<()>` indicating whether the username is valid.
pub fn validate_username(username: &str) -> Result<()> {
    let length = username.chars().count();

    if length < 3 {
        return Err(AppError::Validation(
            "Username must be at least 3 characters long".to_string(),
        ));
    }

    if length > 255 {
        return Err(AppError::Validation(
            "Username must be at most 255 characters".to_string(),
        ));
    }

    if !username.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        return Err(AppError::Validation(
            "Username can only contain letters, numbers, underscores, and hyphens".to_string(),
        ));
    }

    Ok(())
}

/// Validates an email address.
///
/// Syntax is checked by `garde`; on top of that the domain must be dotted.
pub fn validate_email(email: &str) -> Result<()> {
    let invalid = || AppError::Validation("Email address is not valid".to_string());

    EmailInput { email }.validate().map_err(|report| {
        tracing::debug!("Email rejected: {}", report);
        invalid()
    })?;

    let (_, domain) = email.rsplit_once('@').ok_or_else(invalid)?;
    if domain.split('.').count() < 2 || domain.split('.').any(str::is_empty) {
        return Err(invalid());
    }

    Ok(())
}

/// Validates a password against the complexity policy.
///
/// # Arguments
///
/// * `password` - The password to validate.
///
/// # Returns
///
/// A `Result<()>` indicating whether the password is valid.
pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < 8 {
        return Err(AppError::Validation(
            "Password must be at least 8 characters long".to_string(),
        ));
    }

    if password.chars().count() > 128 {
        return Err(AppError::Validation(
            "Password must be at most 128 characters".to_string(),
        ));
    }

    if !password.chars().any(|c| c.is_lowercase())
        || !password.chars().any(|c| c.is_uppercase())
        || !password.chars().any(|c| c.is_ascii_digit())
    {
        return Err(AppError::Validation(
            "Password must contain lowercase and uppercase letters and a digit".to_string(),
        ));
    }

    Ok(())
}

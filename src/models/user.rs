use chrono::{DateTime, Utc};
use serde::Serialize;

/// Represents a user in the system.
#[derive(Clone, Debug)]
pub struct User {
    /// The unique identifier for the user, assigned by the store.
    pub id: i64,
    /// The user's username. Unique.
    pub username: String,
    /// The user's email address. Unique.
    pub email: String,
    /// The user's Argon2 password hash.
    pub hashed_password: String,
    /// Whether the user may log in.
    pub is_active: bool,
    /// Whether the user confirmed their email.
    pub is_verified: bool,
    /// The timestamp when the user was created.
    pub created_at: DateTime<Utc>,
}

/// A user that has not been stored yet.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub hashed_password: String,
}

/// The public view of a user. Never carries the password hash.
#[derive(Clone, Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

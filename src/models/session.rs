use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single-use refresh session bound to a client fingerprint.
///
/// The id is valid for exactly one rotation attempt: it is removed from the
/// store before the session is checked, whatever the outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshSession {
    /// Random session id handed to the client.
    pub id: Uuid,
    /// The user this session belongs to.
    pub user_id: i64,
    /// Opaque client fingerprint supplied at login.
    pub fingerprint: String,
    /// The timestamp when the session was created.
    pub issued_at: DateTime<Utc>,
    /// The timestamp when the session expires.
    pub expires_at: DateTime<Utc>,
}

impl RefreshSession {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// What a successful login or rotation hands back to the caller.
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    /// Signed access token.
    pub access_token: String,
    /// Id of the freshly created refresh session.
    pub refresh_session_id: Uuid,
    /// When that refresh session expires.
    pub refresh_expires_at: DateTime<Utc>,
}

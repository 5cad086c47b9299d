//! Persistence seams.
//!
//! The services only see these traits; each storage technology gets its own
//! adapter module.

pub mod attempts;
pub mod memory;
pub mod refresh_session;
pub mod user;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::session::RefreshSession;
use crate::models::user::{NewUser, User};

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Stores a new user and returns it with its assigned id.
    ///
    /// Fails with `AppError::UserExists` when the username or email is taken.
    async fn insert(&self, user: NewUser) -> Result<User>;
}

#[async_trait]
pub trait RefreshSessionStore: Send + Sync {
    async fn insert(&self, session: RefreshSession) -> Result<RefreshSession>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<RefreshSession>>;

    /// Removes a session. Returns `true` only for the caller that actually
    /// removed it.
    async fn delete_by_id(&self, id: Uuid) -> Result<bool>;

    /// Looks a session up and removes it as one step.
    ///
    /// Of any number of concurrent callers presenting the same id, at most
    /// one gets `Some`. The default relies on `delete_by_id` being atomic;
    /// adapters with a native get-and-delete should override it.
    async fn take(&self, id: Uuid) -> Result<Option<RefreshSession>> {
        let Some(session) = self.find_by_id(id).await? else {
            return Ok(None);
        };

        if self.delete_by_id(id).await? {
            Ok(Some(session))
        } else {
            Ok(None)
        }
    }
}

/// Fixed-window attempt counters behind the rate limiter.
#[async_trait]
pub trait AttemptCounter: Send + Sync {
    /// Attempts recorded in the open window, 0 when none is open.
    async fn count(&self, key: &str) -> Result<i64>;

    /// Records an attempt and returns the new count. The first attempt opens
    /// a window lasting `window`; later ones do not extend it.
    async fn record(&self, key: &str, window: chrono::Duration) -> Result<i64>;

    /// Seconds until the open window closes.
    async fn seconds_left(&self, key: &str) -> Result<i64>;

    async fn clear(&self, key: &str) -> Result<()>;
}

//! In-process stores for tests and local runs without PostgreSQL or Redis.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    clock::Clock,
    error::{AppError, Result},
    models::session::RefreshSession,
    models::user::{NewUser, User},
    repositories::{AttemptCounter, RefreshSessionStore, UserStore},
};

#[derive(Default)]
struct UserTable {
    next_id: i64,
    rows: HashMap<i64, User>,
}

/// A `UserStore` kept in memory.
#[derive(Clone, Default)]
pub struct MemoryUserStore {
    table: Arc<RwLock<UserTable>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips the active flag; user management proper lives elsewhere.
    pub async fn set_active(&self, id: i64, active: bool) -> bool {
        let mut table = self.table.write().await;
        match table.rows.get_mut(&id) {
            Some(user) => {
                user.is_active = active;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let table = self.table.read().await;
        Ok(table.rows.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let table = self.table.read().await;
        Ok(table.rows.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let table = self.table.read().await;
        Ok(table.rows.get(&id).cloned())
    }

    async fn insert(&self, user: NewUser) -> Result<User> {
        let mut table = self.table.write().await;

        if table
            .rows
            .values()
            .any(|u| u.username == user.username || u.email == user.email)
        {
            return Err(AppError::UserExists);
        }

        table.next_id += 1;
        let stored = User {
            id: table.next_id,
            username: user.username,
            email: user.email,
            hashed_password: user.hashed_password,
            is_active: true,
            is_verified: false,
            created_at: Utc::now(),
        };
        table.rows.insert(stored.id, stored.clone());
        Ok(stored)
    }
}

/// A `RefreshSessionStore` kept in memory.
#[derive(Clone, Default)]
pub struct MemoryRefreshSessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, RefreshSession>>>,
}

impl MemoryRefreshSessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl RefreshSessionStore for MemoryRefreshSessionStore {
    async fn insert(&self, session: RefreshSession) -> Result<RefreshSession> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<RefreshSession>> {
        Ok(self.sessions.read().await.get(&id).cloned())
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool> {
        Ok(self.sessions.write().await.remove(&id).is_some())
    }

    async fn take(&self, id: Uuid) -> Result<Option<RefreshSession>> {
        Ok(self.sessions.write().await.remove(&id))
    }
}

/// An `AttemptCounter` kept in memory, with windows measured on `clock`.
#[derive(Clone)]
pub struct MemoryAttemptCounter {
    clock: Arc<dyn Clock>,
    windows: Arc<RwLock<HashMap<String, (i64, DateTime<Utc>)>>>,
}

impl MemoryAttemptCounter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            windows: Arc::default(),
        }
    }
}

#[async_trait]
impl AttemptCounter for MemoryAttemptCounter {
    async fn count(&self, key: &str) -> Result<i64> {
        let now = self.clock.now();
        let windows = self.windows.read().await;
        Ok(windows
            .get(key)
            .filter(|(_, closes_at)| *closes_at > now)
            .map_or(0, |(count, _)| *count))
    }

    async fn record(&self, key: &str, window: chrono::Duration) -> Result<i64> {
        let now = self.clock.now();
        let mut windows = self.windows.write().await;
        let entry = windows.entry(key.to_string()).or_insert((0, now));
        if entry.1 <= now {
            *entry = (0, now + window);
        }
        entry.0 += 1;
        Ok(entry.0)
    }

    async fn seconds_left(&self, key: &str) -> Result<i64> {
        let now = self.clock.now();
        let windows = self.windows.read().await;
        Ok(windows
            .get(key)
            .map_or(0, |(_, closes_at)| (*closes_at - now).num_seconds().max(0)))
    }

    async fn clear(&self, key: &str) -> Result<()> {
        self.windows.write().await.remove(key);
        Ok(())
    }
}

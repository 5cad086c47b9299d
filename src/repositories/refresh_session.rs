use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, SetExpiry, SetOptions};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::session::RefreshSession,
    repositories::RefreshSessionStore,
};

fn session_key(id: Uuid) -> String {
    format!("refresh_session:{}", id)
}

fn decode(json: &str) -> Result<RefreshSession> {
    sonic_rs::from_str(json)
        .map_err(|e| AppError::Serialization(format!("Invalid refresh session JSON: {}", e)))
}

/// Redis-backed refresh session store.
///
/// Keys expire at the session's own `expires_at`, so Redis drops dead
/// sessions by itself.
#[derive(Clone)]
pub struct RedisRefreshSessionStore {
    redis: ConnectionManager,
}

impl RedisRefreshSessionStore {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl RefreshSessionStore for RedisRefreshSessionStore {
    async fn insert(&self, session: RefreshSession) -> Result<RefreshSession> {
        let session_json = sonic_rs::to_string(&session)
            .map_err(|e| AppError::Serialization(format!("Session serialization failed: {}", e)))?;

        let expire_at = session.expires_at.timestamp().max(1) as u64;
        let options = SetOptions::default().with_expiration(SetExpiry::EXAT(expire_at));

        let mut redis = self.redis.clone();
        let _: () = redis
            .set_options(session_key(session.id), &session_json, options)
            .await
            .map_err(|e| {
                tracing::error!("❌ Redis SET failed: {}", e);
                AppError::Redis(e)
            })?;

        tracing::debug!("Refresh session stored: {}", session.id);
        Ok(session)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<RefreshSession>> {
        let mut redis = self.redis.clone();
        let session_json: Option<String> = redis.get(session_key(id)).await?;
        session_json.as_deref().map(decode).transpose()
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool> {
        let mut redis = self.redis.clone();
        let removed: i64 = redis.del(session_key(id)).await?;
        Ok(removed > 0)
    }

    async fn take(&self, id: Uuid) -> Result<Option<RefreshSession>> {
        let mut redis = self.redis.clone();
        let session_json: Option<String> = redis::cmd("GETDEL")
            .arg(session_key(id))
            .query_async(&mut redis)
            .await?;
        session_json.as_deref().map(decode).transpose()
    }
}

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::{error::Result, repositories::AttemptCounter};

/// Redis-backed attempt counter. Each key is an `INCR` counter whose expiry
/// is set by the attempt that opens the window.
#[derive(Clone)]
pub struct RedisAttemptCounter {
    redis: ConnectionManager,
}

impl RedisAttemptCounter {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl AttemptCounter for RedisAttemptCounter {
    async fn count(&self, key: &str) -> Result<i64> {
        let mut redis = self.redis.clone();
        let count: Option<i64> = redis.get(key).await?;
        Ok(count.unwrap_or(0))
    }

    async fn record(&self, key: &str, window: chrono::Duration) -> Result<i64> {
        let mut redis = self.redis.clone();
        let count: i64 = redis.incr(key, 1).await?;
        if count == 1 {
            let _: () = redis.expire(key, window.num_seconds().max(1)).await?;
        }
        Ok(count)
    }

    async fn seconds_left(&self, key: &str) -> Result<i64> {
        let mut redis = self.redis.clone();
        let ttl: i64 = redis.ttl(key).await?;
        Ok(ttl.max(0))
    }

    async fn clear(&self, key: &str) -> Result<()> {
        let mut redis = self.redis.clone();
        let _: () = redis.del(key).await?;
        Ok(())
    }
}

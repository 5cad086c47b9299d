use redis::aio::ConnectionManager;
use std::sync::Arc;

use crate::clock::SystemClock;
use crate::config::Config;
use crate::crypto::token::{SigningKeys, TokenMinter};
use crate::error::Result;
use crate::repositories::{
    attempts::RedisAttemptCounter, refresh_session::RedisRefreshSessionStore, user::PgUserStore,
    AttemptCounter, RefreshSessionStore, UserStore,
};
use crate::services::{auth::AuthService, credentials::CredentialValidator, rotator::SessionRotator};

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The application's configuration.
    pub config: Arc<Config>,
    /// Registration, login and refresh.
    pub auth: AuthService,
    /// Attempt counters for rate limiting; limits are off without them.
    pub attempts: Option<Arc<dyn AttemptCounter>>,
}

impl AppState {
    /// Wires the auth service from already-built parts.
    pub fn from_parts(
        config: Config,
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn RefreshSessionStore>,
        minter: TokenMinter,
        clock: Arc<dyn crate::clock::Clock>,
        attempts: Option<Arc<dyn AttemptCounter>>,
    ) -> Self {
        let validator = CredentialValidator::new(users.clone(), config.login_identifier);
        let rotator = SessionRotator::new(sessions.clone(), minter, clock, config.token_settings());
        let auth = AuthService::new(users, sessions, validator, rotator);

        Self {
            config: Arc::new(config),
            auth,
            attempts,
        }
    }

    /// Creates a new `AppState` backed by PostgreSQL and Redis.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `AppState`.
    pub async fn new(config: &Config) -> Result<Self> {
        let keys = SigningKeys::load(
            &config.private_key_path,
            &config.public_key_path,
            config.token_algorithm,
        )?;

        let db = crate::db::create_pool(&config.database_url)?;
        crate::db::init_schema(&db).await?;
        tracing::info!("✅ PostgreSQL pool initialized");

        let redis_client = redis::Client::open(config.redis_url.as_str())?;
        let redis = ConnectionManager::new(redis_client).await?;
        tracing::info!("✅ Redis Connection Manager initialized (pooled)");

        Ok(Self::from_parts(
            config.clone(),
            Arc::new(PgUserStore::new(db)),
            Arc::new(RedisRefreshSessionStore::new(redis.clone())),
            TokenMinter::new(keys),
            Arc::new(SystemClock),
            Some(Arc::new(RedisAttemptCounter::new(redis))),
        ))
    }
}

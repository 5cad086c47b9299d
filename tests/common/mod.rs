#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::Algorithm;

use rotorgate::{
    clock::ManualClock,
    config::{Config, LoginIdentifier},
    crypto::token::{SigningKeys, TokenMinter},
    repositories::memory::{MemoryAttemptCounter, MemoryRefreshSessionStore, MemoryUserStore},
    state::AppState,
};

pub const PRIVATE_PEM: &[u8] = include_bytes!("../fixtures/jwt_private.pem");
pub const PUBLIC_PEM: &[u8] = include_bytes!("../fixtures/jwt_public.pem");

pub const PASSWORD: &str = "Str0ngPassword";

// Shared test context
pub struct TestContext {
    pub state: AppState,
    pub users: MemoryUserStore,
    pub sessions: MemoryRefreshSessionStore,
    pub attempts: MemoryAttemptCounter,
    pub clock: Arc<ManualClock>,
}

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()
}

pub fn test_config() -> Config {
    Config {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        database_url: "postgres://unused".to_string(),
        redis_url: "redis://unused".to_string(),
        private_key_path: PathBuf::from("tests/fixtures/jwt_private.pem"),
        public_key_path: PathBuf::from("tests/fixtures/jwt_public.pem"),
        token_algorithm: Algorithm::RS256,
        access_token_ttl_minutes: 7,
        refresh_session_ttl_days: 7,
        cookie_path: "/api/auth".to_string(),
        cookie_secure: false,
        login_identifier: LoginIdentifier::Email,
    }
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        let users = MemoryUserStore::new();
        let sessions = MemoryRefreshSessionStore::new();
        let clock = Arc::new(ManualClock::new(start()));
        let attempts = MemoryAttemptCounter::new(clock.clone());
        let keys = SigningKeys::from_pem(PRIVATE_PEM, PUBLIC_PEM, Algorithm::RS256).unwrap();

        let state = AppState::from_parts(
            config,
            Arc::new(users.clone()),
            Arc::new(sessions.clone()),
            TokenMinter::new(keys),
            clock.clone(),
            Some(Arc::new(attempts.clone())),
        );

        Self {
            state,
            users,
            sessions,
            attempts,
            clock,
        }
    }
}

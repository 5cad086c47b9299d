//! Refresh session issuance and rotation.
//!
//! Per lineage a session id moves ABSENT -> LIVE -> CONSUMED and is never
//! reused. Rotation removes the presented session from the store *before*
//! looking at its expiry or fingerprint, so a replayed id always finds
//! nothing, even when the first attempt was itself rejected.

use std::sync::Arc;

use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::{
    clock::Clock,
    config::TokenSettings,
    crypto::token::{AccessClaims, TokenMinter},
    error::{AppError, Result, SessionRejection},
    models::session::{IssuedTokens, RefreshSession},
    repositories::RefreshSessionStore,
};

#[derive(Clone)]
pub struct SessionRotator {
    sessions: Arc<dyn RefreshSessionStore>,
    minter: TokenMinter,
    clock: Arc<dyn Clock>,
    settings: TokenSettings,
}

impl SessionRotator {
    pub fn new(
        sessions: Arc<dyn RefreshSessionStore>,
        minter: TokenMinter,
        clock: Arc<dyn Clock>,
        settings: TokenSettings,
    ) -> Self {
        Self {
            sessions,
            minter,
            clock,
            settings,
        }
    }

    pub fn minter(&self) -> &TokenMinter {
        &self.minter
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Starts a new lineage for a freshly authenticated user.
    pub async fn issue(&self, user_id: i64, fingerprint: &str) -> Result<IssuedTokens> {
        let tokens = self.mint_pair(user_id, fingerprint).await?;
        tracing::info!(
            "✅ Refresh session {} issued for user {}",
            tokens.refresh_session_id,
            user_id
        );
        Ok(tokens)
    }

    /// Trades a live refresh session for a new access token and session.
    ///
    /// Whatever the outcome, `presented_id` is unusable afterwards.
    pub async fn rotate(&self, presented_id: Uuid, presented_fingerprint: &str) -> Result<IssuedTokens> {
        // Lookup and delete are one step; nothing below may run first.
        let Some(session) = self.sessions.take(presented_id).await? else {
            tracing::warn!("Refresh session {} not found", presented_id);
            return Err(AppError::SessionInvalid(SessionRejection::NotFound));
        };

        let now = self.clock.now();
        if session.is_expired_at(now) {
            tracing::warn!(
                "Refresh session {} of user {} expired at {}",
                session.id,
                session.user_id,
                session.expires_at
            );
            return Err(AppError::SessionInvalid(SessionRejection::Expired));
        }

        let fingerprint_matches: bool = session
            .fingerprint
            .as_bytes()
            .ct_eq(presented_fingerprint.as_bytes())
            .into();
        if !fingerprint_matches {
            tracing::warn!(
                "Refresh session {} of user {} presented with a different fingerprint",
                session.id,
                session.user_id
            );
            return Err(AppError::SessionInvalid(SessionRejection::FingerprintMismatch));
        }

        let tokens = self.mint_pair(session.user_id, &session.fingerprint).await?;
        tracing::info!(
            "🔄 Refresh session {} rotated to {} for user {}",
            session.id,
            tokens.refresh_session_id,
            session.user_id
        );
        Ok(tokens)
    }

    async fn mint_pair(&self, user_id: i64, fingerprint: &str) -> Result<IssuedTokens> {
        let now = self.clock.now();

        // Sign first so a key problem never leaves an orphan session behind.
        let claims = AccessClaims::new(user_id, Vec::new(), now, self.settings.access_ttl);
        let access_token = self.minter.mint(&claims)?;

        let session = self
            .sessions
            .insert(RefreshSession {
                id: Uuid::new_v4(),
                user_id,
                fingerprint: fingerprint.to_string(),
                issued_at: now,
                expires_at: now + self.settings.refresh_ttl,
            })
            .await?;

        Ok(IssuedTokens {
            access_token,
            refresh_session_id: session.id,
            refresh_expires_at: session.expires_at,
        })
    }
}

//! Access token minting and verification.
//!
//! Access tokens are self-contained JWTs signed with an RSA private key and
//! checked with the matching public key. Nothing about them is persisted.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// The claim set carried by every access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// The user id, as a string.
    pub sub: String,
    /// Granted scopes, possibly empty.
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Issued-at, unix seconds.
    pub iat: i64,
    /// Expires-at, unix seconds.
    pub exp: i64,
}

impl AccessClaims {
    /// Builds claims for `user_id` valid for `ttl` starting at `issued_at`.
    pub fn new(
        user_id: i64,
        scopes: Vec<String>,
        issued_at: DateTime<Utc>,
        ttl: chrono::Duration,
    ) -> Self {
        Self {
            sub: user_id.to_string(),
            scopes,
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
        }
    }

    /// The subject parsed back into a user id.
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }

    /// Whether the token is stale at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.exp <= now.timestamp()
    }
}

/// The RSA key pair, loaded once at startup.
#[derive(Clone)]
pub struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
}

impl SigningKeys {
    /// Builds the key pair from PEM-encoded RSA keys.
    pub fn from_pem(private_pem: &[u8], public_pem: &[u8], algorithm: Algorithm) -> Result<Self> {
        let encoding = EncodingKey::from_rsa_pem(private_pem)
            .map_err(|e| AppError::Signing(format!("Invalid private key: {}", e)))?;
        let decoding = DecodingKey::from_rsa_pem(public_pem)
            .map_err(|e| AppError::Signing(format!("Invalid public key: {}", e)))?;

        Ok(Self {
            encoding,
            decoding,
            algorithm,
        })
    }

    /// Reads both PEM files from disk.
    pub fn load(private_path: &Path, public_path: &Path, algorithm: Algorithm) -> Result<Self> {
        let private_pem = std::fs::read(private_path).map_err(|e| {
            AppError::Signing(format!("Cannot read {}: {}", private_path.display(), e))
        })?;
        let public_pem = std::fs::read(public_path).map_err(|e| {
            AppError::Signing(format!("Cannot read {}: {}", public_path.display(), e))
        })?;

        let keys = Self::from_pem(&private_pem, &public_pem, algorithm)?;
        tracing::info!("✅ Signing keys loaded ({:?})", algorithm);
        Ok(keys)
    }
}

/// Signs and verifies access tokens. Stateless apart from the keys.
#[derive(Clone)]
pub struct TokenMinter {
    keys: Arc<SigningKeys>,
}

impl TokenMinter {
    pub fn new(keys: SigningKeys) -> Self {
        Self {
            keys: Arc::new(keys),
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.keys.algorithm
    }

    /// Serializes and signs `claims`.
    pub fn mint(&self, claims: &AccessClaims) -> Result<String> {
        encode(&Header::new(self.keys.algorithm), claims, &self.keys.encoding)
            .map_err(|e| AppError::Signing(format!("Failed to sign access token: {}", e)))
    }

    /// Checks signature and structure only.
    ///
    /// Expiry is deliberately not checked here; callers that care compare
    /// `exp` against their own clock.
    pub fn verify(&self, token: &str) -> Option<AccessClaims> {
        let mut validation = Validation::new(self.keys.algorithm);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.required_spec_claims.clear();
        validation.leeway = 0;

        match decode::<AccessClaims>(token, &self.keys.decoding, &validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                tracing::debug!("Access token rejected: {}", e);
                None
            }
        }
    }
}

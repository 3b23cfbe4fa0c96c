//! JWTs, refresh tokens, one-time codes and password hashing

use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::domain::aggregates::User;
use crate::domain::value_objects::Role;
use crate::{EcommerceError, Result};

/// Reset tokens are only good for a short follow-up request.
pub const RESET_TOKEN_TTL_MINUTES: i64 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind { Access, PasswordReset }

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub typ: TokenKind,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, access_ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
        }
    }

    pub fn access_ttl(&self) -> Duration { self.access_ttl }

    pub fn issue_access(&self, user: &User, now: DateTime<Utc>) -> Result<String> {
        self.issue(user, TokenKind::Access, now, self.access_ttl)
    }

    pub fn issue_reset(&self, user: &User, now: DateTime<Utc>) -> Result<String> {
        self.issue(user, TokenKind::PasswordReset, now, Duration::minutes(RESET_TOKEN_TTL_MINUTES))
    }

    fn issue(&self, user: &User, typ: TokenKind, now: DateTime<Utc>, ttl: Duration) -> Result<String> {
        let claims = AccessClaims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            typ,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| EcommerceError::Internal(format!("token encoding failed: {e}")))
    }

    /// Verifies signature and expiry against the wall clock, then the token kind.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<AccessClaims> {
        let claims = jsonwebtoken::decode::<AccessClaims>(token, &self.decoding, &Validation::default())
            .map_err(|_| EcommerceError::Unauthorized("invalid or expired token".into()))?
            .claims;
        if claims.typ != expected {
            return Err(EcommerceError::Unauthorized("invalid or expired token".into()));
        }
        Ok(claims)
    }
}

/// 32 random bytes, hex encoded. Only [`hash_refresh_token`] of it is stored.
pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn hash_refresh_token(token: &str) -> String { hex::encode(Sha256::digest(token.as_bytes())) }

/// Six-digit, zero-padded.
pub fn generate_otp_code() -> String { format!("{:06}", OsRng.next_u32() % 1_000_000) }

pub async fn hash_secret(secret: &str) -> Result<String> {
    let secret = secret.to_string();
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(secret.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| EcommerceError::Internal(format!("hashing failed: {e}")))
    })
    .await
    .map_err(|e| EcommerceError::Internal(e.to_string()))?
}

pub async fn verify_secret(secret: &str, hash: &str) -> Result<bool> {
    let secret = secret.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&hash).map_err(|e| EcommerceError::Internal(format!("stored hash is invalid: {e}")))?;
        match Argon2::default().verify_password(secret.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(EcommerceError::Internal(format!("verification failed: {e}"))),
        }
    })
    .await
    .map_err(|e| EcommerceError::Internal(e.to_string()))?
}

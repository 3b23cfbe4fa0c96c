//! Refresh-token and OTP storage

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::aggregates::{Otp, RefreshToken};
use crate::Result;

#[async_trait]
pub trait TokenRepository: Send + Sync {
    async fn save(&self, user_id: Uuid, token_hash: &str, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Result<()>;
    async fn find(&self, token_hash: &str) -> Result<Option<RefreshToken>>;
    /// False when the token was already revoked, so only one caller can rotate it.
    async fn revoke(&self, token_hash: &str, now: DateTime<Utc>) -> Result<bool>;
}

#[async_trait]
pub trait OtpRepository: Send + Sync {
    /// Replaces any earlier code for the same email and purpose.
    async fn upsert(&self, otp: &Otp) -> Result<()>;
    async fn find(&self, email: &str, purpose: &str) -> Result<Option<Otp>>;
    /// False when another request consumed the code first.
    async fn mark_used(&self, id: Uuid) -> Result<bool>;
}

pub struct PgTokenRepository { pool: PgPool }

impl PgTokenRepository {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl TokenRepository for PgTokenRepository {
    async fn save(&self, user_id: Uuid, token_hash: &str, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Result<()> {
        sqlx::query("INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at, created_at) VALUES ($1, $2, $3, $4, $5)")
            .bind(Uuid::now_v7())
            .bind(user_id)
            .bind(token_hash)
            .bind(expires_at)
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find(&self, token_hash: &str) -> Result<Option<RefreshToken>> {
        let token = sqlx::query_as::<_, RefreshToken>("SELECT * FROM refresh_tokens WHERE token_hash = $1")
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await?;
        Ok(token)
    }

    async fn revoke(&self, token_hash: &str, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query("UPDATE refresh_tokens SET revoked_at = $2 WHERE token_hash = $1 AND revoked_at IS NULL")
            .bind(token_hash)
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}

pub struct PgOtpRepository { pool: PgPool }

impl PgOtpRepository {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl OtpRepository for PgOtpRepository {
    async fn upsert(&self, otp: &Otp) -> Result<()> {
        sqlx::query(
            "INSERT INTO otps (id, user_id, email, purpose, code_hash, expires_at, is_used, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, FALSE, $7)
             ON CONFLICT (email, purpose) DO UPDATE
             SET user_id = EXCLUDED.user_id, code_hash = EXCLUDED.code_hash, expires_at = EXCLUDED.expires_at,
                 is_used = FALSE, created_at = EXCLUDED.created_at",
        )
        .bind(otp.id)
        .bind(otp.user_id)
        .bind(&otp.email)
        .bind(&otp.purpose)
        .bind(&otp.code_hash)
        .bind(otp.expires_at)
        .bind(otp.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find(&self, email: &str, purpose: &str) -> Result<Option<Otp>> {
        let otp = sqlx::query_as::<_, Otp>("SELECT * FROM otps WHERE email = $1 AND purpose = $2")
            .bind(email)
            .bind(purpose)
            .fetch_optional(&self.pool)
            .await?;
        Ok(otp)
    }

    async fn mark_used(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("UPDATE otps SET is_used = TRUE WHERE id = $1 AND NOT is_used").bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() == 1)
    }
}

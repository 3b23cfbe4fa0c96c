//! User, credential and one-time-password records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::Role;

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub image: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub is_blocked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshToken {
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool { self.revoked_at.is_none() && now <= self.expires_at }
}

pub const PASSWORD_RESET_PURPOSE: &str = "password_reset";

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct Otp {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub email: String,
    pub purpose: String,
    pub code_hash: String,
    pub expires_at: DateTime<Utc>,
    pub is_used: bool,
    pub created_at: DateTime<Utc>,
}

impl Otp {
    /// Checks state before the code itself is compared.
    pub fn ensure_redeemable(&self, now: DateTime<Utc>) -> Result<(), OtpError> {
        if self.is_used { return Err(OtpError::AlreadyUsed); }
        if now > self.expires_at { return Err(OtpError::Expired); }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OtpError {
    #[error("OTP not found")]
    NotFound,
    #[error("OTP already used")]
    AlreadyUsed,
    #[error("OTP expired")]
    Expired,
    #[error("invalid OTP")]
    Mismatch,
}

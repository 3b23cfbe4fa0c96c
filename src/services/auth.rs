//! Registration, sessions and OTP password reset

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use super::tokens::{self, TokenKind, TokenService};
use super::{spawn_detached, Clock, Email, Mailer};
use crate::domain::aggregates::{Otp, OtpError, User, PASSWORD_RESET_PURPOSE};
use crate::domain::value_objects::Role;
use crate::repositories::{NewUser, OtpRepository, TokenRepository, UserRepository};
use crate::{EcommerceError, Result};

const INVALID_CREDENTIALS: &str = "invalid credentials";
const BLOCKED: &str = "account is blocked";

#[derive(Clone, Debug, Serialize)]
pub struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(skip)]
    pub refresh_expires_at: DateTime<Utc>,
    pub user: User,
}

#[derive(Clone, Debug)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    refresh_tokens: Arc<dyn TokenRepository>,
    otps: Arc<dyn OtpRepository>,
    tokens: TokenService,
    mailer: Arc<dyn Mailer>,
    clock: Arc<dyn Clock>,
    refresh_ttl: Duration,
    otp_ttl: Duration,
    mail_from: String,
}

impl AuthService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        users: Arc<dyn UserRepository>,
        refresh_tokens: Arc<dyn TokenRepository>,
        otps: Arc<dyn OtpRepository>,
        tokens: TokenService,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
        refresh_ttl: Duration,
        otp_ttl: Duration,
        mail_from: String,
    ) -> Self {
        Self { users, refresh_tokens, otps, tokens, mailer, clock, refresh_ttl, otp_ttl, mail_from }
    }

    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(&self, registration: Registration) -> Result<User> {
        let email = normalize_email(&registration.email);
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(EcommerceError::Conflict("email already registered".into()));
        }
        let password_hash = tokens::hash_secret(&registration.password).await?;
        let user = self
            .users
            .create(
                NewUser {
                    username: registration.username.trim().to_string(),
                    email,
                    password_hash,
                    phone: registration.phone,
                    address: registration.address,
                    role: Role::Customer,
                },
                self.clock.now(),
            )
            .await?;
        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<IssuedTokens> {
        let user = self
            .users
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or_else(|| EcommerceError::Unauthorized(INVALID_CREDENTIALS.into()))?;
        if !tokens::verify_secret(password, &user.password_hash).await? {
            return Err(EcommerceError::Unauthorized(INVALID_CREDENTIALS.into()));
        }
        if user.is_blocked {
            return Err(EcommerceError::Forbidden(BLOCKED.into()));
        }
        self.issue(user).await
    }

    /// Rotates a refresh token: the presented one is revoked and a new pair issued.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<IssuedTokens> {
        let now = self.clock.now();
        let hash = tokens::hash_refresh_token(refresh_token);
        let stored = self
            .refresh_tokens
            .find(&hash)
            .await?
            .filter(|t| t.is_usable(now))
            .ok_or_else(|| EcommerceError::Unauthorized("invalid or expired refresh token".into()))?;

        let user = self
            .users
            .find_by_id(stored.user_id)
            .await?
            .ok_or_else(|| EcommerceError::Unauthorized("invalid or expired refresh token".into()))?;
        if user.is_blocked {
            return Err(EcommerceError::Forbidden(BLOCKED.into()));
        }

        if !self.refresh_tokens.revoke(&hash, now).await? {
            return Err(EcommerceError::Unauthorized("invalid or expired refresh token".into()));
        }
        self.issue(user).await
    }

    #[instrument(skip_all)]
    pub async fn logout(&self, refresh_token: Option<&str>) -> Result<()> {
        if let Some(token) = refresh_token {
            self.refresh_tokens.revoke(&tokens::hash_refresh_token(token), self.clock.now()).await?;
        }
        Ok(())
    }

    /// Stores a fresh reset code and emails it in the background.
    #[instrument(skip(self))]
    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        let email = normalize_email(email);
        let user = self.users.find_by_email(&email).await?.ok_or_else(|| EcommerceError::NotFound("user not found".into()))?;
        if user.is_blocked {
            return Err(EcommerceError::Forbidden(BLOCKED.into()));
        }

        let code = tokens::generate_otp_code();
        let now = self.clock.now();
        let otp = Otp {
            id: Uuid::now_v7(),
            user_id: Some(user.id),
            email: email.clone(),
            purpose: PASSWORD_RESET_PURPOSE.to_string(),
            code_hash: tokens::hash_secret(&code).await?,
            expires_at: now + self.otp_ttl,
            is_used: false,
            created_at: now,
        };
        self.otps.upsert(&otp).await?;

        let mail = Email {
            from: self.mail_from.clone(),
            to: email,
            subject: "Your password reset code".into(),
            body: format!("Your code is {code}. It expires in {} minutes.", self.otp_ttl.num_minutes()),
        };
        let mailer = Arc::clone(&self.mailer);
        spawn_detached("send_otp_email", async move { mailer.send(mail).await });
        Ok(())
    }

    /// Consumes the code and returns a short-lived password-reset token.
    #[instrument(skip(self, code))]
    pub async fn verify_otp(&self, email: &str, code: &str) -> Result<String> {
        let email = normalize_email(email);
        let otp = self.otps.find(&email, PASSWORD_RESET_PURPOSE).await?.ok_or(OtpError::NotFound)?;
        let now = self.clock.now();
        otp.ensure_redeemable(now)?;
        if !tokens::verify_secret(code.trim(), &otp.code_hash).await? {
            return Err(OtpError::Mismatch.into());
        }
        if !self.otps.mark_used(otp.id).await? {
            return Err(OtpError::AlreadyUsed.into());
        }

        let user = self.users.find_by_email(&email).await?.ok_or_else(|| EcommerceError::NotFound("user not found".into()))?;
        self.tokens.issue_reset(&user, now)
    }

    #[instrument(skip_all)]
    pub async fn update_password(&self, reset_token: &str, new_password: &str) -> Result<()> {
        let claims = self.tokens.verify(reset_token, TokenKind::PasswordReset)?;
        let user = self.users.find_by_id(claims.sub).await?.ok_or_else(|| EcommerceError::NotFound("user not found".into()))?;
        let hash = tokens::hash_secret(new_password).await?;
        self.users.set_password(user.id, &hash, self.clock.now()).await?;
        tracing::info!(user_id = %user.id, "password updated");
        Ok(())
    }

    async fn issue(&self, user: User) -> Result<IssuedTokens> {
        let now = self.clock.now();
        let access_token = self.tokens.issue_access(&user, now)?;
        let refresh_token = tokens::generate_refresh_token();
        let refresh_expires_at = now + self.refresh_ttl;
        self.refresh_tokens.save(user.id, &tokens::hash_refresh_token(&refresh_token), refresh_expires_at, now).await?;
        Ok(IssuedTokens { access_token, refresh_token, refresh_expires_at, user })
    }
}

fn normalize_email(email: &str) -> String { email.trim().to_lowercase() }

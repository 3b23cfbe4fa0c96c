//! /auth handlers

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use validator::Validate;

use super::extract::{ACCESS_COOKIE, REFRESH_COOKIE};
use super::{message, JsonBody};
use crate::domain::aggregates::User;
use crate::services::{IssuedTokens, Registration};
use crate::state::AppState;
use crate::{EcommerceError, Result};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/forgot-password", post(forgot_password))
        .route("/verify-otp", post(verify_otp))
        .route("/update-password", post(update_password))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub password: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest { pub refresh_token: Option<String> }

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyOtpRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(equal = 6))]
    pub otp: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePasswordRequest {
    pub reset_token: String,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub password: String,
}

async fn register(State(s): State<AppState>, JsonBody(r): JsonBody<RegisterRequest>) -> Result<(StatusCode, Json<User>)> {
    r.validate()?;
    let user = s.auth.register(Registration { username: r.username, email: r.email, password: r.password, phone: r.phone, address: r.address }).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn login(State(s): State<AppState>, jar: CookieJar, JsonBody(r): JsonBody<LoginRequest>) -> Result<(CookieJar, Json<IssuedTokens>)> {
    r.validate()?;
    let tokens = s.auth.login(&r.email, &r.password).await?;
    Ok((set_session(jar, &tokens, s.config.cookie_secure), Json(tokens)))
}

/// Accepts the refresh token from the cookie or from a JSON body.
async fn refresh(State(s): State<AppState>, jar: CookieJar, body: Bytes) -> Result<(CookieJar, Json<IssuedTokens>)> {
    let presented = presented_refresh_token(&jar, &body)
        .ok_or_else(|| EcommerceError::Unauthorized("refresh token required".into()))?;
    let tokens = s.auth.refresh(&presented).await?;
    Ok((set_session(jar, &tokens, s.config.cookie_secure), Json(tokens)))
}

async fn logout(State(s): State<AppState>, jar: CookieJar, body: Bytes) -> Result<(CookieJar, Json<serde_json::Value>)> {
    let presented = presented_refresh_token(&jar, &body);
    s.auth.logout(presented.as_deref()).await?;
    let jar = jar.remove(Cookie::build(ACCESS_COOKIE).path("/")).remove(Cookie::build(REFRESH_COOKIE).path("/"));
    Ok((jar, message("logged out")))
}

async fn forgot_password(State(s): State<AppState>, JsonBody(r): JsonBody<ForgotPasswordRequest>) -> Result<Json<serde_json::Value>> {
    r.validate()?;
    s.auth.forgot_password(&r.email).await?;
    Ok(message("OTP sent to email"))
}

async fn verify_otp(State(s): State<AppState>, JsonBody(r): JsonBody<VerifyOtpRequest>) -> Result<Json<serde_json::Value>> {
    r.validate()?;
    let reset_token = s.auth.verify_otp(&r.email, &r.otp).await?;
    Ok(Json(serde_json::json!({ "message": "OTP verified", "reset_token": reset_token })))
}

async fn update_password(State(s): State<AppState>, JsonBody(r): JsonBody<UpdatePasswordRequest>) -> Result<Json<serde_json::Value>> {
    r.validate()?;
    s.auth.update_password(&r.reset_token, &r.password).await?;
    Ok(message("password updated"))
}

fn presented_refresh_token(jar: &CookieJar, body: &[u8]) -> Option<String> {
    jar.get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .or_else(|| serde_json::from_slice::<RefreshRequest>(body).ok().and_then(|r| r.refresh_token))
        .filter(|t| !t.is_empty())
}

fn set_session(jar: CookieJar, tokens: &IssuedTokens, secure: bool) -> CookieJar {
    let cookie = |name: &'static str, value: String| {
        Cookie::build((name, value)).path("/").http_only(true).secure(secure).same_site(SameSite::Lax)
    };
    jar.add(cookie(ACCESS_COOKIE, tokens.access_token.clone()))
        .add(cookie(REFRESH_COOKIE, tokens.refresh_token.clone()))
}

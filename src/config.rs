//! Environment-driven application configuration.

use std::env;
use std::num::NonZeroU32;
use std::str::FromStr;

use chrono::Duration;

use crate::{EcommerceError, Result};

#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub otp_ttl: Duration,
    pub nats_url: Option<String>,
    pub mail_from: String,
    /// Outbound mail server. Without it, emails are only logged.
    pub smtp: Option<SmtpSettings>,
    pub cookie_secure: bool,
    /// Per-client token bucket: sustained requests per second and burst size.
    pub rate_limit_per_second: NonZeroU32,
    pub rate_limit_burst: NonZeroU32,
    /// Key the rate limiter on `X-Forwarded-For` when behind a proxy.
    pub trust_proxy_headers: bool,
}

#[derive(Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_max_connections", &self.database_max_connections)
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("otp_ttl", &self.otp_ttl)
            .field("nats_url", &self.nats_url)
            .field("mail_from", &self.mail_from)
            .field("smtp", &self.smtp)
            .field("cookie_secure", &self.cookie_secure)
            .field("rate_limit_per_second", &self.rate_limit_per_second)
            .field("rate_limit_burst", &self.rate_limit_burst)
            .field("trust_proxy_headers", &self.trust_proxy_headers)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key).filter(|v| !v.is_empty()).ok_or_else(|| EcommerceError::Config(format!("missing environment variable '{key}'")))
        };

        let smtp = match (lookup("SMTP_HOST").filter(|v| !v.is_empty()), lookup("SMTP_EMAIL").filter(|v| !v.is_empty())) {
            (Some(host), Some(username)) => Some(SmtpSettings {
                host,
                port: parse_or(&lookup, "SMTP_PORT", 587)?,
                username,
                password: lookup("SMTP_PASSWORD").unwrap_or_default(),
            }),
            _ => None,
        };
        let mail_from = lookup("MAIL_FROM")
            .filter(|v| !v.is_empty())
            .or_else(|| smtp.as_ref().map(|s| s.username.clone()))
            .unwrap_or_else(|| "no-reply@storefront.local".to_string());

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 8083)?,
            database_url: required("DATABASE_URL")?,
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: Duration::minutes(parse_or(&lookup, "ACCESS_TOKEN_TTL_MINUTES", 15)?),
            refresh_token_ttl: Duration::days(parse_or(&lookup, "REFRESH_TOKEN_TTL_DAYS", 7)?),
            otp_ttl: Duration::minutes(parse_or(&lookup, "OTP_TTL_MINUTES", 5)?),
            nats_url: lookup("NATS_URL").filter(|v| !v.is_empty()),
            mail_from,
            smtp,
            cookie_secure: parse_or(&lookup, "COOKIE_SECURE", false)?,
            rate_limit_per_second: non_zero("RATE_LIMIT_PER_SECOND", parse_or(&lookup, "RATE_LIMIT_PER_SECOND", 2)?)?,
            rate_limit_burst: non_zero("RATE_LIMIT_BURST", parse_or(&lookup, "RATE_LIMIT_BURST", 10)?)?,
            trust_proxy_headers: parse_or(&lookup, "TRUST_PROXY_HEADERS", false)?,
        })
    }

    pub fn bind_addr(&self) -> String { format!("{}:{}", self.host, self.port) }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.is_empty() => raw.parse().map_err(|e| EcommerceError::Config(format!("invalid {key} '{raw}': {e}"))),
        _ => Ok(default),
    }
}

fn non_zero(key: &str, value: u32) -> Result<NonZeroU32> {
    NonZeroU32::new(value).ok_or_else(|| EcommerceError::Config(format!("{key} must be greater than 0")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/shop"), ("JWT_SECRET", "s")])).unwrap();
        assert_eq!(cfg.port, 8083);
        assert_eq!(cfg.access_token_ttl, Duration::minutes(15));
        assert_eq!(cfg.refresh_token_ttl, Duration::days(7));
        assert!(cfg.nats_url.is_none());
        assert!(!cfg.cookie_secure);
        assert!(cfg.smtp.is_none());
        assert_eq!(cfg.mail_from, "no-reply@storefront.local");
        assert_eq!((cfg.rate_limit_per_second.get(), cfg.rate_limit_burst.get()), (2, 10));
    }

    #[test]
    fn test_smtp_settings() {
        let base = [("DATABASE_URL", "x"), ("JWT_SECRET", "s")];
        let host_only = AppConfig::from_lookup(lookup(&[base[0], base[1], ("SMTP_HOST", "smtp.example.com")])).unwrap();
        assert!(host_only.smtp.is_none());

        let cfg = AppConfig::from_lookup(lookup(&[
            base[0], base[1],
            ("SMTP_HOST", "smtp.example.com"), ("SMTP_EMAIL", "shop@example.com"), ("SMTP_PASSWORD", "pw"),
        ]))
        .unwrap();
        let smtp = cfg.smtp.as_ref().unwrap();
        assert_eq!((smtp.host.as_str(), smtp.port), ("smtp.example.com", 587));
        assert_eq!(cfg.mail_from, "shop@example.com");
        assert!(!format!("{cfg:?}").contains("pw"));

        let bad = AppConfig::from_lookup(lookup(&[base[0], base[1], ("SMTP_HOST", "h"), ("SMTP_EMAIL", "e"), ("SMTP_PORT", "smtp")]));
        assert!(matches!(bad, Err(EcommerceError::Config(m)) if m.contains("SMTP_PORT")));
    }

    #[test]
    fn test_rate_limit_must_be_positive() {
        let zero = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "x"), ("JWT_SECRET", "s"), ("RATE_LIMIT_BURST", "0")]));
        assert!(matches!(zero, Err(EcommerceError::Config(m)) if m.contains("RATE_LIMIT_BURST")));
    }

    #[test]
    fn test_missing_and_invalid() {
        assert!(matches!(AppConfig::from_lookup(lookup(&[("JWT_SECRET", "s")])), Err(EcommerceError::Config(_))));
        let bad = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "x"), ("JWT_SECRET", "s"), ("PORT", "http")]));
        assert!(matches!(bad, Err(EcommerceError::Config(m)) if m.contains("PORT")));
    }
}

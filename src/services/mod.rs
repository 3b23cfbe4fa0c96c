//! Application services: request-level orchestration over the repositories.

use std::future::Future;

use chrono::{DateTime, Utc};

pub mod auth;
pub mod cart;
pub mod events;
pub mod mailer;
pub mod orders;
pub mod products;
pub mod tokens;
pub mod users;
pub mod wishlist;

pub use auth::{AuthService, IssuedTokens, Registration};
pub use cart::CartService;
pub use events::{EventPublisher, LogPublisher, NatsPublisher};
pub use mailer::{Email, LogMailer, Mailer, SmtpMailer};
pub use orders::OrderService;
pub use products::{ProductPatch, ProductService};
pub use tokens::{AccessClaims, TokenKind, TokenService};
pub use users::{AdminUserPatch, ProfilePatch, UserService};
pub use wishlist::WishlistService;

/// Source of "now" for anything time-dependent.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> { Utc::now() }
}

/// Runs `future` in the background. Errors are logged and dropped; the caller
/// never waits on or observes the outcome.
pub fn spawn_detached<F, E>(task: &'static str, future: F)
where
    F: Future<Output = Result<(), E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = future.await {
            tracing::warn!(task, error = %e, "background task failed");
        }
    });
}

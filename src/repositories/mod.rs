//! Persistence seams
//!
//! Each repository is an object-safe trait with a PostgreSQL implementation.
//! Services only ever see `Arc<dyn ...>` handles, so tests can swap in an
//! in-memory store.

use std::sync::Arc;

use sqlx::PgPool;

use crate::EcommerceError;

pub mod auth;
pub mod carts;
pub mod orders;
pub mod products;
pub mod users;
pub mod wishlist;

pub use auth::{OtpRepository, PgOtpRepository, PgTokenRepository, TokenRepository};
pub use carts::{CartRepository, PgCartRepository};
pub use orders::{OrderSource, OrderRepository, PgOrderRepository, PlaceOrder};
pub use products::{NewProduct, PgProductRepository, ProductChanges, ProductFilter, ProductRepository};
pub use users::{NewUser, PgUserRepository, UserChanges, UserRepository};
pub use wishlist::{PgWishlistRepository, WishlistRepository};

/// Every repository the services need, behind trait objects.
#[derive(Clone)]
pub struct Repositories {
    pub orders: Arc<dyn OrderRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub carts: Arc<dyn CartRepository>,
    pub wishlist: Arc<dyn WishlistRepository>,
    pub users: Arc<dyn UserRepository>,
    pub tokens: Arc<dyn TokenRepository>,
    pub otps: Arc<dyn OtpRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            orders: Arc::new(PgOrderRepository::new(pool.clone())),
            products: Arc::new(PgProductRepository::new(pool.clone())),
            carts: Arc::new(PgCartRepository::new(pool.clone())),
            wishlist: Arc::new(PgWishlistRepository::new(pool.clone())),
            users: Arc::new(PgUserRepository::new(pool.clone())),
            tokens: Arc::new(PgTokenRepository::new(pool.clone())),
            otps: Arc::new(PgOtpRepository::new(pool)),
        }
    }
}

/// Maps a unique-constraint violation to `Conflict`, anything else to `Database`.
pub(crate) fn conflict_on_unique(err: sqlx::Error, message: &str) -> EcommerceError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => EcommerceError::Conflict(message.to_string()),
        _ => EcommerceError::Database(err),
    }
}

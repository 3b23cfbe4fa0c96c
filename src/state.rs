//! Shared application state handed to every handler.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::http::ClientRateLimiter;
use crate::repositories::Repositories;
use crate::services::{
    AuthService, CartService, Clock, EventPublisher, Mailer, OrderService, ProductService, TokenService, UserService,
    WishlistService,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub tokens: TokenService,
    pub auth: AuthService,
    pub orders: OrderService,
    pub carts: CartService,
    pub products: ProductService,
    pub wishlist: WishlistService,
    pub users: UserService,
    pub limiter: ClientRateLimiter,
}

impl AppState {
    pub fn new(
        config: Arc<AppConfig>,
        repos: Repositories,
        mailer: Arc<dyn Mailer>,
        events: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let tokens = TokenService::new(&config.jwt_secret, config.access_token_ttl);
        let auth = AuthService::new(
            repos.users.clone(),
            repos.tokens.clone(),
            repos.otps.clone(),
            tokens.clone(),
            mailer,
            clock.clone(),
            config.refresh_token_ttl,
            config.otp_ttl,
            config.mail_from.clone(),
        );

        Self {
            orders: OrderService::new(repos.orders.clone(), events, clock.clone()),
            carts: CartService::new(repos.carts.clone(), repos.products.clone(), clock.clone()),
            products: ProductService::new(repos.products.clone(), clock.clone()),
            wishlist: WishlistService::new(repos.wishlist.clone(), repos.products.clone(), clock.clone()),
            users: UserService::new(repos.users.clone(), clock),
            limiter: ClientRateLimiter::from_config(&config),
            tokens,
            auth,
            config,
        }
    }
}

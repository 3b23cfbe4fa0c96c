//! Storefront E-commerce Backend
//!
//! REST backend for a small shop over PostgreSQL.
//!
//! ## Features
//! - Product catalog and categories
//! - Per-user cart
//! - Orders with transactional stock reservation, cancellation and a
//!   forward-only status workflow
//! - Wishlist
//! - Cookie/bearer JWT auth with OTP password reset

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use thiserror::Error;

pub mod config;
pub mod domain;
pub mod http;
pub mod repositories;
pub mod services;
pub mod state;

use domain::aggregates::{CartError, OrderError, OtpError, ProductError};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum EcommerceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("insufficient stock for product {product}")]
    InsufficientStock { product: String },

    #[error("{0}")]
    InvalidState(String),

    #[error("Too many requests")]
    RateLimited,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, EcommerceError>;

impl EcommerceError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) | Self::InsufficientStock { .. } | Self::InvalidState(_) => StatusCode::CONFLICT,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Config(_) | Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for EcommerceError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Database(_) => "database operation failed".to_string(),
            Self::Config(_) | Self::Internal(_) => "an internal error occurred".to_string(),
            other => other.to_string(),
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<OrderError> for EcommerceError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Product(p) => p.into(),
            OrderError::ProductNotFound(_) | OrderError::ItemNotFound(_) => Self::NotFound(err.to_string()),
            OrderError::EmptyCart | OrderError::AmountOverflow | OrderError::InvalidStatus(_) => Self::Validation(err.to_string()),
            OrderError::NotPending { .. } | OrderError::WindowExpired { .. } | OrderError::ItemAlreadyCancelled
            | OrderError::Delivered | OrderError::InvalidTransition { .. } => Self::InvalidState(err.to_string()),
        }
    }
}

impl From<ProductError> for EcommerceError {
    fn from(err: ProductError) -> Self {
        match err {
            ProductError::InsufficientStock { product } => Self::InsufficientStock { product },
            ProductError::InvalidQuantity => Self::Validation(err.to_string()),
            ProductError::Unavailable { .. } => Self::InvalidState(err.to_string()),
        }
    }
}

impl From<CartError> for EcommerceError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::ItemNotFound => Self::NotFound(err.to_string()),
            CartError::AlreadyInCart => Self::Conflict(err.to_string()),
            CartError::Unavailable { .. } | CartError::OutOfStock { .. } | CartError::StockLimit { .. } => {
                Self::InvalidState(err.to_string())
            }
        }
    }
}

impl From<OtpError> for EcommerceError {
    fn from(err: OtpError) -> Self {
        match err {
            OtpError::NotFound => Self::NotFound(err.to_string()),
            OtpError::AlreadyUsed | OtpError::Expired | OtpError::Mismatch => Self::Unauthorized(err.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for EcommerceError {
    fn from(err: validator::ValidationErrors) -> Self { Self::Validation(err.to_string()) }
}

// Malformed bodies, paths and query strings are all client input errors.

impl From<JsonRejection> for EcommerceError {
    fn from(rejection: JsonRejection) -> Self { Self::Validation(rejection.body_text()) }
}

impl From<PathRejection> for EcommerceError {
    fn from(rejection: PathRejection) -> Self { Self::Validation(rejection.body_text()) }
}

impl From<QueryRejection> for EcommerceError {
    fn from(rejection: QueryRejection) -> Self { Self::Validation(rejection.body_text()) }
}

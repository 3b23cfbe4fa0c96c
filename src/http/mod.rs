//! HTTP surface: routing, extractors and handlers.

use axum::{middleware, routing::get, Json, Router};
use axum::response::IntoResponse;
use serde::Deserialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::domain::value_objects::Pagination;
use crate::state::AppState;

pub mod auth;
pub mod cart;
pub mod extract;
pub mod orders;
pub mod products;
pub mod rate_limit;
pub mod users;
pub mod wishlist;

pub use extract::{AdminUser, AuthUser, JsonBody, PathParam, QueryParams};
pub use rate_limit::ClientRateLimiter;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/auth", auth::routes())
        .nest("/products", products::routes())
        .nest("/cart", cart::routes())
        .nest("/orders", orders::routes())
        .nest("/wishlist", wishlist::routes())
        .nest("/users", users::routes());

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api)
        .layer(middleware::from_fn_with_state(state.limiter.clone(), rate_limit::limit_requests))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "healthy", "service": "storefront"}))
}

#[derive(Debug, Default, Deserialize)]
pub struct PageParams { pub page: Option<u32>, pub limit: Option<u32> }

impl From<&PageParams> for Pagination {
    fn from(p: &PageParams) -> Self { Pagination::new(p.page, p.limit) }
}

pub(crate) fn message(text: &str) -> Json<serde_json::Value> { Json(serde_json::json!({ "message": text })) }

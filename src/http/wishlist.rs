//! /wishlist handlers

use axum::extract::State;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use uuid::Uuid;

use super::{message, AuthUser, PathParam};
use crate::domain::aggregates::{WishlistItem, WishlistStatus};
use crate::state::AppState;
use crate::Result;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/toggle/:product_id", post(toggle))
        .route("/:product_id", delete(remove))
        .route("/:product_id/status", get(status))
}

async fn list(user: AuthUser, State(s): State<AppState>) -> Result<Json<Vec<WishlistItem>>> {
    Ok(Json(s.wishlist.list(user.id).await?))
}

async fn toggle(user: AuthUser, State(s): State<AppState>, PathParam(product_id): PathParam<Uuid>) -> Result<Json<serde_json::Value>> {
    let action = s.wishlist.toggle(user.id, product_id).await?;
    Ok(Json(serde_json::json!({ "action": action, "product_id": product_id })))
}

async fn remove(user: AuthUser, State(s): State<AppState>, PathParam(product_id): PathParam<Uuid>) -> Result<Json<serde_json::Value>> {
    s.wishlist.remove(user.id, product_id).await?;
    Ok(message("removed from wishlist"))
}

async fn status(user: AuthUser, State(s): State<AppState>, PathParam(product_id): PathParam<Uuid>) -> Result<Json<WishlistStatus>> {
    Ok(Json(s.wishlist.status(user.id, product_id).await?))
}

//! /cart handlers

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use super::{AuthUser, JsonBody, PathParam};
use crate::domain::aggregates::{CartItem, CartOperation, CartView};
use crate::state::AppState;
use crate::Result;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_cart))
        .route("/products/:product_id", post(add_to_cart))
        .route("/items/:item_id", patch(change_quantity).delete(remove_item))
}

#[derive(Debug, Deserialize)]
pub struct QuantityRequest { pub op: CartOperation }

async fn get_cart(user: AuthUser, State(s): State<AppState>) -> Result<Json<CartView>> {
    Ok(Json(s.carts.view(user.id).await?))
}

async fn add_to_cart(user: AuthUser, State(s): State<AppState>, PathParam(product_id): PathParam<Uuid>) -> Result<(StatusCode, Json<CartItem>)> {
    Ok((StatusCode::CREATED, Json(s.carts.add_product(user.id, product_id).await?)))
}

async fn change_quantity(user: AuthUser, State(s): State<AppState>, PathParam(item_id): PathParam<Uuid>, JsonBody(r): JsonBody<QuantityRequest>) -> Result<Json<CartView>> {
    Ok(Json(s.carts.change_quantity(user.id, item_id, r.op).await?))
}

async fn remove_item(user: AuthUser, State(s): State<AppState>, PathParam(item_id): PathParam<Uuid>) -> Result<Json<CartView>> {
    Ok(Json(s.carts.remove_item(user.id, item_id).await?))
}

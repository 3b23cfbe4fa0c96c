//! /orders handlers

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{AdminUser, AuthUser, JsonBody, PageParams, PathParam, QueryParams};
use crate::domain::aggregates::{Checkout, Order};
use crate::domain::value_objects::PaginatedResponse;
use crate::state::AppState;
use crate::Result;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders))
        .route("/cart", post(place_from_cart))
        .route("/single/:product_id", post(place_single))
        .route("/items/:item_id/cancel", delete(cancel_item))
        .route("/admin", get(list_all_orders))
        .route("/admin/:order_id/status", patch(update_status))
        .route("/:order_id", get(get_order))
        .route("/:order_id/cancel", delete(cancel_order))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutRequest {
    #[validate(length(min = 1, message = "shipping address is required"))]
    pub shipping_address: String,
    #[validate(length(min = 1, max = 20, message = "payment method must be 1 to 20 characters"))]
    pub payment_method: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SingleOrderRequest {
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: i32,
    #[validate(length(min = 1, message = "shipping address is required"))]
    pub shipping_address: String,
    #[validate(length(min = 1, max = 20, message = "payment method must be 1 to 20 characters"))]
    pub payment_method: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest { pub status: String }

#[derive(Debug, Default, Deserialize)]
pub struct AdminListParams { pub status: Option<String>, pub page: Option<u32>, pub limit: Option<u32> }

#[derive(Debug, Serialize)]
pub struct ItemCancelledResponse { pub message: &'static str, pub order_cancelled: bool, pub order: Order }

async fn list_orders(user: AuthUser, State(s): State<AppState>) -> Result<Json<Vec<Order>>> {
    Ok(Json(s.orders.list_for_user(user.id).await?))
}

async fn get_order(user: AuthUser, State(s): State<AppState>, PathParam(order_id): PathParam<Uuid>) -> Result<Json<Order>> {
    Ok(Json(s.orders.get_for_user(user.id, order_id).await?))
}

async fn place_from_cart(user: AuthUser, State(s): State<AppState>, JsonBody(r): JsonBody<CheckoutRequest>) -> Result<(StatusCode, Json<Order>)> {
    r.validate()?;
    let checkout = Checkout { shipping_address: r.shipping_address, payment_method: r.payment_method };
    Ok((StatusCode::CREATED, Json(s.orders.place_from_cart(user.id, checkout).await?)))
}

async fn place_single(user: AuthUser, State(s): State<AppState>, PathParam(product_id): PathParam<Uuid>, JsonBody(r): JsonBody<SingleOrderRequest>) -> Result<(StatusCode, Json<Order>)> {
    r.validate()?;
    let checkout = Checkout { shipping_address: r.shipping_address, payment_method: r.payment_method };
    Ok((StatusCode::CREATED, Json(s.orders.place_single(user.id, product_id, r.quantity, checkout).await?)))
}

async fn cancel_item(_: AuthUser, State(s): State<AppState>, PathParam(item_id): PathParam<Uuid>) -> Result<Json<ItemCancelledResponse>> {
    let (order, outcome) = s.orders.cancel_item(item_id).await?;
    Ok(Json(ItemCancelledResponse { message: "order item cancelled", order_cancelled: outcome.order_cancelled, order }))
}

async fn cancel_order(user: AuthUser, State(s): State<AppState>, PathParam(order_id): PathParam<Uuid>) -> Result<Json<Order>> {
    Ok(Json(s.orders.cancel(user.id, order_id).await?))
}

async fn list_all_orders(_: AdminUser, State(s): State<AppState>, QueryParams(p): QueryParams<AdminListParams>) -> Result<Json<PaginatedResponse<Order>>> {
    let page = PageParams { page: p.page, limit: p.limit };
    Ok(Json(s.orders.list_all(p.status.as_deref(), (&page).into()).await?))
}

async fn update_status(_: AdminUser, State(s): State<AppState>, PathParam(order_id): PathParam<Uuid>, JsonBody(r): JsonBody<StatusRequest>) -> Result<Json<Order>> {
    Ok(Json(s.orders.update_status(order_id, &r.status).await?))
}

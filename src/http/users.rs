//! /users handlers

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use uuid::Uuid;

use super::{AdminUser, AuthUser, JsonBody, PageParams, PathParam, QueryParams};
use crate::domain::aggregates::User;
use crate::domain::value_objects::PaginatedResponse;
use crate::services::{AdminUserPatch, ProfilePatch};
use crate::state::AppState;
use crate::Result;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(me).patch(update_me))
        .route("/admin/users", get(list_users))
        .route("/admin/users/:id", get(get_user).patch(update_user))
}

async fn me(user: AuthUser, State(s): State<AppState>) -> Result<Json<User>> {
    Ok(Json(s.users.get(user.id).await?))
}

async fn update_me(user: AuthUser, State(s): State<AppState>, JsonBody(patch): JsonBody<ProfilePatch>) -> Result<Json<User>> {
    Ok(Json(s.users.update_profile(user.id, patch).await?))
}

async fn list_users(_: AdminUser, State(s): State<AppState>, QueryParams(p): QueryParams<PageParams>) -> Result<Json<PaginatedResponse<User>>> {
    Ok(Json(s.users.list((&p).into()).await?))
}

async fn get_user(_: AdminUser, State(s): State<AppState>, PathParam(id): PathParam<Uuid>) -> Result<Json<User>> {
    Ok(Json(s.users.get(id).await?))
}

async fn update_user(_: AdminUser, State(s): State<AppState>, PathParam(id): PathParam<Uuid>, JsonBody(patch): JsonBody<AdminUserPatch>) -> Result<Json<User>> {
    Ok(Json(s.users.admin_update(id, patch).await?))
}

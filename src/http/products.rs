//! /products handlers

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::{message, AdminUser, JsonBody, PageParams, PathParam, QueryParams};
use crate::domain::aggregates::{Category, Product};
use crate::domain::value_objects::PaginatedResponse;
use crate::repositories::{NewProduct, ProductFilter};
use crate::services::ProductPatch;
use crate::state::AppState;
use crate::{EcommerceError, Result};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products))
        .route("/categories", get(list_categories))
        .route("/:id", get(get_product))
        .route("/admin", post(create_product))
        .route("/admin/all", get(list_all_products))
        .route("/admin/categories", post(create_category))
        .route("/admin/:id", patch(update_product).delete(delete_product))
        .route("/admin/:id/toggle", patch(toggle_product))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub category: Option<Uuid>,
    pub search: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
}

impl ListParams {
    fn split(self) -> (ProductFilter, PageParams) {
        let filter = ProductFilter {
            category_id: self.category,
            search: self.search,
            min_price: self.min_price,
            max_price: self.max_price,
            include_hidden: false,
        };
        (filter, PageParams { page: self.page, limit: self.limit })
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[validate(range(min = 1))]
    pub price: i64,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub stock_count: i32,
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

async fn list_products(State(s): State<AppState>, QueryParams(p): QueryParams<ListParams>) -> Result<Json<PaginatedResponse<Product>>> {
    let (filter, page) = p.split();
    Ok(Json(s.products.list(filter, (&page).into(), false).await?))
}

async fn list_all_products(_: AdminUser, State(s): State<AppState>, QueryParams(p): QueryParams<ListParams>) -> Result<Json<PaginatedResponse<Product>>> {
    let (filter, page) = p.split();
    Ok(Json(s.products.list(filter, (&page).into(), true).await?))
}

async fn get_product(State(s): State<AppState>, PathParam(id): PathParam<Uuid>) -> Result<Json<Product>> {
    Ok(Json(s.products.get_public(id).await?))
}

async fn list_categories(State(s): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(s.products.categories().await?))
}

async fn create_product(_: AdminUser, State(s): State<AppState>, JsonBody(r): JsonBody<CreateProductRequest>) -> Result<(StatusCode, Json<Product>)> {
    r.validate()?;
    if r.images.iter().any(|url| !validator::validate_url(url.as_str())) {
        return Err(EcommerceError::Validation("images must be absolute URLs".into()));
    }
    let product = s.products.create(NewProduct {
        name: r.name.trim().to_string(),
        description: r.description,
        price: r.price,
        stock_count: r.stock_count,
        category_id: r.category_id,
        image_urls: r.images,
    }).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn update_product(_: AdminUser, State(s): State<AppState>, PathParam(id): PathParam<Uuid>, JsonBody(patch): JsonBody<ProductPatch>) -> Result<Json<Product>> {
    Ok(Json(s.products.update(id, patch).await?))
}

async fn toggle_product(_: AdminUser, State(s): State<AppState>, PathParam(id): PathParam<Uuid>) -> Result<Json<Product>> {
    Ok(Json(s.products.toggle_active(id).await?))
}

async fn delete_product(_: AdminUser, State(s): State<AppState>, PathParam(id): PathParam<Uuid>) -> Result<Json<serde_json::Value>> {
    s.products.delete(id).await?;
    Ok(message("product deleted"))
}

async fn create_category(_: AdminUser, State(s): State<AppState>, JsonBody(r): JsonBody<CreateCategoryRequest>) -> Result<(StatusCode, Json<Category>)> {
    r.validate()?;
    Ok((StatusCode::CREATED, Json(s.products.create_category(&r.name).await?)))
}

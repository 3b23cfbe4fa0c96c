//! Catalog reads and admin maintenance

use std::sync::Arc;

use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use super::Clock;
use crate::domain::aggregates::{Category, Product};
use crate::domain::value_objects::{PaginatedResponse, Pagination, Patch};
use crate::repositories::{NewProduct, ProductChanges, ProductFilter, ProductRepository};
use crate::{EcommerceError, Result};

/// Partial product update. Absent keys are left alone.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProductPatch {
    pub name: Patch<String>,
    pub description: Patch<String>,
    pub price: Patch<i64>,
    pub stock_count: Patch<i32>,
    pub category_id: Patch<Uuid>,
}

impl ProductPatch {
    pub fn into_changes(self) -> Result<ProductChanges> {
        let changes = ProductChanges {
            name: required("name", self.name)?.map(|n| n.trim().to_string()),
            description: match self.description {
                Patch::Missing => None,
                Patch::Null => Some(String::new()),
                Patch::Value(d) => Some(d),
            },
            price: required("price", self.price)?,
            stock_count: required("stock_count", self.stock_count)?,
            category_id: self.category_id.into_update(),
        };

        if changes.name.as_deref().is_some_and(str::is_empty) {
            return Err(EcommerceError::Validation("name cannot be empty".into()));
        }
        if changes.price.is_some_and(|p| p <= 0) {
            return Err(EcommerceError::Validation("price must be greater than 0".into()));
        }
        if changes.stock_count.is_some_and(|s| s < 0) {
            return Err(EcommerceError::Validation("stock_count cannot be negative".into()));
        }
        if changes.is_empty() {
            return Err(EcommerceError::Validation("no fields to update".into()));
        }
        Ok(changes)
    }
}

fn required<T>(field: &str, patch: Patch<T>) -> Result<Option<T>> {
    match patch {
        Patch::Missing => Ok(None),
        Patch::Null => Err(EcommerceError::Validation(format!("{field} cannot be null"))),
        Patch::Value(v) => Ok(Some(v)),
    }
}

#[derive(Clone)]
pub struct ProductService {
    products: Arc<dyn ProductRepository>,
    clock: Arc<dyn Clock>,
}

impl ProductService {
    pub fn new(products: Arc<dyn ProductRepository>, clock: Arc<dyn Clock>) -> Self { Self { products, clock } }

    pub async fn list(&self, mut filter: ProductFilter, page: Pagination, include_hidden: bool) -> Result<PaginatedResponse<Product>> {
        filter.include_hidden = include_hidden;
        let (data, total) = self.products.list(&filter, page).await?;
        Ok(PaginatedResponse { data, total, page: page.page() })
    }

    /// Hidden products are reported as missing.
    pub async fn get_public(&self, id: Uuid) -> Result<Product> {
        self.products
            .find(id)
            .await?
            .filter(Product::is_available)
            .ok_or_else(|| EcommerceError::NotFound("product not found".into()))
    }

    #[instrument(skip(self, product), fields(name = %product.name))]
    pub async fn create(&self, product: NewProduct) -> Result<Product> {
        let created = self.products.create(product, self.clock.now()).await?;
        tracing::info!(product_id = %created.id, "product created");
        Ok(created)
    }

    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: Uuid, patch: ProductPatch) -> Result<Product> {
        let changes = patch.into_changes()?;
        self.products.update(id, changes, self.clock.now()).await?.ok_or_else(|| EcommerceError::NotFound("product not found".into()))
    }

    #[instrument(skip(self))]
    pub async fn toggle_active(&self, id: Uuid) -> Result<Product> {
        self.products.toggle_active(id, self.clock.now()).await?.ok_or_else(|| EcommerceError::NotFound("product not found".into()))
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        if !self.products.soft_delete(id, self.clock.now()).await? {
            return Err(EcommerceError::NotFound("product not found".into()));
        }
        tracing::info!(product_id = %id, "product deleted");
        Ok(())
    }

    pub async fn categories(&self) -> Result<Vec<Category>> { self.products.list_categories().await }

    #[instrument(skip(self))]
    pub async fn create_category(&self, name: &str) -> Result<Category> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EcommerceError::Validation("category name is required".into()));
        }
        self.products.create_category(name, self.clock.now()).await
    }
}

//! Product Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub stock_count: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    /// Ordered by `position`; the first entry is the primary image.
    #[sqlx(skip)]
    #[serde(default)]
    pub images: Vec<ProductImage>,
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProductImage { pub id: Uuid, pub product_id: Uuid, pub url: String, pub alt_text: String, pub position: i32 }

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category { pub id: Uuid, pub name: String, pub created_at: DateTime<Utc> }

impl Product {
    pub fn is_available(&self) -> bool { self.is_active && self.deleted_at.is_none() }

    pub fn primary_image(&self) -> Option<&str> { self.images.first().map(|i| i.url.as_str()) }

    /// Takes `qty` units out of stock.
    pub fn reserve(&mut self, qty: i32) -> Result<(), ProductError> {
        if qty <= 0 { return Err(ProductError::InvalidQuantity); }
        if self.stock_count < qty {
            return Err(ProductError::InsufficientStock { product: self.name.clone() });
        }
        self.stock_count -= qty;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProductError {
    #[error("quantity must be greater than 0")]
    InvalidQuantity,
    #[error("insufficient stock for product {product}")]
    InsufficientStock { product: String },
    #[error("product {product} is not available")]
    Unavailable { product: String },
}

#[cfg(test)]
pub(crate) fn sample(name: &str, price: i64, stock: i32) -> Product {
    let now = Utc::now();
    Product {
        id: Uuid::now_v7(), category_id: None, name: name.into(), description: String::new(),
        price, stock_count: stock, is_active: true, created_at: now, updated_at: now, deleted_at: None, images: vec![],
    }
}

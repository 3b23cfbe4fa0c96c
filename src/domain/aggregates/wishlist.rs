//! Wishlist entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::product::Product;

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct WishlistEntry { pub id: Uuid, pub user_id: Uuid, pub product_id: Uuid, pub created_at: DateTime<Utc> }

#[derive(Clone, Debug, Serialize)]
pub struct WishlistItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub price: i64,
    pub image: Option<String>,
    pub in_stock: bool,
    pub added_at: DateTime<Utc>,
}

impl WishlistItem {
    pub fn new(entry: WishlistEntry, product: Product) -> Self {
        Self {
            id: entry.id,
            product_id: product.id,
            price: product.price,
            image: product.primary_image().map(str::to_string),
            in_stock: product.is_available() && product.stock_count > 0,
            name: product.name,
            added_at: entry.created_at,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleOutcome { Added, Removed }

#[derive(Clone, Debug, Serialize)]
pub struct WishlistStatus { pub in_wishlist: bool, pub wishlist_id: Option<Uuid>, pub added_at: Option<DateTime<Utc>> }

impl From<Option<WishlistEntry>> for WishlistStatus {
    fn from(entry: Option<WishlistEntry>) -> Self {
        match entry {
            Some(e) => Self { in_wishlist: true, wishlist_id: Some(e.id), added_at: Some(e.created_at) },
            None => Self { in_wishlist: false, wishlist_id: None, added_at: None },
        }
    }
}

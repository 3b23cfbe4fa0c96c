//! Cart Aggregate
//!
//! The cart is pre-order state only: it never touches stock. Prices shown in
//! a cart view are always the product's current price.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::product::Product;

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Cart { pub id: Uuid, pub user_id: Uuid, pub created_at: DateTime<Utc>, pub updated_at: DateTime<Utc> }

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct CartItem { pub id: Uuid, pub cart_id: Uuid, pub product_id: Uuid, pub quantity: i32, pub created_at: DateTime<Utc> }

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CartOperation { Inc, Dec }

impl CartOperation {
    /// New quantity after applying the operation. `dec` stops at 1, `inc`
    /// stops at the product's current stock.
    pub fn apply(self, current: i32, product: &Product) -> Result<i32, CartError> {
        match self {
            CartOperation::Dec => Ok((current - 1).max(1)),
            CartOperation::Inc if current >= product.stock_count => {
                Err(CartError::StockLimit { product: product.name.clone(), stock: product.stock_count })
            }
            CartOperation::Inc => Ok(current + 1),
        }
    }
}

/// Checks that a product may be put into a cart.
pub fn ensure_addable(product: &Product) -> Result<(), CartError> {
    if !product.is_available() { return Err(CartError::Unavailable { product: product.name.clone() }); }
    if product.stock_count <= 0 { return Err(CartError::OutOfStock { product: product.name.clone() }); }
    Ok(())
}

#[derive(Clone, Debug, Serialize)]
pub struct CartLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub unit_price: i64,
    pub quantity: i32,
    pub line_total: i64,
    pub in_stock: bool,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct CartView { pub cart_id: Option<Uuid>, pub items: Vec<CartLine>, pub subtotal: i64 }

impl CartView {
    pub fn empty() -> Self { Self::default() }

    pub fn build(cart_id: Uuid, rows: Vec<(CartItem, Product)>) -> Self {
        let items: Vec<CartLine> = rows.into_iter().map(|(item, product)| CartLine {
            id: item.id,
            product_id: product.id,
            image: product.primary_image().map(str::to_string),
            unit_price: product.price,
            quantity: item.quantity,
            line_total: product.price.saturating_mul(i64::from(item.quantity)),
            in_stock: product.is_available() && product.stock_count >= item.quantity,
            name: product.name,
        }).collect();
        let subtotal = items.iter().fold(0i64, |acc, i| acc.saturating_add(i.line_total));
        Self { cart_id: Some(cart_id), items, subtotal }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    #[error("cart item not found")]
    ItemNotFound,
    #[error("product already in cart")]
    AlreadyInCart,
    #[error("product {product} is not available")]
    Unavailable { product: String },
    #[error("product {product} is out of stock")]
    OutOfStock { product: String },
    #[error("only {stock} units of {product} are in stock")]
    StockLimit { product: String, stock: i32 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::product::sample;

    #[test]
    fn test_cart_view_uses_current_prices() {
        let product = sample("Widget", 100, 10);
        let now = Utc::now();
        let item = CartItem { id: Uuid::now_v7(), cart_id: Uuid::now_v7(), product_id: product.id, quantity: 3, created_at: now };
        let view = CartView::build(item.cart_id, vec![(item, product)]);
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.subtotal, 300);
        assert!(view.items[0].in_stock);
    }

    #[test]
    fn test_quantity_operations() {
        let product = sample("Widget", 100, 2);
        assert_eq!(CartOperation::Dec.apply(1, &product), Ok(1));
        assert_eq!(CartOperation::Inc.apply(1, &product), Ok(2));
        assert!(matches!(CartOperation::Inc.apply(2, &product), Err(CartError::StockLimit { stock: 2, .. })));
    }

    #[test]
    fn test_ensure_addable() {
        let mut product = sample("Widget", 100, 0);
        assert!(matches!(ensure_addable(&product), Err(CartError::OutOfStock { .. })));
        product.stock_count = 1;
        product.is_active = false;
        assert!(matches!(ensure_addable(&product), Err(CartError::Unavailable { .. })));
    }
}

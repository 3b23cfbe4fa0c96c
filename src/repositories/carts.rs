//! Cart storage

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::{conflict_on_unique, products};
use crate::domain::aggregates::{Cart, CartError, CartItem, Product};
use crate::Result;

#[async_trait]
pub trait CartRepository: Send + Sync {
    /// The user's cart with each item joined to its current product row.
    async fn find_cart(&self, user_id: Uuid) -> Result<Option<(Cart, Vec<(CartItem, Product)>)>>;
    /// Creates the cart on first use. A product already in the cart is a conflict.
    async fn add_item(&self, user_id: Uuid, product_id: Uuid, now: DateTime<Utc>) -> Result<CartItem>;
    /// Only finds items in `user_id`'s own cart.
    async fn find_item(&self, user_id: Uuid, item_id: Uuid) -> Result<Option<(CartItem, Product)>>;
    async fn set_quantity(&self, item_id: Uuid, quantity: i32, now: DateTime<Utc>) -> Result<()>;
    async fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> Result<bool>;
}

pub struct PgCartRepository { pool: PgPool }

impl PgCartRepository {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl CartRepository for PgCartRepository {
    async fn find_cart(&self, user_id: Uuid) -> Result<Option<(Cart, Vec<(CartItem, Product)>)>> {
        let mut conn = self.pool.acquire().await?;
        let cart = sqlx::query_as::<_, Cart>("SELECT * FROM carts WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await?;
        let Some(cart) = cart else { return Ok(None) };

        let items = sqlx::query_as::<_, CartItem>("SELECT * FROM cart_items WHERE cart_id = $1 ORDER BY created_at, id")
            .bind(cart.id)
            .fetch_all(&mut *conn)
            .await?;
        let ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
        let mut by_id = products::fetch_by_ids(&mut conn, &ids).await?;

        let rows = items
            .into_iter()
            .filter_map(|item| by_id.remove(&item.product_id).map(|p| (item, p)))
            .collect();
        Ok(Some((cart, rows)))
    }

    async fn add_item(&self, user_id: Uuid, product_id: Uuid, now: DateTime<Utc>) -> Result<CartItem> {
        let mut tx = self.pool.begin().await?;
        let cart = sqlx::query_as::<_, Cart>(
            "INSERT INTO carts (id, user_id, created_at, updated_at) VALUES ($1, $2, $3, $3)
             ON CONFLICT (user_id) DO UPDATE SET updated_at = EXCLUDED.updated_at RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(user_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let item = sqlx::query_as::<_, CartItem>(
            "INSERT INTO cart_items (id, cart_id, product_id, quantity, created_at) VALUES ($1, $2, $3, 1, $4) RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(cart.id)
        .bind(product_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, &CartError::AlreadyInCart.to_string()))?;

        tx.commit().await?;
        Ok(item)
    }

    async fn find_item(&self, user_id: Uuid, item_id: Uuid) -> Result<Option<(CartItem, Product)>> {
        let mut conn = self.pool.acquire().await?;
        let item = sqlx::query_as::<_, CartItem>(
            "SELECT ci.* FROM cart_items ci JOIN carts c ON c.id = ci.cart_id WHERE ci.id = $1 AND c.user_id = $2",
        )
        .bind(item_id)
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;
        let Some(item) = item else { return Ok(None) };

        let product = products::fetch_by_ids(&mut conn, &[item.product_id]).await?.remove(&item.product_id);
        Ok(product.map(|p| (item, p)))
    }

    async fn set_quantity(&self, item_id: Uuid, quantity: i32, now: DateTime<Utc>) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let cart_id = sqlx::query_scalar::<_, Uuid>("UPDATE cart_items SET quantity = $2 WHERE id = $1 RETURNING cart_id")
            .bind(item_id)
            .bind(quantity)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(CartError::ItemNotFound)?;
        sqlx::query("UPDATE carts SET updated_at = $2 WHERE id = $1")
            .bind(cart_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM cart_items ci USING carts c WHERE ci.cart_id = c.id AND ci.id = $1 AND c.user_id = $2",
        )
        .bind(item_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Row-locks the user's cart items, oldest first. Must run inside a transaction.
pub(crate) async fn lock_user_items(conn: &mut PgConnection, user_id: Uuid) -> Result<Vec<CartItem>> {
    let items = sqlx::query_as::<_, CartItem>(
        "SELECT ci.* FROM cart_items ci JOIN carts c ON c.id = ci.cart_id
         WHERE c.user_id = $1 ORDER BY ci.created_at, ci.id FOR UPDATE OF ci",
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(items)
}

pub(crate) async fn delete_items(conn: &mut PgConnection, item_ids: &[Uuid]) -> Result<()> {
    if item_ids.is_empty() { return Ok(()); }
    sqlx::query("DELETE FROM cart_items WHERE id = ANY($1)")
        .bind(item_ids)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

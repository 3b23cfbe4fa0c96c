//! Wishlist storage

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{conflict_on_unique, products};
use crate::domain::aggregates::{Product, WishlistEntry};
use crate::Result;

#[async_trait]
pub trait WishlistRepository: Send + Sync {
    /// Newest first.
    async fn list(&self, user_id: Uuid) -> Result<Vec<(WishlistEntry, Product)>>;
    async fn find(&self, user_id: Uuid, product_id: Uuid) -> Result<Option<WishlistEntry>>;
    async fn add(&self, user_id: Uuid, product_id: Uuid, now: DateTime<Utc>) -> Result<WishlistEntry>;
    async fn remove(&self, user_id: Uuid, product_id: Uuid) -> Result<bool>;
}

pub struct PgWishlistRepository { pool: PgPool }

impl PgWishlistRepository {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl WishlistRepository for PgWishlistRepository {
    async fn list(&self, user_id: Uuid) -> Result<Vec<(WishlistEntry, Product)>> {
        let mut conn = self.pool.acquire().await?;
        let entries = sqlx::query_as::<_, WishlistEntry>(
            "SELECT * FROM wishlists WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await?;
        let ids: Vec<Uuid> = entries.iter().map(|e| e.product_id).collect();
        let mut by_id = products::fetch_by_ids(&mut conn, &ids).await?;

        Ok(entries
            .into_iter()
            .filter_map(|entry| by_id.remove(&entry.product_id).map(|p| (entry, p)))
            .collect())
    }

    async fn find(&self, user_id: Uuid, product_id: Uuid) -> Result<Option<WishlistEntry>> {
        let entry = sqlx::query_as::<_, WishlistEntry>("SELECT * FROM wishlists WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(entry)
    }

    async fn add(&self, user_id: Uuid, product_id: Uuid, now: DateTime<Utc>) -> Result<WishlistEntry> {
        sqlx::query_as::<_, WishlistEntry>(
            "INSERT INTO wishlists (id, user_id, product_id, created_at) VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(user_id)
        .bind(product_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "product already in wishlist"))
    }

    async fn remove(&self, user_id: Uuid, product_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM wishlists WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

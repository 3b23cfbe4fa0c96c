//! Product and category storage

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::conflict_on_unique;
use crate::domain::aggregates::{Category, Product, ProductImage};
use crate::domain::value_objects::Pagination;
use crate::Result;

#[derive(Clone, Debug, Default)]
pub struct ProductFilter {
    pub category_id: Option<Uuid>,
    pub search: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    /// Admin listings also return inactive and soft-deleted rows.
    pub include_hidden: bool,
}

#[derive(Clone, Debug)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: i64,
    pub stock_count: i32,
    pub category_id: Option<Uuid>,
    pub image_urls: Vec<String>,
}

/// Validated column updates. `None` leaves a column untouched.
#[derive(Clone, Debug, Default)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub stock_count: Option<i32>,
    pub category_id: Option<Option<Uuid>>,
}

impl ProductChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.price.is_none()
            && self.stock_count.is_none() && self.category_id.is_none()
    }
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn list(&self, filter: &ProductFilter, page: Pagination) -> Result<(Vec<Product>, i64)>;
    async fn find(&self, id: Uuid) -> Result<Option<Product>>;
    async fn create(&self, product: NewProduct, now: DateTime<Utc>) -> Result<Product>;
    async fn update(&self, id: Uuid, changes: ProductChanges, now: DateTime<Utc>) -> Result<Option<Product>>;
    async fn toggle_active(&self, id: Uuid, now: DateTime<Utc>) -> Result<Option<Product>>;
    /// Returns `false` when the product does not exist or was already deleted.
    async fn soft_delete(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool>;
    async fn list_categories(&self) -> Result<Vec<Category>>;
    async fn create_category(&self, name: &str, now: DateTime<Utc>) -> Result<Category>;
}

pub struct PgProductRepository { pool: PgPool }

impl PgProductRepository {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    qb.push(" WHERE TRUE");
    if !filter.include_hidden {
        qb.push(" AND is_active AND deleted_at IS NULL");
    }
    if let Some(category_id) = filter.category_id {
        qb.push(" AND category_id = ").push_bind(category_id);
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        qb.push(" AND name ILIKE ").push_bind(format!("%{search}%"));
    }
    if let Some(min) = filter.min_price {
        qb.push(" AND price >= ").push_bind(min);
    }
    if let Some(max) = filter.max_price {
        qb.push(" AND price <= ").push_bind(max);
    }
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn list(&self, filter: &ProductFilter, page: Pagination) -> Result<(Vec<Product>, i64)> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products");
        push_filters(&mut count, filter);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM products");
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ").push_bind(page.limit());
        qb.push(" OFFSET ").push_bind(page.offset());
        let mut products = qb.build_query_as::<Product>().fetch_all(&self.pool).await?;

        let mut conn = self.pool.acquire().await?;
        attach_images(&mut conn, &mut products).await?;
        Ok((products, total))
    }

    async fn find(&self, id: Uuid) -> Result<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        let products = fetch_by_ids(&mut conn, &[id]).await?;
        Ok(products.into_values().next())
    }

    async fn create(&self, product: NewProduct, now: DateTime<Utc>) -> Result<Product> {
        let mut tx = self.pool.begin().await?;
        let mut created = sqlx::query_as::<_, Product>(
            "INSERT INTO products (id, category_id, name, description, price, stock_count, is_active, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, TRUE, $7, $7) RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(product.category_id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.stock_count)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        for (position, url) in product.image_urls.iter().enumerate() {
            let image = sqlx::query_as::<_, ProductImage>(
                "INSERT INTO product_images (id, product_id, url, alt_text, position) VALUES ($1, $2, $3, $4, $5) RETURNING *",
            )
            .bind(Uuid::now_v7())
            .bind(created.id)
            .bind(url)
            .bind(&product.name)
            .bind(i32::try_from(position).unwrap_or(i32::MAX))
            .fetch_one(&mut *tx)
            .await?;
            created.images.push(image);
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn update(&self, id: Uuid, changes: ProductChanges, now: DateTime<Utc>) -> Result<Option<Product>> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE products SET updated_at = ");
        qb.push_bind(now);
        if let Some(name) = changes.name { qb.push(", name = ").push_bind(name); }
        if let Some(description) = changes.description { qb.push(", description = ").push_bind(description); }
        if let Some(price) = changes.price { qb.push(", price = ").push_bind(price); }
        if let Some(stock) = changes.stock_count { qb.push(", stock_count = ").push_bind(stock); }
        if let Some(category_id) = changes.category_id { qb.push(", category_id = ").push_bind(category_id); }
        qb.push(" WHERE id = ").push_bind(id).push(" AND deleted_at IS NULL RETURNING id");

        let updated = qb.build_query_scalar::<Uuid>().fetch_optional(&self.pool).await?;
        match updated {
            Some(id) => self.find(id).await,
            None => Ok(None),
        }
    }

    async fn toggle_active(&self, id: Uuid, now: DateTime<Utc>) -> Result<Option<Product>> {
        let updated = sqlx::query_scalar::<_, Uuid>(
            "UPDATE products SET is_active = NOT is_active, updated_at = $2 WHERE id = $1 AND deleted_at IS NULL RETURNING id",
        )
        .bind(id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        match updated {
            Some(id) => self.find(id).await,
            None => Ok(None),
        }
    }

    async fn soft_delete(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE products SET deleted_at = $2, is_active = FALSE, updated_at = $2 WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(categories)
    }

    async fn create_category(&self, name: &str, now: DateTime<Utc>) -> Result<Category> {
        sqlx::query_as::<_, Category>("INSERT INTO categories (id, name, created_at) VALUES ($1, $2, $3) RETURNING *")
            .bind(Uuid::now_v7())
            .bind(name)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, "category already exists"))
    }
}

/// Loads products (any visibility) with their images.
pub(crate) async fn fetch_by_ids(conn: &mut PgConnection, ids: &[Uuid]) -> Result<HashMap<Uuid, Product>> {
    let mut products = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(&mut *conn)
        .await?;
    attach_images(conn, &mut products).await?;
    Ok(products.into_iter().map(|p| (p.id, p)).collect())
}

/// Row-locks the products in ascending id order. Must run inside a transaction.
pub(crate) async fn lock_for_update(conn: &mut PgConnection, ids: &[Uuid]) -> Result<HashMap<Uuid, Product>> {
    let mut sorted = ids.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut products = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ANY($1) ORDER BY id FOR UPDATE")
        .bind(&sorted)
        .fetch_all(&mut *conn)
        .await?;
    attach_images(conn, &mut products).await?;
    Ok(products.into_iter().map(|p| (p.id, p)).collect())
}

/// Writes back stock counts changed in memory, in ascending id order.
pub(crate) async fn write_stock(conn: &mut PgConnection, products: &HashMap<Uuid, Product>, now: DateTime<Utc>) -> Result<()> {
    let mut ids: Vec<&Uuid> = products.keys().collect();
    ids.sort_unstable();
    for id in ids {
        sqlx::query("UPDATE products SET stock_count = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(products[id].stock_count)
            .bind(now)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

pub(crate) async fn attach_images(conn: &mut PgConnection, products: &mut [Product]) -> Result<()> {
    if products.is_empty() { return Ok(()); }
    let ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
    let images = sqlx::query_as::<_, ProductImage>(
        "SELECT * FROM product_images WHERE product_id = ANY($1) ORDER BY position, id",
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut by_product: HashMap<Uuid, Vec<ProductImage>> = HashMap::new();
    for image in images {
        by_product.entry(image.product_id).or_default().push(image);
    }
    for product in products.iter_mut() {
        product.images = by_product.remove(&product.id).unwrap_or_default();
    }
    Ok(())
}

//! Order storage
//!
//! Every mutating method is one transaction: lock the rows, run the domain
//! operation, write back, commit. Any early return drops the transaction,
//! which rolls it back.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{carts, products};
use crate::domain::aggregates::{
    merge_restorations, Checkout, ItemCancellation, Order, OrderError, OrderItem, OrderLine, OrderStatus,
    StockRestoration,
};
use crate::domain::value_objects::Pagination;
use crate::Result;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderSource {
    /// Every item currently in the user's cart.
    Cart,
    Single(OrderLine),
}

#[derive(Clone, Debug)]
pub struct PlaceOrder { pub user_id: Uuid, pub checkout: Checkout, pub source: OrderSource }

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Newest first, items oldest first.
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>>;
    async fn list_all(&self, status: Option<OrderStatus>, page: Pagination) -> Result<(Vec<Order>, i64)>;
    async fn find(&self, order_id: Uuid) -> Result<Option<Order>>;
    async fn place(&self, request: PlaceOrder, now: DateTime<Utc>) -> Result<Order>;
    async fn cancel_item(&self, item_id: Uuid, now: DateTime<Utc>) -> Result<(Order, ItemCancellation)>;
    async fn cancel(&self, order_id: Uuid, now: DateTime<Utc>) -> Result<Order>;
    /// Returns the updated order and the status it moved from.
    async fn advance(&self, order_id: Uuid, target: OrderStatus, now: DateTime<Utc>) -> Result<(Order, OrderStatus)>;
}

pub struct PgOrderRepository { pool: PgPool }

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
        let mut conn = self.pool.acquire().await?;
        let mut orders = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC")
            .bind(user_id)
            .fetch_all(&mut *conn)
            .await?;
        attach_items(&mut conn, &mut orders).await?;
        Ok(orders)
    }

    async fn list_all(&self, status: Option<OrderStatus>, page: Pagination) -> Result<(Vec<Order>, i64)> {
        let push_filter = |qb: &mut QueryBuilder<'_, Postgres>| {
            if let Some(status) = status {
                qb.push(" WHERE status = ").push_bind(status.as_str());
            }
        };

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM orders");
        push_filter(&mut count);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM orders");
        push_filter(&mut qb);
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ").push_bind(page.limit());
        qb.push(" OFFSET ").push_bind(page.offset());

        let mut conn = self.pool.acquire().await?;
        let mut orders = qb.build_query_as::<Order>().fetch_all(&mut *conn).await?;
        attach_items(&mut conn, &mut orders).await?;
        Ok((orders, total))
    }

    async fn find(&self, order_id: Uuid) -> Result<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
            .bind(order_id)
            .fetch_optional(&mut *conn)
            .await?;
        let Some(order) = order else { return Ok(None) };
        let mut orders = vec![order];
        attach_items(&mut conn, &mut orders).await?;
        Ok(orders.pop())
    }

    async fn place(&self, request: PlaceOrder, now: DateTime<Utc>) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        let (lines, consumed) = match request.source {
            OrderSource::Cart => {
                let items = carts::lock_user_items(&mut tx, request.user_id).await?;
                let lines: Vec<OrderLine> = items.iter().map(|i| OrderLine { product_id: i.product_id, quantity: i.quantity }).collect();
                let ids: Vec<Uuid> = items.iter().map(|i| i.id).collect();
                (lines, ids)
            }
            OrderSource::Single(line) => (vec![line], Vec::new()),
        };

        let product_ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
        let mut locked = products::lock_for_update(&mut tx, &product_ids).await?;
        let order = Order::place(request.user_id, &request.checkout, &lines, &mut locked, now)?;

        insert_order(&mut tx, &order).await?;
        products::write_stock(&mut tx, &locked, now).await?;
        carts::delete_items(&mut tx, &consumed).await?;

        tx.commit().await?;
        Ok(order)
    }

    async fn cancel_item(&self, item_id: Uuid, now: DateTime<Utc>) -> Result<(Order, ItemCancellation)> {
        let mut tx = self.pool.begin().await?;

        let order_id = sqlx::query_scalar::<_, Uuid>("SELECT order_id FROM order_items WHERE id = $1")
            .bind(item_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(OrderError::ItemNotFound(item_id))?;
        let mut order = lock_order(&mut tx, order_id).await?;

        let outcome = order.cancel_item(item_id, now)?;

        sqlx::query("UPDATE order_items SET cancelled_at = $2 WHERE id = $1")
            .bind(item_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        update_order_state(&mut tx, &order).await?;
        if let Some(restoration) = outcome.restoration {
            restore_stock(&mut tx, &[restoration], now).await?;
        }

        tx.commit().await?;
        Ok((order, outcome))
    }

    async fn cancel(&self, order_id: Uuid, now: DateTime<Utc>) -> Result<Order> {
        let mut tx = self.pool.begin().await?;
        let mut order = lock_order(&mut tx, order_id).await?;

        let restorations = order.cancel(now)?;

        sqlx::query("UPDATE order_items SET cancelled_at = $2 WHERE order_id = $1 AND cancelled_at IS NULL")
            .bind(order_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        update_order_state(&mut tx, &order).await?;
        restore_stock(&mut tx, &restorations, now).await?;

        tx.commit().await?;
        Ok(order)
    }

    async fn advance(&self, order_id: Uuid, target: OrderStatus, now: DateTime<Utc>) -> Result<(Order, OrderStatus)> {
        let mut tx = self.pool.begin().await?;
        let mut order = lock_order(&mut tx, order_id).await?;

        let from = order.status;
        order.advance_to(target, now)?;
        update_order_state(&mut tx, &order).await?;

        tx.commit().await?;
        Ok((order, from))
    }
}

/// Locks the order row and loads its items.
async fn lock_order(conn: &mut PgConnection, order_id: Uuid) -> Result<Order> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
        .bind(order_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| crate::EcommerceError::NotFound("order not found".into()))?;
    let mut orders = vec![order];
    attach_items(conn, &mut orders).await?;
    orders.pop().ok_or_else(|| crate::EcommerceError::NotFound("order not found".into()))
}

async fn attach_items(conn: &mut PgConnection, orders: &mut [Order]) -> Result<()> {
    if orders.is_empty() { return Ok(()); }
    let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let items = sqlx::query_as::<_, OrderItem>("SELECT * FROM order_items WHERE order_id = ANY($1) ORDER BY created_at, id")
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await?;

    let mut by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for item in items {
        by_order.entry(item.order_id).or_default().push(item);
    }
    for order in orders.iter_mut() {
        order.items = by_order.remove(&order.id).unwrap_or_default();
    }
    Ok(())
}

async fn insert_order(conn: &mut PgConnection, order: &Order) -> Result<()> {
    sqlx::query(
        "INSERT INTO orders (id, user_id, total_amount, status, payment_method, shipping_address, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(order.id)
    .bind(order.user_id)
    .bind(order.total_amount)
    .bind(order.status.as_str())
    .bind(&order.payment_method)
    .bind(&order.shipping_address)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *conn)
    .await?;

    for item in &order.items {
        sqlx::query(
            "INSERT INTO order_items (id, order_id, product_id, product_name, product_image, quantity, unit_price, total_price, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(item.id)
        .bind(item.order_id)
        .bind(item.product_id)
        .bind(&item.product_name)
        .bind(&item.product_image)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.total_price)
        .bind(item.created_at)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn update_order_state(conn: &mut PgConnection, order: &Order) -> Result<()> {
    sqlx::query("UPDATE orders SET status = $2, updated_at = $3, cancelled_at = $4 WHERE id = $1")
        .bind(order.id)
        .bind(order.status.as_str())
        .bind(order.updated_at)
        .bind(order.cancelled_at)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Adds stock back in ascending product id order. Rows deleted since the
/// order was placed are skipped by the `UPDATE` matching nothing.
async fn restore_stock(conn: &mut PgConnection, restorations: &[StockRestoration], now: DateTime<Utc>) -> Result<()> {
    for r in merge_restorations(restorations) {
        sqlx::query("UPDATE products SET stock_count = stock_count + $2, updated_at = $3 WHERE id = $1")
            .bind(r.product_id)
            .bind(r.quantity)
            .bind(now)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

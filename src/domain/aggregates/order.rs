//! Order Aggregate
//!
//! Placement, cancellation and status transitions are pure functions over the
//! aggregate and the product rows it touches. Repositories load and lock the
//! rows, call into this module, and persist whatever it changed inside the
//! same transaction.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::product::{Product, ProductError};

/// Orders may be cancelled for this many hours after they were placed.
pub const CANCELLATION_WINDOW_HOURS: i64 = 24;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus { #[default] Pending, Processing, Shipped, Delivered, Cancelled }

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// The only state a forced transition may move to from here.
    pub fn next(&self) -> Option<OrderStatus> {
        match self {
            Self::Pending => Some(Self::Processing),
            Self::Processing => Some(Self::Shipped),
            Self::Shipped => Some(Self::Delivered),
            Self::Delivered | Self::Cancelled => None,
        }
    }

    /// Parses a requested transition target. Only forward states are accepted;
    /// `pending` is never a target and `cancelled` goes through cancellation.
    pub fn parse_target(value: &str) -> Result<OrderStatus, OrderError> {
        match value.parse::<OrderStatus>() {
            Ok(s @ (Self::Processing | Self::Shipped | Self::Delivered)) => Ok(s),
            _ => Err(OrderError::InvalidStatus(value.to_string())),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for OrderStatus {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(OrderError::InvalidStatus(other.to_string())),
        }
    }
}

impl TryFrom<String> for OrderStatus {
    type Error = OrderError;
    fn try_from(value: String) -> Result<Self, Self::Error> { value.parse() }
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_amount: i64,
    #[sqlx(try_from = "String")]
    pub status: OrderStatus,
    pub payment_method: String,
    pub shipping_address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
    #[sqlx(skip)]
    #[serde(rename = "order_items", default)]
    pub items: Vec<OrderItem>,
}

/// A purchased line. Name, image and prices are copied from the product at
/// placement time so later catalog edits never rewrite order history.
#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    /// `None` once the product row has been hard-deleted.
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub product_image: Option<String>,
    pub quantity: i32,
    pub unit_price: i64,
    pub total_price: i64,
    pub created_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl OrderItem {
    pub fn is_cancelled(&self) -> bool { self.cancelled_at.is_some() }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrderLine { pub product_id: Uuid, pub quantity: i32 }

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Checkout { pub shipping_address: String, pub payment_method: String }

/// Stock to hand back to a product after a cancellation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StockRestoration { pub product_id: Uuid, pub quantity: i32 }

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ItemCancellation { pub restoration: Option<StockRestoration>, pub order_cancelled: bool }

impl Order {
    /// Builds a pending order from `lines`, reserving stock on the (already
    /// locked) `products`. Prices come from the product rows, not from any
    /// earlier cart snapshot. On error the caller must discard `products`.
    pub fn place(
        user_id: Uuid,
        checkout: &Checkout,
        lines: &[OrderLine],
        products: &mut HashMap<Uuid, Product>,
        now: DateTime<Utc>,
    ) -> Result<Order, OrderError> {
        if lines.is_empty() { return Err(OrderError::EmptyCart); }

        let order_id = Uuid::now_v7();
        let mut items = Vec::with_capacity(lines.len());
        let mut total: i64 = 0;

        for line in lines {
            let product = products.get_mut(&line.product_id).ok_or(OrderError::ProductNotFound(line.product_id))?;
            if !product.is_available() {
                return Err(ProductError::Unavailable { product: product.name.clone() }.into());
            }
            product.reserve(line.quantity)?;

            let line_total = product.price.checked_mul(i64::from(line.quantity)).ok_or(OrderError::AmountOverflow)?;
            total = total.checked_add(line_total).ok_or(OrderError::AmountOverflow)?;
            items.push(OrderItem {
                id: Uuid::now_v7(),
                order_id,
                product_id: Some(product.id),
                product_name: product.name.clone(),
                product_image: product.primary_image().map(str::to_string),
                quantity: line.quantity,
                unit_price: product.price,
                total_price: line_total,
                created_at: now,
                cancelled_at: None,
            });
        }

        Ok(Order {
            id: order_id, user_id, total_amount: total, status: OrderStatus::Pending,
            payment_method: checkout.payment_method.clone(), shipping_address: checkout.shipping_address.clone(),
            created_at: now, updated_at: now, cancelled_at: None, items,
        })
    }

    pub fn live_items(&self) -> impl Iterator<Item = &OrderItem> { self.items.iter().filter(|i| !i.is_cancelled()) }

    /// An order can be cancelled while pending and at most
    /// [`CANCELLATION_WINDOW_HOURS`] after placement.
    pub fn ensure_cancellable(&self, now: DateTime<Utc>) -> Result<(), OrderError> {
        if self.status != OrderStatus::Pending {
            return Err(OrderError::NotPending { status: self.status });
        }
        let elapsed = now.signed_duration_since(self.created_at);
        if elapsed > Duration::hours(CANCELLATION_WINDOW_HOURS) {
            return Err(OrderError::WindowExpired { hours_elapsed: elapsed.num_hours() });
        }
        Ok(())
    }

    /// Cancels one line. Cancelling the last live line cancels the order.
    pub fn cancel_item(&mut self, item_id: Uuid, now: DateTime<Utc>) -> Result<ItemCancellation, OrderError> {
        self.ensure_cancellable(now)?;
        let item = self.items.iter_mut().find(|i| i.id == item_id).ok_or(OrderError::ItemNotFound(item_id))?;
        if item.is_cancelled() { return Err(OrderError::ItemAlreadyCancelled); }

        item.cancelled_at = Some(now);
        let restoration = item.product_id.map(|product_id| StockRestoration { product_id, quantity: item.quantity });

        let order_cancelled = self.live_items().next().is_none();
        if order_cancelled {
            self.status = OrderStatus::Cancelled;
            self.cancelled_at = Some(now);
        }
        self.updated_at = now;
        Ok(ItemCancellation { restoration, order_cancelled })
    }

    /// Cancels every live line and the order itself, returning the stock to
    /// put back. Lines cancelled earlier keep their original timestamp.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<Vec<StockRestoration>, OrderError> {
        self.ensure_cancellable(now)?;
        let mut restorations = Vec::new();
        for item in self.items.iter_mut().filter(|i| !i.is_cancelled()) {
            item.cancelled_at = Some(now);
            if let Some(product_id) = item.product_id {
                restorations.push(StockRestoration { product_id, quantity: item.quantity });
            }
        }
        self.status = OrderStatus::Cancelled;
        self.cancelled_at = Some(now);
        self.updated_at = now;
        Ok(restorations)
    }

    /// Forced one-step forward transition.
    pub fn advance_to(&mut self, target: OrderStatus, now: DateTime<Utc>) -> Result<(), OrderError> {
        if self.status == OrderStatus::Delivered { return Err(OrderError::Delivered); }
        if self.status.next() != Some(target) {
            return Err(OrderError::InvalidTransition { from: self.status, to: target });
        }
        self.status = target;
        self.updated_at = now;
        Ok(())
    }
}

/// Merges restorations for the same product so each row is updated once.
pub fn merge_restorations(restorations: &[StockRestoration]) -> Vec<StockRestoration> {
    let mut merged: Vec<StockRestoration> = Vec::new();
    for r in restorations {
        match merged.iter_mut().find(|m| m.product_id == r.product_id) {
            Some(m) => m.quantity += r.quantity,
            None => merged.push(*r),
        }
    }
    merged.sort_by_key(|r| r.product_id);
    merged
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("cart is empty")]
    EmptyCart,
    #[error("product {0} not found")]
    ProductNotFound(Uuid),
    #[error(transparent)]
    Product(#[from] ProductError),
    #[error("order total is out of range")]
    AmountOverflow,
    #[error("cannot cancel - order status is '{status}'. Only 'pending' orders can be cancelled")]
    NotPending { status: OrderStatus },
    #[error("cancellation period expired - orders can only be cancelled within {window} hours (order placed {hours_elapsed} hours ago)", window = CANCELLATION_WINDOW_HOURS)]
    WindowExpired { hours_elapsed: i64 },
    #[error("order item {0} not found")]
    ItemNotFound(Uuid),
    #[error("order item already cancelled")]
    ItemAlreadyCancelled,
    #[error("cannot modify delivered order")]
    Delivered,
    #[error("invalid status value: {0}")]
    InvalidStatus(String),
    #[error("invalid transition {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
}

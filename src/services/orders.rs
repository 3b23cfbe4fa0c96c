//! Order lifecycle: placement, cancellation and admin status updates.

use std::sync::Arc;

use tracing::instrument;
use uuid::Uuid;

use super::{spawn_detached, Clock, EventPublisher};
use crate::domain::aggregates::{Checkout, ItemCancellation, Order, OrderLine, OrderStatus};
use crate::domain::events::OrderEvent;
use crate::domain::value_objects::{PaginatedResponse, Pagination};
use crate::repositories::{OrderRepository, OrderSource, PlaceOrder};
use crate::{EcommerceError, Result};

pub const MAX_PAYMENT_METHOD_LEN: usize = 20;

#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    events: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
}

impl OrderService {
    pub fn new(orders: Arc<dyn OrderRepository>, events: Arc<dyn EventPublisher>, clock: Arc<dyn Clock>) -> Self {
        Self { orders, events, clock }
    }

    #[instrument(skip(self, checkout))]
    pub async fn place_from_cart(&self, user_id: Uuid, checkout: Checkout) -> Result<Order> {
        self.place(PlaceOrder { user_id, checkout: validate_checkout(checkout)?, source: OrderSource::Cart }).await
    }

    #[instrument(skip(self, checkout))]
    pub async fn place_single(&self, user_id: Uuid, product_id: Uuid, quantity: i32, checkout: Checkout) -> Result<Order> {
        if quantity < 1 {
            return Err(EcommerceError::Validation("quantity must be at least 1".into()));
        }
        let source = OrderSource::Single(OrderLine { product_id, quantity });
        self.place(PlaceOrder { user_id, checkout: validate_checkout(checkout)?, source }).await
    }

    async fn place(&self, request: PlaceOrder) -> Result<Order> {
        let order = self.orders.place(request, self.clock.now()).await?;
        tracing::info!(order_id = %order.id, total = order.total_amount, items = order.items.len(), "order placed");
        self.publish(OrderEvent::placed(&order));
        Ok(order)
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> { self.orders.list_for_user(user_id).await }

    pub async fn list_all(&self, status: Option<&str>, page: Pagination) -> Result<PaginatedResponse<Order>> {
        let status = status.map(str::parse::<OrderStatus>).transpose()?;
        let (data, total) = self.orders.list_all(status, page).await?;
        Ok(PaginatedResponse { data, total, page: page.page() })
    }

    /// Owners only; anyone else sees "not found".
    pub async fn get_for_user(&self, user_id: Uuid, order_id: Uuid) -> Result<Order> {
        self.orders
            .find(order_id)
            .await?
            .filter(|o| o.user_id == user_id)
            .ok_or_else(|| EcommerceError::NotFound("order not found".into()))
    }

    /// Cancels one line and restores its stock. Cancelling the last live line
    /// cancels the whole order.
    #[instrument(skip(self))]
    pub async fn cancel_item(&self, item_id: Uuid) -> Result<(Order, ItemCancellation)> {
        let (order, outcome) = self.orders.cancel_item(item_id, self.clock.now()).await?;
        tracing::info!(order_id = %order.id, %item_id, order_cancelled = outcome.order_cancelled, "order item cancelled");
        self.publish(OrderEvent::ItemCancelled { order_id: order.id, item_id, order_cancelled: outcome.order_cancelled });
        Ok((order, outcome))
    }

    #[instrument(skip(self))]
    pub async fn cancel(&self, user_id: Uuid, order_id: Uuid) -> Result<Order> {
        let existing = self.orders.find(order_id).await?.ok_or_else(|| EcommerceError::NotFound("order not found".into()))?;
        if existing.user_id != user_id {
            return Err(EcommerceError::Forbidden("this order does not belong to you".into()));
        }

        let order = self.orders.cancel(order_id, self.clock.now()).await?;
        tracing::info!(order_id = %order.id, "order cancelled");
        self.publish(OrderEvent::Cancelled { order_id: order.id, user_id: order.user_id });
        Ok(order)
    }

    /// Admin-only forced transition to the next workflow state.
    #[instrument(skip(self))]
    pub async fn update_status(&self, order_id: Uuid, status: &str) -> Result<Order> {
        let target = OrderStatus::parse_target(status)?;
        let (order, from) = self.orders.advance(order_id, target, self.clock.now()).await?;
        tracing::info!(order_id = %order.id, %from, to = %order.status, "order status changed");
        self.publish(OrderEvent::StatusChanged { order_id: order.id, from, to: order.status });
        Ok(order)
    }

    fn publish(&self, event: OrderEvent) {
        let events = Arc::clone(&self.events);
        spawn_detached("publish_order_event", async move { events.publish(&event).await });
    }
}

fn validate_checkout(checkout: Checkout) -> Result<Checkout> {
    let shipping_address = checkout.shipping_address.trim().to_string();
    let payment_method = checkout.payment_method.trim().to_string();
    if shipping_address.is_empty() {
        return Err(EcommerceError::Validation("shipping address is required".into()));
    }
    if payment_method.is_empty() {
        return Err(EcommerceError::Validation("payment method is required".into()));
    }
    if payment_method.chars().count() > MAX_PAYMENT_METHOD_LEN {
        return Err(EcommerceError::Validation(format!("payment method must be at most {MAX_PAYMENT_METHOD_LEN} characters")));
    }
    Ok(Checkout { shipping_address, payment_method })
}

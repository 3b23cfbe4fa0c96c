//! Domain events, published after the owning transaction commits
use crate::domain::aggregates::{Order, OrderStatus};
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { order_id: Uuid, user_id: Uuid, total_amount: i64, items: usize },
    ItemCancelled { order_id: Uuid, item_id: Uuid, order_cancelled: bool },
    Cancelled { order_id: Uuid, user_id: Uuid },
    StatusChanged { order_id: Uuid, from: OrderStatus, to: OrderStatus },
}

impl OrderEvent {
    pub fn placed(order: &Order) -> Self {
        Self::Placed { order_id: order.id, user_id: order.user_id, total_amount: order.total_amount, items: order.items.len() }
    }

    pub fn order_id(&self) -> Uuid {
        match self {
            Self::Placed { order_id, .. } | Self::ItemCancelled { order_id, .. }
            | Self::Cancelled { order_id, .. } | Self::StatusChanged { order_id, .. } => *order_id,
        }
    }

    /// Message subject, e.g. `orders.placed`.
    pub fn subject(&self) -> String {
        let kind = match self {
            Self::Placed { .. } => "placed",
            Self::ItemCancelled { .. } => "item_cancelled",
            Self::Cancelled { .. } => "cancelled",
            Self::StatusChanged { .. } => "status_changed",
        };
        format!("orders.{kind}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_and_payload() {
        let id = Uuid::now_v7();
        let event = OrderEvent::StatusChanged { order_id: id, from: OrderStatus::Pending, to: OrderStatus::Processing };
        assert_eq!(event.subject(), "orders.status_changed");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "status_changed");
        assert_eq!(json["to"], "processing");
        assert_eq!(event.order_id(), id);
    }
}

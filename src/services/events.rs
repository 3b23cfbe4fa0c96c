//! Order event publishing

use async_trait::async_trait;

use crate::domain::events::OrderEvent;
use crate::{EcommerceError, Result};

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &OrderEvent) -> Result<()>;
}

/// Publishes JSON payloads to NATS under `orders.<kind>`.
pub struct NatsPublisher { client: async_nats::Client }

impl NatsPublisher {
    pub fn new(client: async_nats::Client) -> Self { Self { client } }
}

#[async_trait]
impl EventPublisher for NatsPublisher {
    async fn publish(&self, event: &OrderEvent) -> Result<()> {
        let payload = serde_json::to_vec(event).map_err(|e| EcommerceError::Internal(e.to_string()))?;
        self.client
            .publish(event.subject(), payload.into())
            .await
            .map_err(|e| EcommerceError::Internal(format!("nats publish failed: {e}")))
    }
}

/// Used when no broker is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogPublisher;

#[async_trait]
impl EventPublisher for LogPublisher {
    async fn publish(&self, event: &OrderEvent) -> Result<()> {
        tracing::info!(subject = %event.subject(), order_id = %event.order_id(), "order event");
        Ok(())
    }
}

//! # Broker Trait
//!
//! Provider seam for the AMQP broker: the schedule service and the outbox
//! relay hold an `Arc<dyn Broker>` and stay agnostic of whether they are
//! talking to a live broker or the in-memory double used in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use super::errors::BrokerResult;

/// Exchange metadata as reported by the broker's management interface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeInfo {
    pub name: String,
    #[serde(default)]
    pub vhost: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub durable: bool,
}

/// Queue metadata as reported by the broker's management interface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueInfo {
    pub name: String,
    #[serde(default)]
    pub vhost: String,
    #[serde(default)]
    pub durable: bool,
    /// Ready message count; the management API omits it briefly after
    /// declaration, so default to zero
    #[serde(default)]
    pub messages: u64,
}

/// Abstract broker operations
///
/// All declarations are durable and idempotent: redeclaring an existing
/// entity with the same properties succeeds, a conflicting redeclare is a
/// topology error. Publishes are persistent (survive broker restart) and
/// confirmed before returning.
#[async_trait]
pub trait Broker: Send + Sync + fmt::Debug {
    /// Declare a durable direct exchange
    async fn create_exchange(&self, name: &str) -> BrokerResult<()>;

    /// Declare a durable queue
    async fn create_queue(&self, name: &str) -> BrokerResult<()>;

    /// Bind a queue to an exchange; the routing key may be empty
    async fn bind_queue(&self, queue: &str, exchange: &str, routing_key: &str)
        -> BrokerResult<()>;

    /// Publish a JSON payload and wait for broker confirmation.
    ///
    /// An empty exchange name routes through the default exchange, where the
    /// routing key addresses a queue directly.
    async fn publish(&self, exchange: &str, routing_key: &str, payload: &Value)
        -> BrokerResult<()>;

    /// List exchanges known to the broker
    async fn list_exchanges(&self) -> BrokerResult<Vec<ExchangeInfo>>;

    /// List queues known to the broker
    async fn list_queues(&self) -> BrokerResult<Vec<QueueInfo>>;

    /// Check broker connectivity
    async fn health_check(&self) -> BrokerResult<bool>;

    /// Release the underlying connection; subsequent calls may reconnect
    async fn close(&self) -> BrokerResult<()>;

    /// Provider name for logging
    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_info_decodes_management_shape() {
        let json = r#"{"name": "notifications", "vhost": "/", "type": "direct", "durable": true, "auto_delete": false}"#;
        let info: ExchangeInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.name, "notifications");
        assert_eq!(info.kind, "direct");
        assert!(info.durable);
    }

    #[test]
    fn test_queue_info_defaults_missing_counts() {
        let json = r#"{"name": "schedule_queue", "vhost": "/", "durable": true}"#;
        let info: QueueInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.name, "schedule_queue");
        assert_eq!(info.messages, 0);
    }
}

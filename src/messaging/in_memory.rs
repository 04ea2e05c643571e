//! # In-Memory Broker
//!
//! Test and development double for the AMQP broker. Enforces the same
//! topology rules as the real client (binding or publishing against a
//! missing exchange is a topology error) and records every publish so tests
//! can assert exactly what went out. Publish failures can be injected to
//! exercise the partial-failure path.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use super::broker::{Broker, ExchangeInfo, QueueInfo};
use super::errors::{BrokerError, BrokerResult};

/// A message recorded by the in-memory broker
#[derive(Debug, Clone)]
pub struct PublishedMessage {
    pub exchange: String,
    pub routing_key: String,
    pub payload: Value,
}

#[derive(Debug, Default)]
struct Topology {
    exchanges: HashSet<String>,
    queues: HashSet<String>,
    /// (queue, exchange, routing_key)
    bindings: HashSet<(String, String, String)>,
    queue_depths: HashMap<String, u64>,
    published: Vec<PublishedMessage>,
}

/// In-memory `Broker` implementation
///
/// ```
/// use courier_core::messaging::{Broker, InMemoryBroker};
///
/// # tokio_test::block_on(async {
/// let broker = InMemoryBroker::new();
/// broker.create_queue("schedule_queue").await.unwrap();
/// broker.publish("", "schedule_queue", &serde_json::json!({"id": 1})).await.unwrap();
///
/// assert_eq!(broker.publish_count().await, 1);
/// # });
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBroker {
    state: RwLock<Topology>,
    fail_publishes: AtomicBool,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent publishes fail with `BrokerError::Unavailable`
    pub fn set_publish_failures(&self, enabled: bool) {
        self.fail_publishes.store(enabled, Ordering::SeqCst);
    }

    /// All messages published so far, in order
    pub async fn published_messages(&self) -> Vec<PublishedMessage> {
        self.state.read().await.published.clone()
    }

    /// Number of publishes accepted so far
    pub async fn publish_count(&self) -> usize {
        self.state.read().await.published.len()
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn create_exchange(&self, name: &str) -> BrokerResult<()> {
        let mut state = self.state.write().await;
        state.exchanges.insert(name.to_string());
        Ok(())
    }

    async fn create_queue(&self, name: &str) -> BrokerResult<()> {
        let mut state = self.state.write().await;
        state.queues.insert(name.to_string());
        state.queue_depths.entry(name.to_string()).or_insert(0);
        Ok(())
    }

    async fn bind_queue(
        &self,
        queue: &str,
        exchange: &str,
        routing_key: &str,
    ) -> BrokerResult<()> {
        let mut state = self.state.write().await;

        if !state.exchanges.contains(exchange) {
            return Err(BrokerError::binding(
                format!("{queue} -> {exchange}"),
                format!("exchange '{exchange}' does not exist"),
            ));
        }
        if !state.queues.contains(queue) {
            return Err(BrokerError::binding(
                format!("{queue} -> {exchange}"),
                format!("queue '{queue}' does not exist"),
            ));
        }

        state.bindings.insert((
            queue.to_string(),
            exchange.to_string(),
            routing_key.to_string(),
        ));
        Ok(())
    }

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: &Value,
    ) -> BrokerResult<()> {
        if self.fail_publishes.load(Ordering::SeqCst) {
            return Err(BrokerError::unavailable("injected publish failure"));
        }

        let mut state = self.state.write().await;

        // Routing mirrors AMQP: the default exchange routes straight to the
        // queue named by the routing key; named exchanges must exist and
        // deliver along matching bindings.
        if exchange.is_empty() {
            if state.queues.contains(routing_key) {
                *state.queue_depths.entry(routing_key.to_string()).or_insert(0) += 1;
            }
        } else {
            if !state.exchanges.contains(exchange) {
                return Err(BrokerError::exchange(
                    exchange,
                    "publish to undeclared exchange",
                ));
            }
            let routed: Vec<String> = state
                .bindings
                .iter()
                .filter(|(_, ex, rk)| ex == exchange && rk == routing_key)
                .map(|(queue, _, _)| queue.clone())
                .collect();
            for queue in routed {
                *state.queue_depths.entry(queue).or_insert(0) += 1;
            }
        }

        state.published.push(PublishedMessage {
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
            payload: payload.clone(),
        });
        Ok(())
    }

    async fn list_exchanges(&self) -> BrokerResult<Vec<ExchangeInfo>> {
        let state = self.state.read().await;
        let mut exchanges: Vec<ExchangeInfo> = state
            .exchanges
            .iter()
            .map(|name| ExchangeInfo {
                name: name.clone(),
                vhost: "/".to_string(),
                kind: "direct".to_string(),
                durable: true,
            })
            .collect();
        exchanges.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(exchanges)
    }

    async fn list_queues(&self) -> BrokerResult<Vec<QueueInfo>> {
        let state = self.state.read().await;
        let mut queues: Vec<QueueInfo> = state
            .queues
            .iter()
            .map(|name| QueueInfo {
                name: name.clone(),
                vhost: "/".to_string(),
                durable: true,
                messages: state.queue_depths.get(name).copied().unwrap_or(0),
            })
            .collect();
        queues.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(queues)
    }

    async fn health_check(&self) -> BrokerResult<bool> {
        Ok(true)
    }

    async fn close(&self) -> BrokerResult<()> {
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "in_memory"
    }
}

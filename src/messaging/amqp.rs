//! # AMQP Broker Client
//!
//! `Broker` implementation backed by the `lapin` crate (AMQP 0.9.1).
//!
//! One connection and one channel are shared across the process. The channel
//! lives behind a `tokio::sync::Mutex`, so declares and publishes are
//! serialized; interleaving protocol frames from concurrent callers would
//! corrupt the session. A dead connection or channel is detected before each
//! operation and rebuilt rather than failing every subsequent call.
//!
//! All declarations are durable and all publishes use persistent delivery
//! with publisher confirms, so accepted schedule messages survive a broker
//! restart.

use async_trait::async_trait;
use lapin::options::{
    BasicPublishOptions, ConfirmSelectOptions, ExchangeDeclareOptions, QueueBindOptions,
    QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::config::BrokerSettings;

use super::broker::{Broker, ExchangeInfo, QueueInfo};
use super::errors::{BrokerError, BrokerResult};
use super::management::ManagementClient;

/// Live connection state; rebuilt on demand after failures
#[derive(Debug)]
struct BrokerChannel {
    connection: Connection,
    channel: Channel,
}

impl BrokerChannel {
    fn is_usable(&self) -> bool {
        self.connection.status().connected() && self.channel.status().connected()
    }
}

/// AMQP broker client with an explicit connect/close lifecycle
#[derive(Debug)]
pub struct AmqpBroker {
    settings: BrokerSettings,
    state: Mutex<Option<BrokerChannel>>,
    management: ManagementClient,
}

impl AmqpBroker {
    /// Connect to the broker and open the shared channel.
    ///
    /// Fails with `BrokerError::Unavailable` if the broker cannot be
    /// reached; management-API credentials are validated lazily on the
    /// first listing call.
    pub async fn connect(settings: BrokerSettings) -> BrokerResult<Self> {
        let management = ManagementClient::new(&settings)?;
        let state = timeout(settings.publish_timeout(), Self::open_channel(&settings))
            .await
            .map_err(|_| BrokerError::timeout("connect", settings.publish_timeout_ms))??;

        info!(
            url = %settings.redacted_url(),
            "Connected to AMQP broker"
        );

        Ok(Self {
            settings,
            state: Mutex::new(Some(state)),
            management,
        })
    }

    /// Connect using `BrokerSettings::from_env()`
    pub async fn from_env() -> BrokerResult<Self> {
        Self::connect(BrokerSettings::from_env()).await
    }

    async fn open_channel(settings: &BrokerSettings) -> BrokerResult<BrokerChannel> {
        let connection = Connection::connect(
            &settings.url,
            ConnectionProperties::default().with_connection_name("courier-broker".into()),
        )
        .await
        .map_err(|e| BrokerError::unavailable(format!("AMQP connection failed: {e}")))?;

        let channel = connection
            .create_channel()
            .await
            .map_err(|e| BrokerError::unavailable(format!("AMQP channel creation failed: {e}")))?;

        // Confirm mode makes publish acknowledgments meaningful
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .map_err(|e| BrokerError::unavailable(format!("AMQP confirm select failed: {e}")))?;

        Ok(BrokerChannel {
            connection,
            channel,
        })
    }

    /// Run `op` against a usable channel, reconnecting first if the previous
    /// connection or channel has died. The state lock is held for the whole
    /// operation, serializing channel use.
    async fn with_channel<F, Fut, T>(&self, operation: &str, op: F) -> BrokerResult<T>
    where
        F: FnOnce(Channel) -> Fut,
        Fut: std::future::Future<Output = BrokerResult<T>>,
    {
        let mut guard = self.state.lock().await;

        let needs_reconnect = match guard.as_ref() {
            Some(state) => !state.is_usable(),
            None => true,
        };

        if needs_reconnect {
            warn!(operation, "AMQP connection not usable, reconnecting");
            let state = timeout(
                self.settings.publish_timeout(),
                Self::open_channel(&self.settings),
            )
            .await
            .map_err(|_| BrokerError::timeout("reconnect", self.settings.publish_timeout_ms))??;
            *guard = Some(state);
        }

        // Invariant: guard is Some after the reconnect branch
        let channel = match guard.as_ref() {
            Some(state) => state.channel.clone(),
            None => return Err(BrokerError::unavailable("AMQP channel missing")),
        };

        let result = match timeout(self.settings.publish_timeout(), op(channel)).await {
            Ok(result) => result,
            Err(_) => Err(BrokerError::timeout(
                operation,
                self.settings.publish_timeout_ms,
            )),
        };

        // A failed operation may leave the channel closed by the broker;
        // drop it so the next call reconnects.
        if result.is_err() {
            *guard = None;
        }

        result
    }

    /// Conflicting redeclares surface as AMQP 406 PRECONDITION_FAILED
    fn is_precondition_failed(err: &lapin::Error) -> bool {
        let text = err.to_string();
        text.contains("PRECONDITION_FAILED") || text.contains("406")
    }
}

#[async_trait]
impl Broker for AmqpBroker {
    async fn create_exchange(&self, name: &str) -> BrokerResult<()> {
        let exchange = name.to_string();
        self.with_channel("create_exchange", move |channel| async move {
            channel
                .exchange_declare(
                    &exchange,
                    ExchangeKind::Direct,
                    ExchangeDeclareOptions {
                        durable: true,
                        ..Default::default()
                    },
                    FieldTable::default(),
                )
                .await
                .map_err(|e| {
                    if Self::is_precondition_failed(&e) {
                        BrokerError::exchange(&exchange, e.to_string())
                    } else {
                        BrokerError::unavailable(format!("Exchange declare failed: {e}"))
                    }
                })?;

            debug!(exchange = %exchange, "Declared durable exchange");
            Ok(())
        })
        .await
    }

    async fn create_queue(&self, name: &str) -> BrokerResult<()> {
        let queue = name.to_string();
        self.with_channel("create_queue", move |channel| async move {
            channel
                .queue_declare(
                    &queue,
                    QueueDeclareOptions {
                        durable: true,
                        ..Default::default()
                    },
                    FieldTable::default(),
                )
                .await
                .map_err(|e| {
                    if Self::is_precondition_failed(&e) {
                        BrokerError::queue(&queue, e.to_string())
                    } else {
                        BrokerError::unavailable(format!("Queue declare failed: {e}"))
                    }
                })?;

            debug!(queue = %queue, "Declared durable queue");
            Ok(())
        })
        .await
    }

    async fn bind_queue(
        &self,
        queue: &str,
        exchange: &str,
        routing_key: &str,
    ) -> BrokerResult<()> {
        let queue = queue.to_string();
        let exchange = exchange.to_string();
        let routing_key = routing_key.to_string();

        self.with_channel("bind_queue", move |channel| async move {
            channel
                .queue_bind(
                    &queue,
                    &exchange,
                    &routing_key,
                    QueueBindOptions::default(),
                    FieldTable::default(),
                )
                .await
                .map_err(|e| {
                    let text = e.to_string();
                    if text.contains("NOT_FOUND") || text.contains("404") {
                        BrokerError::binding(
                            format!("{queue} -> {exchange}"),
                            format!("exchange or queue absent: {text}"),
                        )
                    } else {
                        BrokerError::unavailable(text)
                    }
                })?;

            debug!(queue = %queue, exchange = %exchange, routing_key = %routing_key, "Bound queue");
            Ok(())
        })
        .await
    }

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: &Value,
    ) -> BrokerResult<()> {
        let bytes = serde_json::to_vec(payload)?;
        let exchange = exchange.to_string();
        let routing_key = routing_key.to_string();

        self.with_channel("publish", move |channel| async move {
            let confirm = channel
                .basic_publish(
                    &exchange,
                    &routing_key,
                    BasicPublishOptions::default(),
                    &bytes,
                    BasicProperties::default()
                        .with_delivery_mode(2) // Persistent
                        .with_content_type("application/json".into()),
                )
                .await
                .map_err(|e| BrokerError::unavailable(format!("Publish failed: {e}")))?;

            confirm.await.map_err(|e| {
                BrokerError::unavailable(format!("Publish confirmation failed: {e}"))
            })?;

            Ok(())
        })
        .await
        .map_err(|e| {
            error!(error = %e, "AMQP publish failed");
            e
        })
    }

    async fn list_exchanges(&self) -> BrokerResult<Vec<ExchangeInfo>> {
        self.management.list_exchanges().await
    }

    async fn list_queues(&self) -> BrokerResult<Vec<QueueInfo>> {
        self.management.list_queues().await
    }

    async fn health_check(&self) -> BrokerResult<bool> {
        let guard = self.state.lock().await;
        Ok(matches!(guard.as_ref(), Some(state) if state.is_usable()))
    }

    async fn close(&self) -> BrokerResult<()> {
        let mut guard = self.state.lock().await;
        if let Some(state) = guard.take() {
            state
                .connection
                .close(0, "courier shutdown")
                .await
                .map_err(|e| BrokerError::unavailable(format!("AMQP close failed: {e}")))?;
            info!("AMQP connection closed");
        }
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "rabbitmq"
    }
}

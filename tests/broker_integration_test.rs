//! # Broker Integration Tests
//!
//! End-to-end flows against live RabbitMQ, plus PostgreSQL for the full
//! service round trip. The management plugin must be enabled for the
//! topology listing assertions.
//!
//! Start the infrastructure with:
//! docker run -d --name courier-mq -p 5672:5672 -p 15672:15672 rabbitmq:3-management
//! docker run -d --name courier-pg -p 5432:5432 \
//!   -e POSTGRES_USER=courier -e POSTGRES_PASSWORD=courier \
//!   -e POSTGRES_DB=courier_development postgres:16

use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use courier_core::database::{DatabaseConnection, DatabaseMigrations};
use courier_core::messaging::{AmqpBroker, Broker};
use courier_core::models::OutboxMessage;
use courier_core::services::{CreateScheduleRequest, ScheduleService};

/// Poll the management API until `predicate` holds or the window closes.
/// Topology and depth listings lag the AMQP operations by a stats interval.
async fn wait_for<F>(mut predicate: F, description: &str)
where
    F: FnMut() -> futures::future::BoxFuture<'static, bool>,
{
    for _ in 0..30 {
        if predicate().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
    panic!("Timed out waiting for {description}");
}

#[tokio::test]
#[ignore = "requires RabbitMQ running"]
async fn test_topology_visible_through_management() {
    let broker = Arc::new(AmqpBroker::from_env().await.unwrap());
    let exchange = format!("courier_it_ex_{}", Uuid::new_v4().simple());
    let queue = format!("courier_it_q_{}", Uuid::new_v4().simple());

    broker.create_exchange(&exchange).await.unwrap();
    broker.create_queue(&queue).await.unwrap();
    broker.bind_queue(&queue, &exchange, "deliver").await.unwrap();

    let broker_for_exchanges = broker.clone();
    let wanted_exchange = exchange.clone();
    wait_for(
        move || {
            let broker = broker_for_exchanges.clone();
            let wanted = wanted_exchange.clone();
            Box::pin(async move {
                broker
                    .list_exchanges()
                    .await
                    .map(|exchanges| {
                        exchanges.iter().any(|e| e.name == wanted && e.durable)
                    })
                    .unwrap_or(false)
            })
        },
        "exchange to appear in management listing",
    )
    .await;

    let broker_for_queues = broker.clone();
    let wanted_queue = queue.clone();
    wait_for(
        move || {
            let broker = broker_for_queues.clone();
            let wanted = wanted_queue.clone();
            Box::pin(async move {
                broker
                    .list_queues()
                    .await
                    .map(|queues| queues.iter().any(|q| q.name == wanted && q.durable))
                    .unwrap_or(false)
            })
        },
        "queue to appear in management listing",
    )
    .await;

    broker.close().await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL and RabbitMQ running"]
async fn test_schedule_flow_against_live_broker() {
    let db = DatabaseConnection::new()
        .await
        .expect("Failed to connect to database");
    let pool = db.pool().clone();
    DatabaseMigrations::run_all(&pool)
        .await
        .expect("Failed to run migrations");

    let broker: Arc<dyn Broker> = Arc::new(AmqpBroker::from_env().await.unwrap());

    // Dedicated queues so runs never interfere
    let delivery_queue = format!("courier_it_deliver_{}", Uuid::new_v4().simple());
    let cancel_queue = format!("courier_it_cancel_{}", Uuid::new_v4().simple());
    broker.create_queue(&delivery_queue).await.unwrap();
    broker.create_queue(&cancel_queue).await.unwrap();

    let service = ScheduleService::new(pool.clone(), broker.clone(), cancel_queue.clone());

    let view = service
        .create(CreateScheduleRequest {
            recipient: "person@example.com".to_string(),
            message: "Live broker round trip".to_string(),
            scheduled_datetime: Utc::now() + ChronoDuration::hours(1),
            channel: "sms".to_string(),
            exchange: String::new(),
            routing_key: delivery_queue.clone(),
        })
        .await
        .unwrap();

    assert_eq!(view.status, "scheduled");

    // Immediate dispatch confirmed: nothing left in the outbox
    let outbox = OutboxMessage::find_by_schedule(&pool, view.id).await.unwrap();
    assert_eq!(outbox.len(), 1);
    assert!(!outbox[0].is_pending());

    let canceled = service.cancel(view.id).await.unwrap();
    assert_eq!(canceled.status, "canceled");

    // Both messages should land in their queues
    let broker_for_depths = broker.clone();
    let (dq, cq) = (delivery_queue.clone(), cancel_queue.clone());
    wait_for(
        move || {
            let broker = broker_for_depths.clone();
            let (dq, cq) = (dq.clone(), cq.clone());
            Box::pin(async move {
                let Ok(queues) = broker.list_queues().await else {
                    return false;
                };
                let depth = |name: &str| {
                    queues
                        .iter()
                        .find(|q| q.name == name)
                        .map(|q| q.messages)
                        .unwrap_or(0)
                };
                depth(&dq) >= 1 && depth(&cq) >= 1
            })
        },
        "messages to land in both queues",
    )
    .await;

    broker.close().await.unwrap();
}

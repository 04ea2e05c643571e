#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, RabbitMQ in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Courier Core Rust
//!
//! Rust core for scheduling outbound communications (email, SMS, push,
//! WhatsApp) through an AMQP broker.
//!
//! ## Overview
//!
//! Courier accepts communications to be delivered at a future time, persists
//! them in PostgreSQL, and hands them to RabbitMQ for downstream delivery
//! workers. PostgreSQL is the source of truth: every accepted schedule is
//! committed together with its broker message in an outbox row, so a broker
//! outage never loses work.
//!
//! ## Architecture
//!
//! The crate is built around a **transactional outbox**: schedule rows and
//! their wire payloads are written atomically, dispatched immediately when
//! the broker is reachable, and drained by a background relay when it is
//! not. Status changes flow through a small delivery state machine that
//! rejects illegal moves such as canceling an already-sent message.
//!
//! ## Module Organization
//!
//! - [`models`] - Data layer over the courier schema
//! - [`database`] - Connection pooling and migration running
//! - [`state_machine`] - Delivery lifecycle management
//! - [`messaging`] - Broker abstraction, AMQP client, wire payloads
//! - [`services`] - Schedule operations and the outbox relay
//! - [`config`] - Configuration management
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use courier_core::config::CourierConfig;
//! use courier_core::messaging::{AmqpBroker, Broker};
//! use courier_core::services::{CreateScheduleRequest, ScheduleService};
//! use sqlx::postgres::PgPoolOptions;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CourierConfig::from_env();
//! config.validate()?;
//!
//! let pool = PgPoolOptions::new()
//!     .max_connections(config.database.max_connections)
//!     .connect(&config.database.url)
//!     .await?;
//! let broker: Arc<dyn Broker> = Arc::new(AmqpBroker::connect(config.broker.clone()).await?);
//!
//! let service = ScheduleService::new(pool, broker, config.broker.cancel_queue.clone());
//! let view = service
//!     .create(CreateScheduleRequest {
//!         recipient: "person@example.com".to_string(),
//!         message: "Your appointment is tomorrow at 10:00".to_string(),
//!         scheduled_datetime: chrono::Utc::now() + chrono::Duration::hours(24),
//!         channel: "email".to_string(),
//!         exchange: String::new(),
//!         routing_key: "schedule_queue".to_string(),
//!     })
//!     .await?;
//!
//! println!("Scheduled communication {} ({})", view.id, view.status);
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! Unit tests run without infrastructure; integration tests against live
//! PostgreSQL and RabbitMQ are `#[ignore]`d by default:
//!
//! ```bash
//! cargo test                      # Unit and property tests
//! cargo test -- --ignored        # Integration tests (needs Postgres + RabbitMQ)
//! ```

pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod messaging;
pub mod models;
pub mod services;
pub mod state_machine;

pub use config::{BrokerSettings, CourierConfig, DatabaseSettings, RelaySettings};
pub use error::{CourierError, Result};
pub use messaging::{AmqpBroker, Broker, BrokerError, BrokerResult, InMemoryBroker};
pub use models::{Channel, CommunicationSchedule, OutboxMessage, ScheduleRecord, Status};
pub use services::{
    CreateScheduleRequest, OutboxRelay, ScheduleError, ScheduleService, ScheduleView,
    UpdateScheduleRequest,
};
pub use state_machine::{DeliveryEvent, DeliveryState, StateMachineError};

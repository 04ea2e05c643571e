//! # Broker Messaging Layer
//!
//! Everything that talks to the message broker: the provider-agnostic
//! `Broker` trait, the lapin-backed AMQP client, the HTTP management client
//! for topology listings, the in-memory double used in tests, the wire
//! payload shapes, and the broker error taxonomy.

pub mod amqp;
pub mod broker;
pub mod errors;
pub mod in_memory;
pub mod management;
pub mod payloads;

pub use amqp::AmqpBroker;
pub use broker::{Broker, ExchangeInfo, QueueInfo};
pub use errors::{BrokerError, BrokerResult};
pub use in_memory::{InMemoryBroker, PublishedMessage};
pub use management::ManagementClient;
pub use payloads::{CancelPayload, PayloadMetadata, SchedulePayload, CANCEL_ACTION};

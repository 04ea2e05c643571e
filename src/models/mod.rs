//! # Data Models
//!
//! sqlx-backed models over the courier schema: seeded channel/status
//! reference data, scheduled communications, and the publish outbox.
//! Queries are runtime-checked (`sqlx::query_as` with binds), so the crate
//! builds without a live database.

pub mod channel;
pub mod communication_schedule;
pub mod outbox_message;
pub mod status;

pub use channel::Channel;
pub use communication_schedule::{
    CommunicationSchedule, NewCommunicationSchedule, ScheduleRecord,
};
pub use outbox_message::{NewOutboxMessage, OutboxMessage, OutboxState};
pub use status::Status;

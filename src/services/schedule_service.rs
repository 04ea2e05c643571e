//! # Schedule Service
//!
//! Operations over scheduled communications: create, cancel, update, and
//! check. Writes go to PostgreSQL first; broker publications ride the outbox
//! table so a broker outage never loses an accepted schedule.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::messaging::{Broker, BrokerError, CancelPayload, PayloadMetadata, SchedulePayload};
use crate::models::{
    Channel, CommunicationSchedule, NewCommunicationSchedule, NewOutboxMessage, OutboxMessage,
    ScheduleRecord, Status,
};
use crate::state_machine::{self, DeliveryEvent, DeliveryState, StateMachineError};

/// Error types for schedule operations
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("Unknown channel: {name}")]
    UnknownChannel { name: String },

    #[error("Unknown status: {name}")]
    UnknownStatus { name: String },

    #[error("Schedule {schedule_id} not found")]
    NotFound { schedule_id: i64 },

    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error(transparent)]
    InvalidTransition(#[from] StateMachineError),

    #[error("Schedule {schedule_id} stored but not yet published: {reason}")]
    PublishPending { schedule_id: i64, reason: String },

    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ScheduleError {
    /// Whether the failure is the caller's fault (bad name, bad transition,
    /// missing row) rather than an infrastructure problem
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownChannel { .. }
                | Self::UnknownStatus { .. }
                | Self::NotFound { .. }
                | Self::Validation { .. }
                | Self::InvalidTransition(_)
        )
    }

    fn validation(field: &str, message: &str) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

/// Fields accepted when scheduling a communication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateScheduleRequest {
    pub recipient: String,
    pub message: String,
    pub scheduled_datetime: DateTime<Utc>,
    /// Channel name, resolved against the seeded channel rows
    pub channel: String,
    /// Exchange the schedule message is published to; the empty string
    /// addresses the default exchange
    pub exchange: String,
    /// Routing key for the schedule message
    pub routing_key: String,
}

/// Partial update; `None` fields keep their current value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateScheduleRequest {
    pub recipient: Option<String>,
    pub message: Option<String>,
    pub scheduled_datetime: Option<DateTime<Utc>>,
    pub channel: Option<String>,
    pub status: Option<String>,
}

impl UpdateScheduleRequest {
    pub fn is_empty(&self) -> bool {
        self.recipient.is_none()
            && self.message.is_none()
            && self.scheduled_datetime.is_none()
            && self.channel.is_none()
            && self.status.is_none()
    }
}

/// Schedule state as reported to callers, with channel and status resolved
/// to their names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleView {
    pub id: i64,
    pub recipient: String,
    pub message: String,
    pub scheduled_datetime: DateTime<Utc>,
    pub channel: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<ScheduleRecord> for ScheduleView {
    fn from(record: ScheduleRecord) -> Self {
        Self {
            id: record.id,
            recipient: record.recipient,
            message: record.message,
            scheduled_datetime: record.scheduled_datetime,
            channel: record.channel,
            status: record.status,
            created_at: record.created_at,
        }
    }
}

/// Database-backed scheduling operations wired to a broker client
///
/// The service owns the write path for schedules:
/// - Creation persists the schedule and its broker message atomically, then
///   attempts immediate dispatch
/// - Cancellation notifies the operational queue and moves the row to
///   `canceled`
/// - Updates are partial and status changes are validated against the
///   delivery state machine
/// - Checks are read-only and never touch the broker
#[derive(Debug, Clone)]
pub struct ScheduleService {
    pool: PgPool,
    broker: Arc<dyn Broker>,
    cancel_queue: String,
}

impl ScheduleService {
    /// Create a new schedule service
    pub fn new(pool: PgPool, broker: Arc<dyn Broker>, cancel_queue: String) -> Self {
        Self {
            pool,
            broker,
            cancel_queue,
        }
    }

    /// Accept a new scheduled communication.
    ///
    /// The schedule row and its outbox row are written in one transaction
    /// with the seeded `scheduled` status, then the message is dispatched to
    /// the broker. If the broker is down the schedule stays accepted and the
    /// call returns [`ScheduleError::PublishPending`]; the outbox relay
    /// retries the publication.
    pub async fn create(
        &self,
        request: CreateScheduleRequest,
    ) -> Result<ScheduleView, ScheduleError> {
        Self::validate_create(&request)?;

        let channel = Channel::find_by_name(&self.pool, &request.channel)
            .await?
            .ok_or_else(|| ScheduleError::UnknownChannel {
                name: request.channel.clone(),
            })?;
        let status = Status::for_state(&self.pool, DeliveryState::Scheduled).await?;

        let mut tx = self.pool.begin().await?;

        let schedule = CommunicationSchedule::insert(
            &mut *tx,
            NewCommunicationSchedule {
                recipient: request.recipient,
                message: request.message,
                scheduled_datetime: request.scheduled_datetime,
                channel_id: channel.id,
                status_id: status.id,
            },
        )
        .await?;

        let payload = SchedulePayload {
            id: schedule.id,
            recipient: schedule.recipient.clone(),
            message: schedule.message.clone(),
            scheduled_datetime: schedule.scheduled_datetime,
            channel: channel.name.clone(),
            status: status.name.clone(),
            metadata: PayloadMetadata::new(),
        };

        let outbox = OutboxMessage::insert(
            &mut *tx,
            NewOutboxMessage {
                schedule_id: schedule.id,
                exchange: request.exchange,
                routing_key: request.routing_key,
                payload: payload.to_json().map_err(BrokerError::from)?,
            },
        )
        .await?;

        tx.commit().await?;

        info!(
            schedule_id = schedule.id,
            channel = %channel.name,
            scheduled_datetime = %schedule.scheduled_datetime,
            "Communication scheduled"
        );

        self.dispatch(&outbox).await?;

        Ok(ScheduleView {
            id: schedule.id,
            recipient: schedule.recipient,
            message: schedule.message,
            scheduled_datetime: schedule.scheduled_datetime,
            channel: channel.name,
            status: status.name,
            created_at: schedule.created_at,
        })
    }

    /// Cancel a schedule.
    ///
    /// Publishes a `{id, action: "cancel"}` notice to the cancel queue and
    /// moves the row to `canceled`. The notice is advisory: the status write
    /// is the source of truth, so a publish failure is logged but does not
    /// abort the cancellation. Canceling an already-canceled schedule is a
    /// no-op; canceling a sent or failed one is rejected.
    pub async fn cancel(&self, schedule_id: i64) -> Result<ScheduleView, ScheduleError> {
        let record = CommunicationSchedule::find_record(&self.pool, schedule_id)
            .await?
            .ok_or(ScheduleError::NotFound { schedule_id })?;

        let current = Self::parse_status(&record.status)?;

        if current == DeliveryState::Canceled {
            debug!(schedule_id, "Schedule already canceled");
            return Ok(record.into());
        }

        state_machine::next_state(current, &DeliveryEvent::Cancel)?;

        let notice = CancelPayload::new(schedule_id)
            .to_json()
            .map_err(BrokerError::from)?;
        if let Err(e) = self.broker.publish("", &self.cancel_queue, &notice).await {
            // The notice is best-effort; the status write below is what
            // downstream readers trust
            error!(
                schedule_id,
                queue = %self.cancel_queue,
                error = %e,
                "Cancel notice publish failed"
            );
        }

        let status = Status::for_state(&self.pool, DeliveryState::Canceled).await?;
        CommunicationSchedule::update_status(&self.pool, schedule_id, status.id)
            .await?
            .ok_or(ScheduleError::NotFound { schedule_id })?;

        info!(schedule_id, "Schedule canceled");

        self.check(schedule_id).await
    }

    /// Apply a partial update to a schedule.
    ///
    /// Channel and status arrive as names and are resolved against the
    /// seeded rows; a requested status change must be a legal transition in
    /// the delivery state machine. Re-writing the current status is
    /// tolerated as a no-op. An empty request returns the schedule
    /// unchanged.
    pub async fn update(
        &self,
        schedule_id: i64,
        request: UpdateScheduleRequest,
    ) -> Result<ScheduleView, ScheduleError> {
        let record = CommunicationSchedule::find_record(&self.pool, schedule_id)
            .await?
            .ok_or(ScheduleError::NotFound { schedule_id })?;

        if request.is_empty() {
            debug!(schedule_id, "Update request has no fields");
            return Ok(record.into());
        }

        if let Some(recipient) = &request.recipient {
            Self::validate_recipient(recipient)?;
        }
        if let Some(message) = &request.message {
            if message.trim().is_empty() {
                return Err(ScheduleError::validation("message", "must not be empty"));
            }
        }

        let channel_id = match &request.channel {
            Some(name) => Some(
                Channel::find_by_name(&self.pool, name)
                    .await?
                    .ok_or_else(|| ScheduleError::UnknownChannel { name: name.clone() })?
                    .id,
            ),
            None => None,
        };

        let status_id = match &request.status {
            Some(name) => {
                let target = Self::parse_status(name)?;
                let current = Self::parse_status(&record.status)?;

                match state_machine::event_for_target(current, target)? {
                    Some(event) => {
                        debug!(
                            schedule_id,
                            from = %current,
                            to = %target,
                            event = event.event_type(),
                            "Applying status transition"
                        );
                        Some(Status::for_state(&self.pool, target).await?.id)
                    }
                    // Same status requested; nothing to change
                    None => None,
                }
            }
            None => None,
        };

        CommunicationSchedule::update_fields(
            &self.pool,
            schedule_id,
            request.recipient,
            request.message,
            request.scheduled_datetime,
            channel_id,
            status_id,
        )
        .await?
        .ok_or(ScheduleError::NotFound { schedule_id })?;

        info!(schedule_id, "Schedule updated");

        self.check(schedule_id).await
    }

    /// Load the current state of a schedule. Read-only; never touches the
    /// broker.
    pub async fn check(&self, schedule_id: i64) -> Result<ScheduleView, ScheduleError> {
        let record = CommunicationSchedule::find_record(&self.pool, schedule_id)
            .await?
            .ok_or(ScheduleError::NotFound { schedule_id })?;
        Ok(record.into())
    }

    /// List every schedule, oldest first
    pub async fn list(&self) -> Result<Vec<ScheduleView>, ScheduleError> {
        let records = CommunicationSchedule::list_records(&self.pool).await?;
        Ok(records.into_iter().map(ScheduleView::from).collect())
    }

    /// The seeded delivery channels
    pub async fn channels(&self) -> Result<Vec<Channel>, ScheduleError> {
        Ok(Channel::list(&self.pool).await?)
    }

    /// The seeded delivery statuses
    pub async fn statuses(&self) -> Result<Vec<Status>, ScheduleError> {
        Ok(Status::list(&self.pool).await?)
    }

    /// Publish one outbox row and record the outcome.
    ///
    /// On broker failure the row stays pending for the relay and the error
    /// surfaces as `PublishPending` so the caller knows the schedule is
    /// stored but the message has not gone out.
    async fn dispatch(&self, message: &OutboxMessage) -> Result<(), ScheduleError> {
        match self
            .broker
            .publish(&message.exchange, &message.routing_key, &message.payload)
            .await
        {
            Ok(()) => {
                // Delivery is at-least-once: if this write fails the relay
                // republishes the row later
                if let Err(e) = OutboxMessage::mark_dispatched(&self.pool, message.id).await {
                    warn!(
                        outbox_id = message.id,
                        error = %e,
                        "Published but could not mark outbox row dispatched"
                    );
                }
                debug!(
                    schedule_id = message.schedule_id,
                    exchange = %message.exchange,
                    routing_key = %message.routing_key,
                    "Schedule message published"
                );
                Ok(())
            }
            Err(e) => {
                error!(
                    schedule_id = message.schedule_id,
                    error = %e,
                    "Publish failed, leaving outbox row pending"
                );
                OutboxMessage::record_failure(&self.pool, message.id, &e.to_string()).await?;
                Err(ScheduleError::PublishPending {
                    schedule_id: message.schedule_id,
                    reason: e.to_string(),
                })
            }
        }
    }

    fn validate_create(request: &CreateScheduleRequest) -> Result<(), ScheduleError> {
        Self::validate_recipient(&request.recipient)?;
        if request.message.trim().is_empty() {
            return Err(ScheduleError::validation("message", "must not be empty"));
        }
        if request.routing_key.trim().is_empty() {
            return Err(ScheduleError::validation(
                "routing_key",
                "must not be empty",
            ));
        }
        Ok(())
    }

    /// The column is VARCHAR(255); reject oversized values before they
    /// become opaque database errors
    fn validate_recipient(recipient: &str) -> Result<(), ScheduleError> {
        if recipient.trim().is_empty() {
            return Err(ScheduleError::validation("recipient", "must not be empty"));
        }
        if recipient.len() > 255 {
            return Err(ScheduleError::validation(
                "recipient",
                "must be at most 255 characters",
            ));
        }
        Ok(())
    }

    /// Parse a persisted status name; the rows are seeded, so an unparseable
    /// name is reported as unknown
    fn parse_status(name: &str) -> Result<DeliveryState, ScheduleError> {
        DeliveryState::from_str(name).map_err(|_| ScheduleError::UnknownStatus {
            name: name.to_string(),
        })
    }
}

//! # Outbox Message Model
//!
//! Intent-to-publish records. A schedule's broker message is written to
//! `courier_outbox` in the same transaction as the schedule row, then
//! dispatched to the broker; rows that fail to dispatch stay `pending` and
//! are retried by the outbox relay. This closes the dual-write gap between
//! the database and the broker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::fmt;

/// Dispatch state of an outbox row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboxState {
    Pending,
    Dispatched,
}

impl OutboxState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Dispatched => "dispatched",
        }
    }
}

impl fmt::Display for OutboxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An outbox row holding one broker publication
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct OutboxMessage {
    pub id: i64,
    pub schedule_id: i64,
    pub exchange: String,
    pub routing_key: String,
    pub payload: serde_json::Value,
    pub state: String,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub dispatched_at: Option<DateTime<Utc>>,
}

/// Fields for inserting a new outbox row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOutboxMessage {
    pub schedule_id: i64,
    pub exchange: String,
    pub routing_key: String,
    pub payload: serde_json::Value,
}

impl OutboxMessage {
    /// Insert a pending outbox row; runs on any executor so it can share the
    /// schedule insert's transaction
    pub async fn insert(
        executor: impl sqlx::PgExecutor<'_>,
        new_message: NewOutboxMessage,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO courier_outbox (schedule_id, exchange, routing_key, payload)
            VALUES ($1, $2, $3, $4)
            RETURNING id, schedule_id, exchange, routing_key, payload, state,
                      attempts, last_error, created_at, dispatched_at
            "#,
        )
        .bind(new_message.schedule_id)
        .bind(new_message.exchange)
        .bind(new_message.routing_key)
        .bind(new_message.payload)
        .fetch_one(executor)
        .await
    }

    /// Claim a batch of pending rows for dispatch.
    ///
    /// Uses `FOR UPDATE SKIP LOCKED` so concurrent relay instances never
    /// fight over the same rows; must run inside the caller's transaction.
    pub async fn claim_pending(
        tx: &mut Transaction<'_, Postgres>,
        batch_size: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT id, schedule_id, exchange, routing_key, payload, state,
                   attempts, last_error, created_at, dispatched_at
            FROM courier_outbox
            WHERE state = 'pending'
            ORDER BY id
            LIMIT $1
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(batch_size)
        .fetch_all(&mut **tx)
        .await
    }

    /// Mark a row as handed to the broker
    pub async fn mark_dispatched(
        executor: impl sqlx::PgExecutor<'_>,
        id: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE courier_outbox
            SET state = 'dispatched', dispatched_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Record a failed dispatch attempt, keeping the row pending
    pub async fn record_failure(
        executor: impl sqlx::PgExecutor<'_>,
        id: i64,
        error: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE courier_outbox
            SET attempts = attempts + 1, last_error = $2
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(error)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Number of rows still awaiting dispatch
    pub async fn pending_count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM courier_outbox WHERE state = 'pending'",
        )
        .fetch_one(pool)
        .await
    }

    /// All outbox rows for a schedule, oldest first
    pub async fn find_by_schedule(
        pool: &PgPool,
        schedule_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT id, schedule_id, exchange, routing_key, payload, state,
                   attempts, last_error, created_at, dispatched_at
            FROM courier_outbox
            WHERE schedule_id = $1
            ORDER BY id
            "#,
        )
        .bind(schedule_id)
        .fetch_all(pool)
        .await
    }

    /// Whether this row is still pending
    pub fn is_pending(&self) -> bool {
        self.state == OutboxState::Pending.as_str()
    }
}

//! # Communication Schedule Model
//!
//! One row per scheduled outbound communication. Rows are created with the
//! seeded `scheduled` status and move through the delivery state machine;
//! they are never hard-deleted.
//!
//! Maps to `courier_schedules`:
//! ```sql
//! CREATE TABLE courier_schedules (
//!   id BIGSERIAL PRIMARY KEY,
//!   recipient VARCHAR(255) NOT NULL,
//!   message TEXT NOT NULL,
//!   scheduled_datetime TIMESTAMPTZ NOT NULL,
//!   channel_id INTEGER NOT NULL REFERENCES courier_channels(id),
//!   status_id INTEGER NOT NULL REFERENCES courier_statuses(id),
//!   created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

/// A scheduled communication row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CommunicationSchedule {
    pub id: i64,
    pub recipient: String,
    pub message: String,
    pub scheduled_datetime: DateTime<Utc>,
    pub channel_id: i32,
    pub status_id: i32,
    pub created_at: DateTime<Utc>,
}

/// Fields for inserting a new schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCommunicationSchedule {
    pub recipient: String,
    pub message: String,
    pub scheduled_datetime: DateTime<Utc>,
    pub channel_id: i32,
    pub status_id: i32,
}

/// Schedule row joined with its channel and status names, the shape
/// returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ScheduleRecord {
    pub id: i64,
    pub recipient: String,
    pub message: String,
    pub scheduled_datetime: DateTime<Utc>,
    pub channel: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

const RECORD_SELECT: &str = r#"
    SELECT
        s.id,
        s.recipient,
        s.message,
        s.scheduled_datetime,
        c.name AS channel,
        st.name AS status,
        s.created_at
    FROM courier_schedules s
    INNER JOIN courier_channels c ON c.id = s.channel_id
    INNER JOIN courier_statuses st ON st.id = s.status_id
"#;

impl CommunicationSchedule {
    /// Insert a new schedule row.
    ///
    /// Takes any executor so the service can run it inside the same
    /// transaction as the outbox insert.
    pub async fn insert(
        executor: impl sqlx::PgExecutor<'_>,
        new_schedule: NewCommunicationSchedule,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO courier_schedules
                (recipient, message, scheduled_datetime, channel_id, status_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, recipient, message, scheduled_datetime, channel_id, status_id, created_at
            "#,
        )
        .bind(new_schedule.recipient)
        .bind(new_schedule.message)
        .bind(new_schedule.scheduled_datetime)
        .bind(new_schedule.channel_id)
        .bind(new_schedule.status_id)
        .fetch_one(executor)
        .await
    }

    /// Find a schedule by primary key
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT id, recipient, message, scheduled_datetime, channel_id, status_id, created_at
            FROM courier_schedules
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Load the joined view of a schedule
    pub async fn find_record(pool: &PgPool, id: i64) -> Result<Option<ScheduleRecord>, sqlx::Error> {
        let query = format!("{RECORD_SELECT} WHERE s.id = $1");
        sqlx::query_as::<_, ScheduleRecord>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all schedules as joined views, oldest first
    pub async fn list_records(pool: &PgPool) -> Result<Vec<ScheduleRecord>, sqlx::Error> {
        let query = format!("{RECORD_SELECT} ORDER BY s.id");
        sqlx::query_as::<_, ScheduleRecord>(&query)
            .fetch_all(pool)
            .await
    }

    /// Move a schedule to a new status, returning the updated row
    pub async fn update_status(
        executor: impl sqlx::PgExecutor<'_>,
        id: i64,
        status_id: i32,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE courier_schedules
            SET status_id = $2
            WHERE id = $1
            RETURNING id, recipient, message, scheduled_datetime, channel_id, status_id, created_at
            "#,
        )
        .bind(id)
        .bind(status_id)
        .fetch_optional(executor)
        .await
    }

    /// Partial update: NULL binds leave the column unchanged.
    ///
    /// `created_at` is immutable and never part of the SET list.
    pub async fn update_fields(
        executor: impl sqlx::PgExecutor<'_>,
        id: i64,
        recipient: Option<String>,
        message: Option<String>,
        scheduled_datetime: Option<DateTime<Utc>>,
        channel_id: Option<i32>,
        status_id: Option<i32>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE courier_schedules
            SET recipient = COALESCE($2, recipient),
                message = COALESCE($3, message),
                scheduled_datetime = COALESCE($4, scheduled_datetime),
                channel_id = COALESCE($5, channel_id),
                status_id = COALESCE($6, status_id)
            WHERE id = $1
            RETURNING id, recipient, message, scheduled_datetime, channel_id, status_id, created_at
            "#,
        )
        .bind(id)
        .bind(recipient)
        .bind(message)
        .bind(scheduled_datetime)
        .bind(channel_id)
        .bind(status_id)
        .fetch_optional(executor)
        .await
    }
}

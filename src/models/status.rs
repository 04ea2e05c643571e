//! # Status Model
//!
//! Delivery statuses are a closed, seeded set (`scheduled`, `sent`,
//! `canceled`, `failed`) in `courier_statuses`. The rows back the
//! `DeliveryState` vocabulary; the core never creates statuses at runtime.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::state_machine::DeliveryState;

/// A delivery status row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Status {
    pub id: i32,
    pub name: String,
    pub description: String,
}

impl Status {
    /// Resolve a status by its unique name
    pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT id, name, description
            FROM courier_statuses
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(pool)
        .await
    }

    /// Find a status by primary key
    pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT id, name, description
            FROM courier_statuses
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Resolve the row backing a state-machine state.
    ///
    /// The statuses are seeded by migration, so a missing row means the
    /// database was not migrated; that surfaces as `RowNotFound` rather than
    /// a service-level unknown-name error.
    pub async fn for_state(pool: &PgPool, state: DeliveryState) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT id, name, description
            FROM courier_statuses
            WHERE name = $1
            "#,
        )
        .bind(state.as_str())
        .fetch_one(pool)
        .await
    }

    /// List all statuses in seed order
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT id, name, description
            FROM courier_statuses
            ORDER BY id
            "#,
        )
        .fetch_all(pool)
        .await
    }
}

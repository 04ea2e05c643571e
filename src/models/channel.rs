//! # Channel Model
//!
//! Delivery channels (email, sms, push, whatsapp) are seeded reference data
//! in `courier_channels`. The service resolves channel names against this
//! table; an unresolved name is a typed error at the service layer, never a
//! bare row-not-found.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

/// A delivery channel row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Channel {
    pub id: i32,
    pub name: String,
    pub description: String,
}

impl Channel {
    /// Resolve a channel by its unique name
    pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT id, name, description
            FROM courier_channels
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(pool)
        .await
    }

    /// Find a channel by primary key
    pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT id, name, description
            FROM courier_channels
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// List all channels in seed order
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT id, name, description
            FROM courier_channels
            ORDER BY id
            "#,
        )
        .fetch_all(pool)
        .await
    }
}

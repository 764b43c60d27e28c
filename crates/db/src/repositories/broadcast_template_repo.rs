//! Repository for the `broadcast_templates` table.

use classtrack_core::types::DbId;
use sqlx::PgPool;

use crate::models::broadcast::BroadcastTemplate;

/// Column list for `broadcast_templates` queries.
const COLUMNS: &str = "id, subject, message, created_at";

/// Provides persistence for stored broadcast messages.
pub struct BroadcastTemplateRepo;

impl BroadcastTemplateRepo {
    /// Store a broadcast message, returning its id.
    pub async fn insert(pool: &PgPool, subject: &str, message: &str) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO broadcast_templates (subject, message) \
             VALUES ($1, $2) \
             RETURNING id",
        )
        .bind(subject)
        .bind(message)
        .fetch_one(pool)
        .await
    }

    /// Fetch the most recently stored broadcast message, if any.
    pub async fn latest(pool: &PgPool) -> Result<Option<BroadcastTemplate>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM broadcast_templates ORDER BY id DESC LIMIT 1");
        sqlx::query_as::<_, BroadcastTemplate>(&query)
            .fetch_optional(pool)
            .await
    }
}

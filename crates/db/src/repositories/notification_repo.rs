//! Repository for the in-app `notifications` table.

use classtrack_core::types::DbId;
use sqlx::PgPool;

use crate::models::notification::Notification;

/// Column list for `notifications` queries.
const COLUMNS: &str = "id, title, message, status, created_at";

/// Provides CRUD operations for in-app notifications.
pub struct NotificationRepo;

impl NotificationRepo {
    /// Create an UNREAD notification, returning its id.
    pub async fn create(pool: &PgPool, title: &str, message: &str) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO notifications (title, message, status) \
             VALUES ($1, $2, 'UNREAD') \
             RETURNING id",
        )
        .bind(title)
        .bind(message)
        .fetch_one(pool)
        .await
    }

    /// List recent notifications, newest first.
    pub async fn list_recent(pool: &PgPool, limit: i64) -> Result<Vec<Notification>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notifications \
             ORDER BY created_at DESC, id DESC \
             LIMIT $1"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Mark a notification as read.
    ///
    /// Returns `true` if the notification existed and was updated.
    pub async fn mark_read(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications SET status = 'READ' WHERE id = $1 AND status = 'UNREAD'",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every notification.
    pub async fn clear_all(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notifications").execute(pool).await?;
        Ok(result.rows_affected())
    }
}

//! Repository for the `email_notifications` table.
//!
//! The two `record_*` fns are the only status writers. Both are single-row
//! atomic updates, so concurrent dispatch attempts for the same record
//! resolve as last-writer-wins without any in-memory coordination.

use classtrack_core::types::DbId;
use sqlx::PgPool;

use crate::models::email::{EmailNotification, NewEmail};

/// Column list for `email_notifications` queries.
const COLUMNS: &str = "id, to_email, subject, body, is_html, status, sent_at, retry_count, \
                       last_attempt_at, last_error, created_at";

/// Provides persistence for the outbound email queue.
pub struct EmailQueueRepo;

impl EmailQueueRepo {
    /// Insert a new PENDING record with a zero retry count, returning its id.
    pub async fn insert(pool: &PgPool, new: &NewEmail) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO email_notifications (to_email, subject, body, is_html, status) \
             VALUES ($1, $2, $3, $4, 'PENDING') \
             RETURNING id",
        )
        .bind(&new.to_email)
        .bind(&new.subject)
        .bind(&new.body)
        .bind(new.is_html)
        .fetch_one(pool)
        .await
    }

    /// Fetch a single record by id.
    pub async fn get(pool: &PgPool, id: DbId) -> Result<Option<EmailNotification>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM email_notifications WHERE id = $1");
        sqlx::query_as::<_, EmailNotification>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Fetch up to `limit` not-yet-delivered records, oldest first.
    ///
    /// Oldest-first is the only ordering guarantee the sweep makes; it bounds
    /// starvation of early failures behind a growing backlog.
    pub async fn find_dispatchable(
        pool: &PgPool,
        limit: i64,
    ) -> Result<Vec<EmailNotification>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM email_notifications \
             WHERE status IN ('PENDING', 'FAILED') \
             ORDER BY id ASC \
             LIMIT $1"
        );
        sqlx::query_as::<_, EmailNotification>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Record a successful delivery attempt: SENT, timestamps set, error
    /// cleared, retry count advanced to the attempt number.
    pub async fn record_success(pool: &PgPool, id: DbId, attempt: i32) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE email_notifications \
             SET status = 'SENT', sent_at = NOW(), last_attempt_at = NOW(), \
                 last_error = NULL, retry_count = $2 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(attempt)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Record a failed delivery attempt: FAILED, error summary stored,
    /// retry count advanced to the attempt number.
    pub async fn record_failure(
        pool: &PgPool,
        id: DbId,
        attempt: i32,
        error: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE email_notifications \
             SET status = 'FAILED', last_attempt_at = NOW(), last_error = $3, retry_count = $2 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(attempt)
        .bind(error)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// List recent records for the monitoring endpoint, most recently sent
    /// first (unsent rows trail, newest first among themselves).
    pub async fn list_recent(
        pool: &PgPool,
        limit: i64,
    ) -> Result<Vec<EmailNotification>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM email_notifications \
             ORDER BY sent_at DESC NULLS LAST, id DESC \
             LIMIT $1"
        );
        sqlx::query_as::<_, EmailNotification>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Delete every record. Operator-facing reset, not used by the engine.
    pub async fn clear_all(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM email_notifications")
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

//! Repository for the `daily_report_logs` table.
//!
//! The unique `(report_date, job_name)` pair makes the upsert the one write
//! path for a day's run, so overlapping trigger windows converge on a single
//! row instead of racing to insert duplicates.

use chrono::NaiveDate;
use classtrack_core::types::DbId;
use sqlx::PgPool;

use crate::models::report_log::DailyReportLog;

/// Column list for `daily_report_logs` queries.
const COLUMNS: &str =
    "id, report_date, job_name, file_name, status, generated_at, sent_at, error_message";

/// Provides persistence for daily report run logs.
pub struct ReportLogRepo;

impl ReportLogRepo {
    /// Whether a successful run is already recorded for (date, job).
    pub async fn has_sent(pool: &PgPool, date: NaiveDate, job: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS ( \
                 SELECT 1 FROM daily_report_logs \
                 WHERE report_date = $1 AND job_name = $2 AND status = 'SENT' \
             )",
        )
        .bind(date)
        .bind(job)
        .fetch_one(pool)
        .await
    }

    /// Create or reset the day's row to GENERATED before doing real work.
    pub async fn upsert_generated(
        pool: &PgPool,
        date: NaiveDate,
        job: &str,
        file_name: &str,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO daily_report_logs (report_date, job_name, file_name, status, generated_at) \
             VALUES ($1, $2, $3, 'GENERATED', NOW()) \
             ON CONFLICT (report_date, job_name) \
             DO UPDATE SET file_name = EXCLUDED.file_name, status = 'GENERATED', \
                           generated_at = NOW(), error_message = NULL \
             RETURNING id",
        )
        .bind(date)
        .bind(job)
        .bind(file_name)
        .fetch_one(pool)
        .await
    }

    /// Mark the day's run as successfully delivered.
    pub async fn mark_sent(pool: &PgPool, date: NaiveDate, job: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE daily_report_logs \
             SET status = 'SENT', sent_at = NOW(), error_message = NULL \
             WHERE report_date = $1 AND job_name = $2",
        )
        .bind(date)
        .bind(job)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Mark the day's run as failed, leaving it eligible for the next
    /// trigger window.
    pub async fn mark_failed(
        pool: &PgPool,
        date: NaiveDate,
        job: &str,
        error: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE daily_report_logs \
             SET status = 'FAILED', error_message = $3 \
             WHERE report_date = $1 AND job_name = $2",
        )
        .bind(date)
        .bind(job)
        .bind(error)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// List recent run logs for the monitoring endpoint, newest day first.
    pub async fn list_recent(
        pool: &PgPool,
        limit: i64,
    ) -> Result<Vec<DailyReportLog>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM daily_report_logs \
             ORDER BY report_date DESC, job_name ASC \
             LIMIT $1"
        );
        sqlx::query_as::<_, DailyReportLog>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}

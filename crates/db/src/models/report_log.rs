//! Daily report run-log models.

use chrono::NaiveDate;
use classtrack_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Outcome of one day's run of a scheduled report job.
///
/// `Sent` is the idempotency marker: at most one row per (date, job) ever
/// carries it, and its presence suppresses every later trigger window for
/// that day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "report_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ReportStatus {
    Generated,
    Sent,
    Failed,
}

/// A row from the `daily_report_logs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DailyReportLog {
    pub id: DbId,
    pub report_date: NaiveDate,
    pub job_name: String,
    pub file_name: String,
    pub status: ReportStatus,
    pub generated_at: Option<Timestamp>,
    pub sent_at: Option<Timestamp>,
    pub error_message: Option<String>,
}

//! Aggregated rows backing the daily report builders.

use chrono::NaiveDate;
use classtrack_core::types::DbId;
use serde::Serialize;
use sqlx::FromRow;

/// Per-student progress summary (overall averages across all marks).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StudentProgressRow {
    pub student_id: DbId,
    pub student_name: String,
    pub branch: Option<String>,
    pub total_assessments: i64,
    pub average_score: Option<f64>,
    pub average_percentage: Option<f64>,
    pub last_assessment: Option<NaiveDate>,
}

/// Per-subject summary across the whole roster.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SubjectBreakdownRow {
    pub subject: String,
    pub attempts: i64,
    pub average_score: Option<f64>,
    pub average_percentage: Option<f64>,
}

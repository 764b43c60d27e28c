//! Aggregate queries feeding the daily report builders.

use sqlx::PgPool;

use crate::models::report::{StudentProgressRow, SubjectBreakdownRow};

/// Provides the aggregated views the report content builders consume.
pub struct ReportRepo;

impl ReportRepo {
    /// Per-student overall progress: assessment count, average score, and
    /// average percentage across all marks.
    pub async fn student_progress(pool: &PgPool) -> Result<Vec<StudentProgressRow>, sqlx::Error> {
        sqlx::query_as::<_, StudentProgressRow>(
            "SELECT s.id AS student_id, \
                    s.name AS student_name, \
                    s.branch, \
                    COUNT(m.id) AS total_assessments, \
                    AVG(m.score) AS average_score, \
                    AVG(m.score / NULLIF(m.max_score, 0) * 100) AS average_percentage, \
                    MAX(m.assessed_on) AS last_assessment \
             FROM students s \
             LEFT JOIN student_marks m ON m.student_id = s.id \
             GROUP BY s.id, s.name, s.branch \
             ORDER BY s.name ASC",
        )
        .fetch_all(pool)
        .await
    }

    /// Per-subject analytics across the whole roster, best-performing
    /// subject first.
    pub async fn subject_breakdown(
        pool: &PgPool,
    ) -> Result<Vec<SubjectBreakdownRow>, sqlx::Error> {
        sqlx::query_as::<_, SubjectBreakdownRow>(
            "SELECT m.subject, \
                    COUNT(*) AS attempts, \
                    AVG(m.score) AS average_score, \
                    AVG(m.score / NULLIF(m.max_score, 0) * 100) AS average_percentage \
             FROM student_marks m \
             GROUP BY m.subject \
             ORDER BY average_percentage DESC NULLS LAST, m.subject ASC",
        )
        .fetch_all(pool)
        .await
    }
}

//! Repository for the `students` table.

use classtrack_core::types::DbId;
use sqlx::PgPool;

use crate::models::student::Student;

/// Column list for `students` queries.
const COLUMNS: &str = "id, name, email, branch, created_at";

/// Provides read access to the student roster.
pub struct StudentRepo;

impl StudentRepo {
    /// Fetch a single student by id.
    pub async fn find(pool: &PgPool, id: DbId) -> Result<Option<Student>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM students WHERE id = $1");
        sqlx::query_as::<_, Student>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List every student with a usable email address (broadcast recipients).
    pub async fn list_with_email(pool: &PgPool) -> Result<Vec<Student>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM students \
             WHERE email IS NOT NULL AND email <> '' \
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, Student>(&query).fetch_all(pool).await
    }
}

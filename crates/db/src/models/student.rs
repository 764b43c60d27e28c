//! Student roster model.

use classtrack_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `students` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Student {
    pub id: DbId,
    pub name: String,
    pub email: Option<String>,
    pub branch: Option<String>,
    pub created_at: Timestamp,
}

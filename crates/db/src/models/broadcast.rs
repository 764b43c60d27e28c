//! Stored broadcast message model.

use classtrack_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `broadcast_templates` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BroadcastTemplate {
    pub id: DbId,
    pub subject: String,
    pub message: String,
    pub created_at: Timestamp,
}

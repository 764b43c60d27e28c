//! Outbound email queue models.

use classtrack_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Delivery state of a queued email.
///
/// `Sent` is terminal. `Failed` stays eligible for retry until the
/// dispatcher's retry ceiling is reached, after which the row is inert and
/// only visible through the monitoring endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "email_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum EmailStatus {
    Pending,
    Sent,
    Failed,
}

/// A row from the `email_notifications` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EmailNotification {
    pub id: DbId,
    pub to_email: String,
    pub subject: String,
    pub body: String,
    pub is_html: bool,
    pub status: EmailStatus,
    pub sent_at: Option<Timestamp>,
    pub retry_count: i32,
    pub last_attempt_at: Option<Timestamp>,
    pub last_error: Option<String>,
    pub created_at: Timestamp,
}

/// Payload for enqueueing a new outbound email.
#[derive(Debug, Clone)]
pub struct NewEmail {
    pub to_email: String,
    pub subject: String,
    pub body: String,
    pub is_html: bool,
}

//! Route definitions for in-app notifications.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::notifications;
use crate::state::AppState;

/// Notification routes mounted at `/notifications`.
///
/// ```text
/// GET    /             -> list_notifications
/// DELETE /             -> clear_notifications
/// POST   /{id}/read    -> mark_read
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(notifications::list_notifications))
        .route("/", delete(notifications::clear_notifications))
        .route("/{id}/read", post(notifications::mark_read))
}

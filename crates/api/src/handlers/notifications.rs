//! Handlers for the in-app `/notifications` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use classtrack_core::error::CoreError;
use classtrack_core::types::DbId;
use classtrack_db::models::notification::Notification;
use classtrack_db::repositories::NotificationRepo;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Page size for the notification listing.
const NOTIFICATION_LIMIT: i64 = 100;

/// GET /api/v1/notifications
///
/// List recent in-app notifications, newest first.
pub async fn list_notifications(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<Notification>>>> {
    let notifications = NotificationRepo::list_recent(&state.pool, NOTIFICATION_LIMIT).await?;
    Ok(Json(DataResponse {
        data: notifications,
    }))
}

/// POST /api/v1/notifications/{id}/read
///
/// Mark a single notification as read. Returns 204 No Content on success,
/// or 404 if the notification does not exist (or was already read).
pub async fn mark_read(
    State(state): State<AppState>,
    Path(notification_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let found = NotificationRepo::mark_read(&state.pool, notification_id).await?;

    if !found {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Notification",
            id: notification_id,
        }));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/notifications
///
/// Clear every in-app notification.
pub async fn clear_notifications(
    State(state): State<AppState>,
) -> AppResult<Json<serde_json::Value>> {
    let deleted = NotificationRepo::clear_all(&state.pool).await?;
    Ok(Json(serde_json::json!({ "data": { "deleted": deleted } })))
}

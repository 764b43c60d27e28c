//! Handlers for admin-to-student email: roster-wide broadcasts and
//! individual messages. Both are producers onto the email queue; delivery
//! and retries happen in the background.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use classtrack_core::error::CoreError;
use classtrack_core::types::DbId;
use classtrack_db::repositories::{BroadcastTemplateRepo, NotificationRepo, StudentRepo};
use classtrack_notify::TemplateRenderer;
use classtrack_report::broadcast;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Payload for `POST /broadcast`.
#[derive(Debug, Deserialize, Validate)]
pub struct BroadcastRequest {
    #[validate(length(min = 1, message = "subject must not be empty"))]
    pub subject: String,
    #[validate(length(min = 1, message = "message must not be empty"))]
    pub message: String,
}

/// Payload for `POST /students/{id}/email`.
#[derive(Debug, Deserialize, Validate)]
pub struct IndividualEmailRequest {
    #[validate(length(min = 1, message = "subject must not be empty"))]
    pub subject: String,
    #[validate(length(min = 1, message = "message must not be empty"))]
    pub message: String,
}

/// Response for an individual email send.
#[derive(Debug, Serialize)]
pub struct IndividualEmailResponse {
    pub student_id: DbId,
    pub student_name: String,
    pub email: String,
    pub subject: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/admin/communication/broadcast
///
/// Store the message (so the nightly job can replay it) and queue a
/// templated email to every student with an address. Returns how many
/// recipients were queued.
pub async fn send_broadcast(
    State(state): State<AppState>,
    Json(payload): Json<BroadcastRequest>,
) -> AppResult<Json<serde_json::Value>> {
    payload.validate()?;

    let template_id =
        BroadcastTemplateRepo::insert(&state.pool, &payload.subject, &payload.message).await?;
    tracing::info!(template_id, subject = %payload.subject, "Broadcast template stored");

    let recipients = broadcast::send_to_students(
        &state.pool,
        &state.dispatcher,
        &payload.subject,
        &payload.message,
    )
    .await?;

    Ok(Json(serde_json::json!({
        "data": { "template_id": template_id, "recipients": recipients }
    })))
}

/// POST /api/v1/admin/communication/students/{id}/email
///
/// Queue a templated email to a single student. 404 when the student does
/// not exist, 400 when they have no registered address.
pub async fn send_individual_email(
    State(state): State<AppState>,
    Path(student_id): Path<DbId>,
    Json(payload): Json<IndividualEmailRequest>,
) -> AppResult<Json<DataResponse<IndividualEmailResponse>>> {
    payload.validate()?;

    let student = StudentRepo::find(&state.pool, student_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Student",
            id: student_id,
        })?;

    let email = student
        .email
        .clone()
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| {
            AppError::BadRequest("Student does not have a registered email address".to_string())
        })?;

    let mut ctx = tera::Context::new();
    ctx.insert("subject", &payload.subject);
    ctx.insert("message", &payload.message);
    ctx.insert("name", &student.name);
    if let Some(branch) = &student.branch {
        ctx.insert("branch", branch);
    }

    state
        .dispatcher
        .enqueue_templated(
            &email,
            &payload.subject,
            TemplateRenderer::STUDENT_EMAIL,
            &ctx,
        )
        .await?;

    let note = format!("Email to {} ({}): {}", student.name, email, payload.subject);
    if let Err(e) = NotificationRepo::create(&state.pool, "Individual email sent", &note).await {
        tracing::warn!(error = %e, "Failed to create in-app notification for individual email");
    }

    Ok(Json(DataResponse {
        data: IndividualEmailResponse {
            student_id: student.id,
            student_name: student.name,
            email,
            subject: payload.subject,
        },
    }))
}

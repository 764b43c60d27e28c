//! Handlers for the operator monitoring surface: the email queue, the daily
//! report run log, the report schedule, and manual triggers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use classtrack_db::models::email::EmailNotification;
use classtrack_db::models::report_log::DailyReportLog;
use classtrack_db::models::schedule::ScheduleConfig;
use classtrack_db::repositories::{EmailQueueRepo, ReportLogRepo, ScheduleConfigRepo};
use classtrack_notify::OutboundEmail;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Page size for the email queue listing.
const EMAIL_QUEUE_LIMIT: i64 = 200;

/// Page size for the daily report log listing.
const REPORT_LOG_LIMIT: i64 = 60;

// ---------------------------------------------------------------------------
// Email queue
// ---------------------------------------------------------------------------

/// GET /api/v1/admin/monitoring/email-queue
///
/// List recent queue records. Permanently exhausted FAILED records surface
/// here for operator inspection; the engine takes no further action on them.
pub async fn list_email_queue(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<EmailNotification>>>> {
    let records = EmailQueueRepo::list_recent(&state.pool, EMAIL_QUEUE_LIMIT).await?;
    Ok(Json(DataResponse { data: records }))
}

/// DELETE /api/v1/admin/monitoring/email-queue
///
/// Clear the entire queue. Returns the number of deleted records.
pub async fn clear_email_queue(
    State(state): State<AppState>,
) -> AppResult<Json<serde_json::Value>> {
    let deleted = EmailQueueRepo::clear_all(&state.pool).await?;
    Ok(Json(serde_json::json!({ "data": { "deleted": deleted } })))
}

/// POST /api/v1/admin/monitoring/email-queue/process
///
/// Manually trigger one reconciliation sweep. Returns 202 with the number of
/// records submitted; delivery itself is asynchronous.
pub async fn process_email_queue(
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let submitted = state.dispatcher.process_pending().await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "data": { "submitted": submitted } })),
    ))
}

// ---------------------------------------------------------------------------
// Daily report log
// ---------------------------------------------------------------------------

/// GET /api/v1/admin/monitoring/daily-reports
///
/// List recent run-log rows, newest day first.
pub async fn list_daily_reports(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<DailyReportLog>>>> {
    let logs = ReportLogRepo::list_recent(&state.pool, REPORT_LOG_LIMIT).await?;
    Ok(Json(DataResponse { data: logs }))
}

// ---------------------------------------------------------------------------
// Report schedule
// ---------------------------------------------------------------------------

/// Payload for `PUT /report-schedule`.
#[derive(Debug, Deserialize)]
pub struct UpdateSchedule {
    pub hour: i32,
    pub minute: i32,
}

/// GET /api/v1/admin/monitoring/report-schedule
pub async fn get_report_schedule(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<ScheduleConfig>>> {
    let config = ScheduleConfigRepo::get_or_default(&state.pool).await?;
    Ok(Json(DataResponse { data: config }))
}

/// PUT /api/v1/admin/monitoring/report-schedule
///
/// Update the daily report time-of-day. The change is picked up on the next
/// scheduler tick; no restart required.
pub async fn update_report_schedule(
    State(state): State<AppState>,
    Json(payload): Json<UpdateSchedule>,
) -> AppResult<Json<DataResponse<ScheduleConfig>>> {
    if !(0..=23).contains(&payload.hour) || !(0..=59).contains(&payload.minute) {
        return Err(AppError::BadRequest(
            "hour must be 0-23 and minute must be 0-59".to_string(),
        ));
    }
    let config = ScheduleConfigRepo::update(&state.pool, payload.hour, payload.minute).await?;
    tracing::info!(
        hour = config.report_hour,
        minute = config.report_minute,
        "Report schedule updated"
    );
    Ok(Json(DataResponse { data: config }))
}

// ---------------------------------------------------------------------------
// Manual triggers
// ---------------------------------------------------------------------------

/// POST /api/v1/admin/monitoring/reports/{job}/trigger
///
/// Run a daily job right now, bypassing the once-per-day check. The run is
/// still recorded on the same run-log row a scheduled run would use.
pub async fn trigger_report(
    State(state): State<AppState>,
    Path(job): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    state.jobs.run_manually(&job).await?;
    Ok(Json(serde_json::json!({
        "data": { "message": format!("Report job '{job}' triggered. Check logs and email inbox.") }
    })))
}

/// Query parameters for the test email endpoint.
#[derive(Debug, Deserialize)]
pub struct TestEmailQuery {
    /// Recipient override; defaults to the configured admin email.
    pub to: Option<String>,
}

/// POST /api/v1/admin/monitoring/test-email
///
/// Send a plain test email straight through the transport, bypassing the
/// queue, to verify SMTP configuration.
pub async fn send_test_email(
    State(state): State<AppState>,
    Query(params): Query<TestEmailQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let recipient = params
        .to
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| state.config.admin_email.clone());

    let email = OutboundEmail {
        to: recipient.clone(),
        subject: "Test Email from ClassTrack".to_string(),
        body: "This is a test email to verify the email configuration is working correctly.\n\n\
               If you receive this email, the email system is configured properly."
            .to_string(),
        is_html: false,
        attachment: None,
    };
    state.transport.send(&email).await?;

    Ok(Json(serde_json::json!({
        "data": { "message": format!("Test email sent to {recipient}. Check the inbox and spam folder.") }
    })))
}

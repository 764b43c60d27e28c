//! Route definitions for the operator monitoring surface.

use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::handlers::monitoring;
use crate::state::AppState;

/// Monitoring routes mounted at `/admin/monitoring`.
///
/// ```text
/// GET    /email-queue              -> list_email_queue
/// DELETE /email-queue              -> clear_email_queue
/// POST   /email-queue/process      -> process_email_queue
/// GET    /daily-reports            -> list_daily_reports
/// GET    /report-schedule          -> get_report_schedule
/// PUT    /report-schedule          -> update_report_schedule
/// POST   /reports/{job}/trigger    -> trigger_report
/// POST   /test-email               -> send_test_email
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/email-queue", get(monitoring::list_email_queue))
        .route("/email-queue", delete(monitoring::clear_email_queue))
        .route("/email-queue/process", post(monitoring::process_email_queue))
        .route("/daily-reports", get(monitoring::list_daily_reports))
        .route("/report-schedule", get(monitoring::get_report_schedule))
        .route("/report-schedule", put(monitoring::update_report_schedule))
        .route("/reports/{job}/trigger", post(monitoring::trigger_report))
        .route("/test-email", post(monitoring::send_test_email))
}

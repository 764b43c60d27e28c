//! Route definitions for admin-to-student communication.

use axum::routing::post;
use axum::Router;

use crate::handlers::communication;
use crate::state::AppState;

/// Communication routes mounted at `/admin/communication`.
///
/// ```text
/// POST /broadcast             -> send_broadcast
/// POST /students/{id}/email   -> send_individual_email
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/broadcast", post(communication::send_broadcast))
        .route(
            "/students/{id}/email",
            post(communication::send_individual_email),
        )
}

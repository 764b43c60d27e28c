//! Route definitions, one module per resource group.

use axum::Router;

use crate::state::AppState;

pub mod communication;
pub mod health;
pub mod monitoring;
pub mod notifications;

/// All routes mounted under `/api/v1`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/admin/monitoring", monitoring::router())
        .nest("/admin/communication", communication::router())
        .nest("/notifications", notifications::router())
}

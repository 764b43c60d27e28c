use std::sync::Arc;

use classtrack_notify::{EmailDispatcher, MailTransport};
use classtrack_report::JobScheduler;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: classtrack_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Email queue dispatcher (enqueue + manual sweep trigger).
    pub dispatcher: Arc<EmailDispatcher>,
    /// Daily job registry (manual report triggers).
    pub jobs: Arc<JobScheduler>,
    /// Direct mail transport (test email endpoint).
    pub transport: Arc<dyn MailTransport>,
}

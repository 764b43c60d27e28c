//! Report schedule configuration model.

use classtrack_core::types::DbId;
use serde::Serialize;
use sqlx::FromRow;

/// The single `report_schedule_config` row: hour and minute of day (24h)
/// at which the daily reports should run.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ScheduleConfig {
    pub id: DbId,
    pub report_hour: i32,
    pub report_minute: i32,
}

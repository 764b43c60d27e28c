//! Repository for the single-row `report_schedule_config` table.

use sqlx::PgPool;

use crate::models::schedule::ScheduleConfig;

/// Default report time when no configuration row exists yet.
const DEFAULT_REPORT_HOUR: i32 = 10;
const DEFAULT_REPORT_MINUTE: i32 = 45;

/// Provides persistence for the daily report schedule configuration.
pub struct ScheduleConfigRepo;

impl ScheduleConfigRepo {
    /// Fetch the configuration row, inserting the default (10:45) on first
    /// access so callers always see a concrete schedule.
    pub async fn get_or_default(pool: &PgPool) -> Result<ScheduleConfig, sqlx::Error> {
        let existing = sqlx::query_as::<_, ScheduleConfig>(
            "SELECT id, report_hour, report_minute FROM report_schedule_config \
             ORDER BY id ASC LIMIT 1",
        )
        .fetch_optional(pool)
        .await?;

        if let Some(config) = existing {
            return Ok(config);
        }

        sqlx::query_as::<_, ScheduleConfig>(
            "INSERT INTO report_schedule_config (report_hour, report_minute) \
             VALUES ($1, $2) \
             RETURNING id, report_hour, report_minute",
        )
        .bind(DEFAULT_REPORT_HOUR)
        .bind(DEFAULT_REPORT_MINUTE)
        .fetch_one(pool)
        .await
    }

    /// Update the configured hour and minute. Range validation is the
    /// caller's responsibility.
    pub async fn update(
        pool: &PgPool,
        hour: i32,
        minute: i32,
    ) -> Result<ScheduleConfig, sqlx::Error> {
        let current = Self::get_or_default(pool).await?;

        sqlx::query_as::<_, ScheduleConfig>(
            "UPDATE report_schedule_config \
             SET report_hour = $2, report_minute = $3 \
             WHERE id = $1 \
             RETURNING id, report_hour, report_minute",
        )
        .bind(current.id)
        .bind(hour)
        .bind(minute)
        .fetch_one(pool)
        .await
    }
}

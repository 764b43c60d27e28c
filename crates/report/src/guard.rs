//! Once-per-day run guard over the persisted report log.
//!
//! The guard re-reads the run log at every decision point rather than
//! caching status; the persisted row is the idempotency contract. An
//! in-memory in-flight set additionally closes the window where two trigger
//! paths fire inside the same polling tick, before either has written the
//! GENERATED row. The set is per-process, which matches the single-instance
//! deployment model.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};

use classtrack_core::trigger::{self, TriggerPath};
use classtrack_db::repositories::ReportLogRepo;
use classtrack_db::DbPool;

// ---------------------------------------------------------------------------
// RunLogStore
// ---------------------------------------------------------------------------

/// Persistence operations the guard needs from the run log.
#[async_trait]
pub trait RunLogStore: Send + Sync {
    /// Whether a SENT row exists for (date, job).
    async fn has_sent(&self, date: NaiveDate, job: &str) -> Result<bool, sqlx::Error>;

    /// Create or reset the day's row to GENERATED.
    async fn upsert_generated(
        &self,
        date: NaiveDate,
        job: &str,
        file_name: &str,
    ) -> Result<(), sqlx::Error>;

    /// Mark the day's row SENT.
    async fn mark_sent(&self, date: NaiveDate, job: &str) -> Result<(), sqlx::Error>;

    /// Mark the day's row FAILED with an error summary.
    async fn mark_failed(&self, date: NaiveDate, job: &str, error: &str)
        -> Result<(), sqlx::Error>;
}

/// Postgres-backed run log store.
#[derive(Clone)]
pub struct PgRunLogStore {
    pool: DbPool,
}

impl PgRunLogStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RunLogStore for PgRunLogStore {
    async fn has_sent(&self, date: NaiveDate, job: &str) -> Result<bool, sqlx::Error> {
        ReportLogRepo::has_sent(&self.pool, date, job).await
    }

    async fn upsert_generated(
        &self,
        date: NaiveDate,
        job: &str,
        file_name: &str,
    ) -> Result<(), sqlx::Error> {
        ReportLogRepo::upsert_generated(&self.pool, date, job, file_name).await?;
        Ok(())
    }

    async fn mark_sent(&self, date: NaiveDate, job: &str) -> Result<(), sqlx::Error> {
        ReportLogRepo::mark_sent(&self.pool, date, job).await
    }

    async fn mark_failed(
        &self,
        date: NaiveDate,
        job: &str,
        error: &str,
    ) -> Result<(), sqlx::Error> {
        ReportLogRepo::mark_failed(&self.pool, date, job, error).await
    }
}

// ---------------------------------------------------------------------------
// DailyRunGuard
// ---------------------------------------------------------------------------

/// Decides whether a daily job may fire now, and owns every status
/// transition of its run-log row.
pub struct DailyRunGuard {
    store: Arc<dyn RunLogStore>,
    in_flight: Mutex<HashSet<(NaiveDate, String)>>,
}

impl DailyRunGuard {
    pub fn new(store: Arc<dyn RunLogStore>) -> Self {
        Self {
            store,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Evaluate whether `job` should run at `now`.
    ///
    /// Returns `None` when a SENT row already exists for today (the day is
    /// done), otherwise the matching trigger window, if any. The SENT check
    /// hits the store on every call.
    pub async fn should_run(
        &self,
        job: &str,
        today: NaiveDate,
        scheduled: NaiveTime,
        now: NaiveTime,
        at_startup: bool,
    ) -> Result<Option<TriggerPath>, sqlx::Error> {
        if self.store.has_sent(today, job).await? {
            return Ok(None);
        }
        Ok(trigger::evaluate(now, scheduled, at_startup))
    }

    /// Fresh SENT re-check, used immediately before dispatch to narrow the
    /// window between the tick-level decision and the actual run.
    pub async fn already_sent(&self, job: &str, date: NaiveDate) -> Result<bool, sqlx::Error> {
        self.store.has_sent(date, job).await
    }

    /// Claim the in-process running slot for (job, date).
    ///
    /// Returns `false` if another task already holds it, closing the
    /// same-tick double-dispatch race. Must be paired with [`finish`].
    ///
    /// [`finish`]: DailyRunGuard::finish
    pub fn try_begin(&self, job: &str, date: NaiveDate) -> bool {
        self.in_flight
            .lock()
            .expect("in-flight lock poisoned")
            .insert((date, job.to_string()))
    }

    /// Release the in-process running slot for (job, date).
    pub fn finish(&self, job: &str, date: NaiveDate) {
        self.in_flight
            .lock()
            .expect("in-flight lock poisoned")
            .remove(&(date, job.to_string()));
    }

    /// Record that real work is starting: upsert the GENERATED row.
    pub async fn begin_run(
        &self,
        job: &str,
        date: NaiveDate,
        file_name: &str,
    ) -> Result<(), sqlx::Error> {
        self.store.upsert_generated(date, job, file_name).await
    }

    /// Record a successful run; every later window for the day goes quiet.
    pub async fn record_success(&self, job: &str, date: NaiveDate) -> Result<(), sqlx::Error> {
        self.store.mark_sent(date, job).await
    }

    /// Record a failed run; the day stays eligible for the next window.
    pub async fn record_failure(
        &self,
        job: &str,
        date: NaiveDate,
        error: &str,
    ) -> Result<(), sqlx::Error> {
        self.store.mark_failed(date, job, error).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

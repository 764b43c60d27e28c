//! Queue store seam consumed by the dispatcher.
//!
//! The dispatcher never touches SQL directly; it talks to [`EmailStore`] so
//! delivery semantics can be exercised against an in-memory double. The
//! production implementation delegates to
//! [`EmailQueueRepo`](classtrack_db::repositories::EmailQueueRepo).

use async_trait::async_trait;
use classtrack_core::types::DbId;
use classtrack_db::models::email::{EmailNotification, NewEmail};
use classtrack_db::repositories::EmailQueueRepo;
use classtrack_db::DbPool;

/// Persistence operations the dispatcher needs from the queue.
#[async_trait]
pub trait EmailStore: Send + Sync {
    /// Persist a new PENDING record, returning its id.
    async fn insert(&self, new: &NewEmail) -> Result<DbId, sqlx::Error>;

    /// Re-read one record.
    async fn get(&self, id: DbId) -> Result<Option<EmailNotification>, sqlx::Error>;

    /// Fetch up to `limit` PENDING/FAILED records, oldest first.
    async fn find_dispatchable(&self, limit: i64) -> Result<Vec<EmailNotification>, sqlx::Error>;

    /// Persist a successful attempt (SENT, error cleared, counter advanced).
    async fn record_success(&self, id: DbId, attempt: i32) -> Result<(), sqlx::Error>;

    /// Persist a failed attempt (FAILED, error stored, counter advanced).
    async fn record_failure(&self, id: DbId, attempt: i32, error: &str)
        -> Result<(), sqlx::Error>;
}

/// Postgres-backed queue store.
#[derive(Clone)]
pub struct PgEmailStore {
    pool: DbPool,
}

impl PgEmailStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EmailStore for PgEmailStore {
    async fn insert(&self, new: &NewEmail) -> Result<DbId, sqlx::Error> {
        EmailQueueRepo::insert(&self.pool, new).await
    }

    async fn get(&self, id: DbId) -> Result<Option<EmailNotification>, sqlx::Error> {
        EmailQueueRepo::get(&self.pool, id).await
    }

    async fn find_dispatchable(&self, limit: i64) -> Result<Vec<EmailNotification>, sqlx::Error> {
        EmailQueueRepo::find_dispatchable(&self.pool, limit).await
    }

    async fn record_success(&self, id: DbId, attempt: i32) -> Result<(), sqlx::Error> {
        EmailQueueRepo::record_success(&self.pool, id, attempt).await
    }

    async fn record_failure(
        &self,
        id: DbId,
        attempt: i32,
        error: &str,
    ) -> Result<(), sqlx::Error> {
        EmailQueueRepo::record_failure(&self.pool, id, attempt, error).await
    }
}

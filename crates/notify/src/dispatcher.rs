//! Bounded-retry email dispatch.
//!
//! [`EmailDispatcher`] owns every status transition of a queue record. One
//! invocation of [`dispatch`](EmailDispatcher::dispatch) performs exactly one
//! delivery attempt: it re-reads nothing and caches nothing across calls, so
//! the persisted row stays the single source of truth and a crashed attempt
//! is simply retried by the next sweep.

use std::sync::Arc;

use tokio::sync::Semaphore;

use classtrack_core::types::DbId;
use classtrack_db::models::email::{EmailNotification, EmailStatus, NewEmail};

use crate::error::NotifyError;
use crate::store::EmailStore;
use crate::template::TemplateRenderer;
use crate::transport::{MailTransport, OutboundEmail};

/// Maximum delivery attempts before a record is permanently abandoned.
pub const MAX_RETRIES: i32 = 3;

/// Upper bound on records fetched per sweep.
const SWEEP_BATCH_SIZE: i64 = 100;

/// Concurrent delivery workers per sweep. Sized for I/O-bound SMTP traffic;
/// unbounded fan-out against the relay is never acceptable.
const SWEEP_WORKERS: usize = 20;

// ---------------------------------------------------------------------------
// EmailDispatcher
// ---------------------------------------------------------------------------

/// Queues, sends, and retries outbound email.
///
/// Cheaply cloneable; all shared state lives behind `Arc`s. Safe to invoke
/// concurrently for different records: coordination happens through the
/// store's single-row atomic updates, not in memory.
#[derive(Clone)]
pub struct EmailDispatcher {
    store: Arc<dyn EmailStore>,
    transport: Arc<dyn MailTransport>,
    renderer: Arc<TemplateRenderer>,
    limiter: Arc<Semaphore>,
}

impl EmailDispatcher {
    pub fn new(
        store: Arc<dyn EmailStore>,
        transport: Arc<dyn MailTransport>,
        renderer: Arc<TemplateRenderer>,
    ) -> Self {
        Self {
            store,
            transport,
            renderer,
            limiter: Arc::new(Semaphore::new(SWEEP_WORKERS)),
        }
    }

    // -- producers ----------------------------------------------------------

    /// Queue an email and kick off an immediate best-effort delivery attempt.
    ///
    /// The caller gets the record id back as soon as the row is persisted;
    /// the attempt itself runs on a separate task and its outcome is only
    /// ever recorded on the row. The sweep retries failures later.
    pub async fn enqueue(&self, new: NewEmail) -> Result<DbId, NotifyError> {
        if new.to_email.trim().is_empty() {
            return Err(NotifyError::InvalidRecipient(
                "recipient address must not be empty".to_string(),
            ));
        }

        let id = self.store.insert(&new).await?;
        tracing::info!(id, to = %new.to_email, subject = %new.subject, "Queued email");

        let this = self.clone();
        tokio::spawn(async move {
            this.dispatch_by_id(id).await;
        });

        Ok(id)
    }

    /// Render an HTML template and queue the result.
    pub async fn enqueue_templated(
        &self,
        to_email: &str,
        subject: &str,
        template: &str,
        context: &tera::Context,
    ) -> Result<DbId, NotifyError> {
        let body = self.renderer.render(template, context)?;
        self.enqueue(NewEmail {
            to_email: to_email.to_string(),
            subject: subject.to_string(),
            body,
            is_html: true,
        })
        .await
    }

    // -- delivery -----------------------------------------------------------

    /// Re-read a record from the store and attempt delivery.
    pub async fn dispatch_by_id(&self, id: DbId) {
        match self.store.get(id).await {
            Ok(Some(record)) => self.dispatch(record).await,
            Ok(None) => tracing::warn!(id, "Email record vanished before dispatch"),
            Err(e) => tracing::error!(id, error = %e, "Failed to load email record for dispatch"),
        }
    }

    /// Attempt delivery of one record and persist the outcome.
    ///
    /// No-ops on terminal records: already SENT, or FAILED with the retry
    /// ceiling reached. Never propagates a delivery failure to the caller.
    pub async fn dispatch(&self, record: EmailNotification) {
        if record.status == EmailStatus::Sent {
            tracing::debug!(id = record.id, "Email already sent, nothing to do");
            return;
        }
        if record.status == EmailStatus::Failed && record.retry_count >= MAX_RETRIES {
            tracing::warn!(
                id = record.id,
                to = %record.to_email,
                retry_count = record.retry_count,
                "Skipping email, retry ceiling reached"
            );
            return;
        }

        let attempt = record.retry_count + 1;
        tracing::info!(id = record.id, to = %record.to_email, attempt, "Sending email");

        let outbound = OutboundEmail {
            to: record.to_email.clone(),
            subject: record.subject.clone(),
            body: record.body.clone(),
            is_html: record.is_html,
            attachment: None,
        };

        match self.transport.send(&outbound).await {
            Ok(()) => {
                if let Err(e) = self.store.record_success(record.id, attempt).await {
                    tracing::error!(id = record.id, error = %e, "Failed to persist delivery success");
                } else {
                    tracing::info!(id = record.id, to = %record.to_email, "Email sent");
                }
            }
            Err(err) => {
                tracing::error!(
                    id = record.id,
                    to = %record.to_email,
                    attempt,
                    error = %err,
                    "Email delivery failed"
                );
                if let Err(e) = self
                    .store
                    .record_failure(record.id, attempt, &err.to_string())
                    .await
                {
                    tracing::error!(id = record.id, error = %e, "Failed to persist delivery failure");
                }
            }
        }
    }

    // -- sweep body ---------------------------------------------------------

    /// One reconciliation pass over the queue.
    ///
    /// Fetches up to [`SWEEP_BATCH_SIZE`] PENDING/FAILED records oldest-first
    /// and dispatches each on its own task, gated by the worker semaphore.
    /// Does not wait for stragglers: a record still in flight when the next
    /// sweep fires may be picked up again, which is accepted at-least-once
    /// behaviour. Returns the number of records submitted.
    pub async fn process_pending(&self) -> Result<usize, NotifyError> {
        let batch = self.store.find_dispatchable(SWEEP_BATCH_SIZE).await?;
        if batch.is_empty() {
            tracing::debug!("No pending or failed emails to process");
            return Ok(0);
        }

        tracing::info!(count = batch.len(), "Processing pending/failed emails");
        let count = batch.len();

        for record in batch {
            let Ok(permit) = Arc::clone(&self.limiter).acquire_owned().await else {
                break;
            };
            let this = self.clone();
            tokio::spawn(async move {
                this.dispatch(record).await;
                drop(permit);
            });
        }

        Ok(count)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use chrono::Utc;

    use crate::transport::TransportError;

    use super::*;

    // -- test doubles ---------------------------------------------------------

    /// In-memory queue store mirroring the repo's update semantics.
    #[derive(Default)]
    struct MemoryEmailStore {
        rows: Mutex<Vec<EmailNotification>>,
    }

    impl MemoryEmailStore {
        fn push(&self, status: EmailStatus, retry_count: i32, to: &str) -> DbId {
            let mut rows = self.rows.lock().unwrap();
            let id = rows.len() as DbId + 1;
            rows.push(EmailNotification {
                id,
                to_email: to.to_string(),
                subject: "subject".to_string(),
                body: "body".to_string(),
                is_html: false,
                status,
                sent_at: None,
                retry_count,
                last_attempt_at: None,
                last_error: None,
                created_at: Utc::now(),
            });
            id
        }

        fn snapshot(&self, id: DbId) -> EmailNotification {
            self.rows
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.id == id)
                .cloned()
                .expect("record should exist")
        }
    }

    #[async_trait]
    impl EmailStore for MemoryEmailStore {
        async fn insert(&self, new: &NewEmail) -> Result<DbId, sqlx::Error> {
            let mut rows = self.rows.lock().unwrap();
            let id = rows.len() as DbId + 1;
            rows.push(EmailNotification {
                id,
                to_email: new.to_email.clone(),
                subject: new.subject.clone(),
                body: new.body.clone(),
                is_html: new.is_html,
                status: EmailStatus::Pending,
                sent_at: None,
                retry_count: 0,
                last_attempt_at: None,
                last_error: None,
                created_at: Utc::now(),
            });
            Ok(id)
        }

        async fn get(&self, id: DbId) -> Result<Option<EmailNotification>, sqlx::Error> {
            Ok(self.rows.lock().unwrap().iter().find(|r| r.id == id).cloned())
        }

        async fn find_dispatchable(
            &self,
            limit: i64,
        ) -> Result<Vec<EmailNotification>, sqlx::Error> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.status != EmailStatus::Sent)
                .take(limit as usize)
                .cloned()
                .collect())
        }

        async fn record_success(&self, id: DbId, attempt: i32) -> Result<(), sqlx::Error> {
            let mut rows = self.rows.lock().unwrap();
            if let Some(row) = rows.iter_mut().find(|r| r.id == id) {
                row.status = EmailStatus::Sent;
                row.sent_at = Some(Utc::now());
                row.last_attempt_at = Some(Utc::now());
                row.last_error = None;
                row.retry_count = attempt;
            }
            Ok(())
        }

        async fn record_failure(
            &self,
            id: DbId,
            attempt: i32,
            error: &str,
        ) -> Result<(), sqlx::Error> {
            let mut rows = self.rows.lock().unwrap();
            if let Some(row) = rows.iter_mut().find(|r| r.id == id) {
                row.status = EmailStatus::Failed;
                row.last_attempt_at = Some(Utc::now());
                row.last_error = Some(error.to_string());
                row.retry_count = attempt;
            }
            Ok(())
        }
    }

    /// Transport scripted to fail N times per recipient, then succeed.
    #[derive(Default)]
    struct MockTransport {
        failures_left: Mutex<HashMap<String, u32>>,
        attempts: Mutex<Vec<String>>,
    }

    impl MockTransport {
        fn failing(recipient: &str, times: u32) -> Self {
            let transport = Self::default();
            transport
                .failures_left
                .lock()
                .unwrap()
                .insert(recipient.to_string(), times);
            transport
        }

        fn attempt_count(&self) -> usize {
            self.attempts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl MailTransport for MockTransport {
        async fn send(&self, email: &OutboundEmail) -> Result<(), TransportError> {
            self.attempts.lock().unwrap().push(email.to.clone());
            let mut failures = self.failures_left.lock().unwrap();
            if let Some(remaining) = failures.get_mut(&email.to) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(TransportError::Build("simulated relay outage".to_string()));
                }
            }
            Ok(())
        }
    }

    fn dispatcher(
        store: Arc<MemoryEmailStore>,
        transport: Arc<MockTransport>,
    ) -> EmailDispatcher {
        let renderer = Arc::new(TemplateRenderer::new().expect("templates should compile"));
        EmailDispatcher::new(store, transport, renderer)
    }

    fn new_email(to: &str) -> NewEmail {
        NewEmail {
            to_email: to.to_string(),
            subject: "subject".to_string(),
            body: "body".to_string(),
            is_html: false,
        }
    }

    /// Poll until `check` passes; detached dispatch tasks need a beat.
    async fn wait_until(check: impl Fn() -> bool) {
        for _ in 0..300 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached within timeout");
    }

    // -- enqueue --------------------------------------------------------------

    #[tokio::test]
    async fn enqueue_rejects_empty_recipient() {
        let store = Arc::new(MemoryEmailStore::default());
        let transport = Arc::new(MockTransport::default());
        let dispatcher = dispatcher(Arc::clone(&store), transport);

        let result = dispatcher.enqueue(new_email("   ")).await;
        assert_matches!(result, Err(NotifyError::InvalidRecipient(_)));
        assert!(store.rows.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn enqueue_sends_immediately_when_transport_is_healthy() {
        let store = Arc::new(MemoryEmailStore::default());
        let transport = Arc::new(MockTransport::default());
        let dispatcher = dispatcher(Arc::clone(&store), Arc::clone(&transport));

        let id = dispatcher
            .enqueue(new_email("a@example.com"))
            .await
            .expect("enqueue should succeed");

        wait_until(|| store.snapshot(id).status == EmailStatus::Sent).await;

        let row = store.snapshot(id);
        assert_eq!(row.retry_count, 1);
        assert!(row.sent_at.is_some());
        assert!(row.last_error.is_none());
    }

    #[tokio::test]
    async fn failed_attempt_records_error_and_counter() {
        let store = Arc::new(MemoryEmailStore::default());
        let transport = Arc::new(MockTransport::failing("b@example.com", 1));
        let dispatcher = dispatcher(Arc::clone(&store), transport);

        let id = dispatcher
            .enqueue(new_email("b@example.com"))
            .await
            .expect("enqueue should succeed");

        wait_until(|| store.snapshot(id).status == EmailStatus::Failed).await;

        let row = store.snapshot(id);
        assert_eq!(row.retry_count, 1);
        assert!(row.last_error.as_deref().unwrap().contains("relay outage"));
        assert!(row.sent_at.is_none());
    }

    // -- ceiling and terminal states ------------------------------------------

    #[tokio::test]
    async fn retry_ceiling_leaves_record_untouched() {
        let store = Arc::new(MemoryEmailStore::default());
        let transport = Arc::new(MockTransport::default());
        let dispatcher = dispatcher(Arc::clone(&store), Arc::clone(&transport));

        let id = store.push(EmailStatus::Failed, MAX_RETRIES, "dead@example.com");
        let before = store.snapshot(id);

        dispatcher.dispatch(before.clone()).await;

        let after = store.snapshot(id);
        assert_eq!(after.status, EmailStatus::Failed);
        assert_eq!(after.retry_count, MAX_RETRIES);
        assert_eq!(transport.attempt_count(), 0);
    }

    #[tokio::test]
    async fn sent_record_is_never_redelivered() {
        let store = Arc::new(MemoryEmailStore::default());
        let transport = Arc::new(MockTransport::default());
        let dispatcher = dispatcher(Arc::clone(&store), Arc::clone(&transport));

        let id = store.push(EmailStatus::Sent, 1, "done@example.com");
        dispatcher.dispatch(store.snapshot(id)).await;

        assert_eq!(transport.attempt_count(), 0);
        assert_eq!(store.snapshot(id).status, EmailStatus::Sent);
    }

    // -- sweeping -------------------------------------------------------------

    #[tokio::test]
    async fn process_pending_is_a_noop_on_an_empty_queue() {
        let store = Arc::new(MemoryEmailStore::default());
        let transport = Arc::new(MockTransport::default());
        let dispatcher = dispatcher(store, transport);

        let submitted = dispatcher
            .process_pending()
            .await
            .expect("sweep should succeed");
        assert_eq!(submitted, 0);
    }

    #[tokio::test]
    async fn sweep_delivers_a_pending_record() {
        let store = Arc::new(MemoryEmailStore::default());
        let transport = Arc::new(MockTransport::default());
        let dispatcher = dispatcher(Arc::clone(&store), transport);

        // Row that never got an immediate attempt (e.g. queued before a crash).
        let id = store.push(EmailStatus::Pending, 0, "recovered@example.com");

        let submitted = dispatcher
            .process_pending()
            .await
            .expect("sweep should succeed");
        assert_eq!(submitted, 1);

        wait_until(|| store.snapshot(id).status == EmailStatus::Sent).await;
        assert_eq!(store.snapshot(id).retry_count, 1);
    }

    #[tokio::test]
    async fn two_clean_sends_and_one_third_attempt_success() {
        let store = Arc::new(MemoryEmailStore::default());
        let transport = Arc::new(MockTransport::failing("flaky@example.com", 2));
        let dispatcher = dispatcher(Arc::clone(&store), transport);

        let a = dispatcher.enqueue(new_email("a@example.com")).await.unwrap();
        let b = dispatcher.enqueue(new_email("b@example.com")).await.unwrap();
        let flaky = dispatcher
            .enqueue(new_email("flaky@example.com"))
            .await
            .unwrap();

        // Immediate attempts: a and b succeed, flaky fails once.
        wait_until(|| {
            store.snapshot(a).status == EmailStatus::Sent
                && store.snapshot(b).status == EmailStatus::Sent
                && store.snapshot(flaky).retry_count == 1
        })
        .await;

        // Second sweep: flaky fails again.
        dispatcher.process_pending().await.unwrap();
        wait_until(|| store.snapshot(flaky).retry_count == 2).await;
        assert_eq!(store.snapshot(flaky).status, EmailStatus::Failed);

        // Third sweep: flaky finally goes out.
        dispatcher.process_pending().await.unwrap();
        wait_until(|| store.snapshot(flaky).status == EmailStatus::Sent).await;

        for id in [a, b] {
            let row = store.snapshot(id);
            assert_eq!(row.retry_count, 1);
            assert_eq!(row.status, EmailStatus::Sent);
        }
        let row = store.snapshot(flaky);
        assert_eq!(row.retry_count, MAX_RETRIES);
        assert_eq!(row.status, EmailStatus::Sent);
        assert!(row.last_error.is_none());
    }

    #[tokio::test]
    async fn templated_enqueue_renders_html_body() {
        let store = Arc::new(MemoryEmailStore::default());
        let transport = Arc::new(MockTransport::default());
        let dispatcher = dispatcher(Arc::clone(&store), transport);

        let mut ctx = tera::Context::new();
        ctx.insert("subject", "Welcome");
        ctx.insert("message", "Glad to have you.");
        ctx.insert("name", "Ade");

        let id = dispatcher
            .enqueue_templated(
                "c@example.com",
                "Welcome",
                TemplateRenderer::STUDENT_EMAIL,
                &ctx,
            )
            .await
            .expect("templated enqueue should succeed");

        let row = store.snapshot(id);
        assert!(row.is_html);
        assert!(row.body.contains("Ade"));
    }
}

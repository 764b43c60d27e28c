//! Periodic reconciliation sweep over the email queue.
//!
//! [`SweepScheduler`] runs as a background task and hands each tick to
//! [`EmailDispatcher::process_pending`]. A slow relay never delays the next
//! tick: delivery runs on worker tasks, and the loop itself only fetches and
//! submits. The loop exits gracefully when the provided
//! [`CancellationToken`] is cancelled.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::dispatcher::EmailDispatcher;

/// How often the queue is re-scanned for PENDING/FAILED records.
const DEFAULT_SWEEP_PERIOD: Duration = Duration::from_secs(60);

/// Background service that retries not-yet-delivered email on a fixed period.
pub struct SweepScheduler {
    dispatcher: Arc<EmailDispatcher>,
    period: Duration,
}

impl SweepScheduler {
    /// Create a scheduler with the default one-minute period.
    pub fn new(dispatcher: Arc<EmailDispatcher>) -> Self {
        Self::with_period(dispatcher, DEFAULT_SWEEP_PERIOD)
    }

    /// Create a scheduler with a custom period (tests, tuning).
    pub fn with_period(dispatcher: Arc<EmailDispatcher>, period: Duration) -> Self {
        Self { dispatcher, period }
    }

    /// Run the sweep loop until cancelled.
    ///
    /// A failing tick is logged and the loop carries on; one bad batch must
    /// never kill the scheduler.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.period);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Email sweep scheduler cancelled");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.dispatcher.process_pending().await {
                        tracing::error!(error = %e, "Email sweep failed");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;
    use classtrack_core::types::DbId;
    use classtrack_db::models::email::{EmailNotification, EmailStatus, NewEmail};

    use crate::store::EmailStore;
    use crate::template::TemplateRenderer;
    use crate::transport::{MailTransport, OutboundEmail, TransportError};

    /// Store with a single pending row that flips to SENT on success.
    #[derive(Default)]
    struct OneRowStore {
        sent: Mutex<bool>,
    }

    #[async_trait]
    impl EmailStore for OneRowStore {
        async fn insert(&self, _new: &NewEmail) -> Result<DbId, sqlx::Error> {
            Ok(1)
        }

        async fn get(&self, _id: DbId) -> Result<Option<EmailNotification>, sqlx::Error> {
            Ok(None)
        }

        async fn find_dispatchable(
            &self,
            _limit: i64,
        ) -> Result<Vec<EmailNotification>, sqlx::Error> {
            if *self.sent.lock().unwrap() {
                return Ok(vec![]);
            }
            Ok(vec![EmailNotification {
                id: 1,
                to_email: "swept@example.com".to_string(),
                subject: "subject".to_string(),
                body: "body".to_string(),
                is_html: false,
                status: EmailStatus::Pending,
                sent_at: None,
                retry_count: 0,
                last_attempt_at: None,
                last_error: None,
                created_at: Utc::now(),
            }])
        }

        async fn record_success(&self, _id: DbId, _attempt: i32) -> Result<(), sqlx::Error> {
            *self.sent.lock().unwrap() = true;
            Ok(())
        }

        async fn record_failure(
            &self,
            _id: DbId,
            _attempt: i32,
            _error: &str,
        ) -> Result<(), sqlx::Error> {
            Ok(())
        }
    }

    struct OkTransport;

    #[async_trait]
    impl MailTransport for OkTransport {
        async fn send(&self, _email: &OutboundEmail) -> Result<(), TransportError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn sweep_delivers_and_stops_on_cancel() {
        let store = Arc::new(OneRowStore::default());
        let renderer = Arc::new(TemplateRenderer::new().expect("templates should compile"));
        let dispatcher = Arc::new(EmailDispatcher::new(
            Arc::clone(&store) as Arc<dyn EmailStore>,
            Arc::new(OkTransport),
            renderer,
        ));

        let scheduler =
            SweepScheduler::with_period(dispatcher, Duration::from_millis(10));
        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();

        let handle = tokio::spawn(async move { scheduler.run(cancel_clone).await });

        // First tick fires immediately; wait for the record to flip.
        for _ in 0..300 {
            if *store.sent.lock().unwrap() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(*store.sent.lock().unwrap());

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("scheduler should exit after cancellation")
            .expect("scheduler task should not panic");
    }
}

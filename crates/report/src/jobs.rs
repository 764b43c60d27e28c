//! Daily job registry and scheduler.
//!
//! Every scheduled daily job is a [`ReportJob`] value in one registry,
//! evaluated by a single per-minute loop through the guard; there is no
//! per-job cron wiring. The end-of-day fallback needs no dedicated trigger
//! either: the tick loop's own evaluation fires the hard-cutoff window once
//! the cutoff hour is reached.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate, NaiveTime};
use tokio_util::sync::CancellationToken;

use classtrack_core::trigger::{self, TriggerPath};
use classtrack_db::repositories::{BroadcastTemplateRepo, NotificationRepo, ReportRepo, ScheduleConfigRepo};
use classtrack_db::DbPool;
use classtrack_notify::{
    Attachment, EmailDispatcher, MailTransport, NotifyError, OutboundEmail, TransportError,
};

use crate::broadcast;
use crate::content;
use crate::guard::DailyRunGuard;

/// How often the job registry is evaluated.
const TICK_PERIOD: Duration = Duration::from_secs(60);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for report job execution.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// Manual trigger named a job that is not registered.
    #[error("Unknown report job: {0}")]
    UnknownJob(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The report email could not be handed to the transport.
    #[error("Mail transport error: {0}")]
    Transport(#[from] TransportError),

    /// The broadcast fan-out could not queue its mail.
    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),
}

// ---------------------------------------------------------------------------
// ReportJob
// ---------------------------------------------------------------------------

/// What a registered job actually does when its window fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    /// Email the per-student progress CSV to the admin.
    StudentProgress,
    /// Email the per-subject analytics CSV to the admin.
    ProgressAnalytics,
    /// Replay the latest stored broadcast message to all students.
    DailyBroadcast,
}

/// One daily job: pure data, owned by the registry.
#[derive(Debug, Clone, Copy)]
pub struct ReportJob {
    /// Stable identifier, also the run-log `job_name`.
    pub name: &'static str,
    /// Human-readable title used in mail subjects and notifications.
    pub title: &'static str,
    pub kind: JobKind,
}

impl ReportJob {
    /// Attachment (or log) file name for one day's run.
    pub fn file_name(&self, date: NaiveDate) -> String {
        match self.kind {
            JobKind::DailyBroadcast => format!("{}-{}", self.name, date.format("%Y-%m-%d")),
            _ => format!("{}-{}.csv", self.name, date.format("%Y-%m-%d")),
        }
    }
}

/// Every daily job the scheduler knows about.
const JOBS: [ReportJob; 3] = [
    ReportJob {
        name: "student-progress",
        title: "Daily Student Progress Report",
        kind: JobKind::StudentProgress,
    },
    ReportJob {
        name: "progress-analytics",
        title: "Progress Analytics Report",
        kind: JobKind::ProgressAnalytics,
    },
    ReportJob {
        name: "daily-broadcast",
        title: "Daily Broadcast Email",
        kind: JobKind::DailyBroadcast,
    },
];

// ---------------------------------------------------------------------------
// JobScheduler
// ---------------------------------------------------------------------------

/// Background service evaluating the daily job registry once per minute.
pub struct JobScheduler {
    pool: DbPool,
    guard: DailyRunGuard,
    transport: Arc<dyn MailTransport>,
    dispatcher: Arc<EmailDispatcher>,
    admin_email: String,
    jobs: Vec<ReportJob>,
}

impl JobScheduler {
    pub fn new(
        pool: DbPool,
        guard: DailyRunGuard,
        transport: Arc<dyn MailTransport>,
        dispatcher: Arc<EmailDispatcher>,
        admin_email: String,
    ) -> Self {
        Self {
            pool,
            guard,
            transport,
            dispatcher,
            admin_email,
            jobs: JOBS.to_vec(),
        }
    }

    /// Run the scheduler loop until cancelled.
    ///
    /// Starts with a catch-up pass so a process that was down over its
    /// configured time still delivers today's reports, then evaluates the
    /// registry every minute.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(jobs = self.jobs.len(), "Daily job scheduler starting, running startup check");
        self.tick(true).await;

        let mut interval = tokio::time::interval(TICK_PERIOD);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Daily job scheduler cancelled");
                    break;
                }
                _ = interval.tick() => {
                    self.tick(false).await;
                }
            }
        }
    }

    /// Evaluate every registered job against the current wall clock.
    async fn tick(&self, at_startup: bool) {
        let now = Local::now();
        let today = now.date_naive();
        let time = now.time();

        for job in &self.jobs {
            let scheduled = match self.scheduled_time(job).await {
                Ok(t) => t,
                Err(e) => {
                    tracing::error!(job = job.name, error = %e, "Failed to load schedule configuration");
                    continue;
                }
            };

            match self
                .guard
                .should_run(job.name, today, scheduled, time, at_startup)
                .await
            {
                Ok(Some(path)) => {
                    self.log_trigger(job, path, time, scheduled);
                    if let Err(e) = self.run_and_record(job, today, false).await {
                        tracing::error!(job = job.name, error = %e, "Scheduled job failed");
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(job = job.name, error = %e, "Trigger evaluation failed");
                }
            }
        }
    }

    fn log_trigger(&self, job: &ReportJob, path: TriggerPath, now: NaiveTime, scheduled: NaiveTime) {
        match path {
            TriggerPath::ExactTime => {
                tracing::info!(job = job.name, %scheduled, "Scheduled time reached, running job");
            }
            TriggerPath::Startup | TriggerPath::LateCatchUp | TriggerPath::HardCutoff => {
                tracing::warn!(
                    job = job.name,
                    trigger = path.label(),
                    %now,
                    %scheduled,
                    "No successful run recorded today, running job via fallback window"
                );
            }
        }
    }

    /// Resolve the configured time-of-day for a job.
    ///
    /// Reports use the runtime-editable schedule; the broadcast is pinned to
    /// the cutoff hour.
    async fn scheduled_time(&self, job: &ReportJob) -> Result<NaiveTime, sqlx::Error> {
        match job.kind {
            JobKind::DailyBroadcast => Ok(NaiveTime::from_hms_opt(
                trigger::HARD_CUTOFF_HOUR,
                0,
                0,
            )
            .unwrap_or(NaiveTime::MIN)),
            _ => {
                let config = ScheduleConfigRepo::get_or_default(&self.pool).await?;
                Ok(
                    NaiveTime::from_hms_opt(config.report_hour as u32, config.report_minute as u32, 0)
                        .unwrap_or(NaiveTime::MIN),
                )
            }
        }
    }

    /// Manually trigger a job, bypassing the once-per-day check.
    ///
    /// Still writes the same run-log row as a scheduled run, so monitoring
    /// reflects manual runs too.
    pub async fn run_manually(&self, job_name: &str) -> Result<(), ReportError> {
        let job = self
            .jobs
            .iter()
            .find(|j| j.name == job_name)
            .copied()
            .ok_or_else(|| ReportError::UnknownJob(job_name.to_string()))?;

        let date = Local::now().date_naive();
        tracing::info!(job = job.name, %date, "Manual trigger");
        self.run_and_record(&job, date, true).await
    }

    /// Claim the in-flight slot, execute, and persist a failure outcome.
    async fn run_and_record(
        &self,
        job: &ReportJob,
        date: NaiveDate,
        force: bool,
    ) -> Result<(), ReportError> {
        if !self.guard.try_begin(job.name, date) {
            tracing::info!(job = job.name, %date, "Run already in flight, skipping");
            return Ok(());
        }

        let result = self.execute(job, date, force).await;
        self.guard.finish(job.name, date);

        if let Err(ref e) = result {
            if let Err(log_err) = self.guard.record_failure(job.name, date, &e.to_string()).await
            {
                tracing::error!(job = job.name, error = %log_err, "Failed to persist run failure");
            }
        }
        result
    }

    /// Do the job's real work for one day.
    async fn execute(&self, job: &ReportJob, date: NaiveDate, force: bool) -> Result<(), ReportError> {
        // Re-check right before doing work: another window may have finished
        // the day between the tick decision and now.
        if !force && self.guard.already_sent(job.name, date).await? {
            tracing::info!(job = job.name, %date, "Already sent today, nothing to do");
            return Ok(());
        }

        if job.kind == JobKind::DailyBroadcast {
            return self.execute_broadcast(job, date).await;
        }

        let file_name = job.file_name(date);
        self.guard.begin_run(job.name, date, &file_name).await?;

        let csv = if job.kind == JobKind::StudentProgress {
            let rows = ReportRepo::student_progress(&self.pool).await?;
            tracing::info!(job = job.name, students = rows.len(), "Report content generated");
            content::student_progress_csv(&rows)
        } else {
            let rows = ReportRepo::subject_breakdown(&self.pool).await?;
            tracing::info!(job = job.name, subjects = rows.len(), "Report content generated");
            content::subject_breakdown_csv(&rows)
        };

        self.send_report(job, date, &file_name, csv).await?;
        self.guard.record_success(job.name, date).await?;
        tracing::info!(job = job.name, %date, to = %self.admin_email, "Report generated and emailed");

        self.notify_admin(job, date).await;
        Ok(())
    }

    /// Nightly broadcast: replay the latest stored message to all students.
    async fn execute_broadcast(&self, job: &ReportJob, date: NaiveDate) -> Result<(), ReportError> {
        // Without a stored template there is nothing to replay; leave the
        // day's log untouched rather than recording an empty run.
        let Some(template) = BroadcastTemplateRepo::latest(&self.pool).await? else {
            tracing::info!("No broadcast template stored, skipping nightly broadcast");
            return Ok(());
        };

        self.guard
            .begin_run(job.name, date, &job.file_name(date))
            .await?;

        let recipients =
            broadcast::send_to_students(&self.pool, &self.dispatcher, &template.subject, &template.message)
                .await?;

        self.guard.record_success(job.name, date).await?;
        tracing::info!(
            template_id = template.id,
            recipients,
            "Nightly broadcast queued"
        );
        Ok(())
    }

    /// Email one report as a CSV attachment, directly through the transport
    /// so success is known before the run log is marked SENT.
    async fn send_report(
        &self,
        job: &ReportJob,
        date: NaiveDate,
        file_name: &str,
        csv: String,
    ) -> Result<(), ReportError> {
        let email = OutboundEmail {
            to: self.admin_email.clone(),
            subject: format!("{} - {}", job.title, date.format("%Y-%m-%d")),
            body: format!(
                "Please find attached the {}.\n\n\
                 This is an automated report generated by the ClassTrack student management system.",
                job.title.to_lowercase()
            ),
            is_html: false,
            attachment: Some(Attachment {
                file_name: file_name.to_string(),
                content_type: "text/csv".to_string(),
                bytes: csv.into_bytes(),
            }),
        };

        self.transport.send(&email).await?;
        Ok(())
    }

    /// Leave an in-app notification about the delivered report. Best-effort:
    /// the report already went out.
    async fn notify_admin(&self, job: &ReportJob, date: NaiveDate) {
        let message = format!(
            "{} for {} has been emailed to {}",
            job.title, date, self.admin_email
        );
        if let Err(e) = NotificationRepo::create(&self.pool, "Daily report emailed", &message).await
        {
            tracing::warn!(error = %e, "Failed to create in-app notification for report");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

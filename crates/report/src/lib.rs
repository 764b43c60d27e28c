//! Daily report jobs and the once-per-day trigger guard.
//!
//! A scheduled report must go out exactly once per calendar day, but the
//! only primitive available is a per-minute poll. [`DailyRunGuard`] combines
//! the persisted run log with the pure trigger-window logic from
//! `classtrack_core::trigger`; [`JobScheduler`] owns every daily job as data
//! and pushes each through that single decision function.

pub mod broadcast;
pub mod content;
pub mod guard;
pub mod jobs;

pub use guard::{DailyRunGuard, PgRunLogStore, RunLogStore};
pub use jobs::{JobKind, JobScheduler, ReportError, ReportJob};

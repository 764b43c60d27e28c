//! Asynchronous email delivery engine.
//!
//! Outbound mail is a persisted work queue: producers enqueue a PENDING
//! record and get an immediate best-effort send on a separate task, while
//! the periodic sweep re-scans the store and retries anything not yet
//! delivered. Retries are data (persisted counters), so they survive
//! process restarts.
//!
//! - [`MailTransport`] — the SMTP seam ([`SmtpMailer`] / [`NoopMailer`]).
//! - [`TemplateRenderer`] — HTML mail bodies via `tera`.
//! - [`EmailDispatcher`] — bounded-retry delivery of one record at a time.
//! - [`SweepScheduler`] — periodic batch reconciliation over the queue.

pub mod dispatcher;
pub mod error;
pub mod store;
pub mod sweep;
pub mod template;
pub mod transport;

pub use dispatcher::{EmailDispatcher, MAX_RETRIES};
pub use error::NotifyError;
pub use store::{EmailStore, PgEmailStore};
pub use sweep::SweepScheduler;
pub use template::TemplateRenderer;
pub use transport::{
    Attachment, MailTransport, NoopMailer, OutboundEmail, SmtpConfig, SmtpMailer, TransportError,
};

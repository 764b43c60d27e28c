//! Mail transport seam and SMTP implementation.
//!
//! [`MailTransport`] abstracts the actual delivery so the dispatcher and the
//! report jobs consume a typed result instead of transport exceptions.
//! [`SmtpMailer`] wraps the `lettre` async SMTP transport; [`NoopMailer`]
//! logs and succeeds, for environments without an SMTP relay.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for mail delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// SMTP transport-level failure (authentication, connection, timeout).
    #[error("SMTP transport error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

// ---------------------------------------------------------------------------
// OutboundEmail
// ---------------------------------------------------------------------------

/// A file attached to an outbound email.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub file_name: String,
    /// MIME type, e.g. `text/csv`.
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// One message handed to the transport.
#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub is_html: bool,
    pub attachment: Option<Attachment>,
}

// ---------------------------------------------------------------------------
// MailTransport
// ---------------------------------------------------------------------------

/// Sends one email, reporting failure as a typed result.
///
/// Implementations must be safe to call concurrently; the sweep fans out
/// tens of sends at a time.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<(), TransportError>;
}

// ---------------------------------------------------------------------------
// SmtpConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when `SMTP_FROM` is not set.
const DEFAULT_FROM_ADDRESS: &str = "noreply@classtrack.local";

/// Configuration for the SMTP mailer.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    /// SMTP server hostname.
    pub smtp_host: String,
    /// SMTP server port (defaults to 587).
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    /// Optional SMTP username.
    pub smtp_user: Option<String>,
    /// Optional SMTP password.
    pub smtp_password: Option<String>,
}

impl SmtpConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `SMTP_HOST` is not set, signalling that real mail
    /// delivery is not configured and [`NoopMailer`] should be used instead.
    ///
    /// | Variable        | Required | Default                     |
    /// |-----------------|----------|-----------------------------|
    /// | `SMTP_HOST`     | yes      | —                           |
    /// | `SMTP_PORT`     | no       | `587`                       |
    /// | `SMTP_FROM`     | no       | `noreply@classtrack.local`  |
    /// | `SMTP_USER`     | no       | —                           |
    /// | `SMTP_PASSWORD` | no       | —                           |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok()?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }
}

// ---------------------------------------------------------------------------
// SmtpMailer
// ---------------------------------------------------------------------------

/// Sends email through a STARTTLS SMTP relay.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpMailer {
    /// Build the relay connection pool from configuration.
    pub fn new(config: SmtpConfig) -> Result<Self, TransportError> {
        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
                .port(config.smtp_port);

        if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from_address: config.from_address,
        })
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), TransportError> {
        let message = build_message(&self.from_address, email)?;
        self.transport.send(message).await?;
        tracing::info!(to = %email.to, subject = %email.subject, "Email handed to SMTP relay");
        Ok(())
    }
}

/// Assemble the MIME message: a single text or HTML part, wrapped in a
/// mixed multipart when an attachment is present.
fn build_message(from: &str, email: &OutboundEmail) -> Result<Message, TransportError> {
    let builder = Message::builder()
        .from(from.parse()?)
        .to(email.to.parse()?)
        .subject(&email.subject);

    let content_type = if email.is_html {
        ContentType::TEXT_HTML
    } else {
        ContentType::TEXT_PLAIN
    };
    let body_part = SinglePart::builder()
        .header(content_type)
        .body(email.body.clone());

    match &email.attachment {
        None => builder
            .singlepart(body_part)
            .map_err(|e| TransportError::Build(e.to_string())),
        Some(att) => {
            let att_type = ContentType::parse(&att.content_type)
                .map_err(|e| TransportError::Build(e.to_string()))?;
            let att_part =
                lettre::message::Attachment::new(att.file_name.clone()).body(att.bytes.clone(), att_type);
            builder
                .multipart(MultiPart::mixed().singlepart(body_part).singlepart(att_part))
                .map_err(|e| TransportError::Build(e.to_string()))
        }
    }
}

// ---------------------------------------------------------------------------
// NoopMailer
// ---------------------------------------------------------------------------

/// Transport that skips delivery and logs instead.
///
/// Used when no SMTP relay is configured, so the rest of the engine keeps
/// working and queued mail is visibly "delivered" in development.
#[derive(Debug, Clone, Default)]
pub struct NoopMailer;

#[async_trait]
impl MailTransport for NoopMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), TransportError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            "SMTP not configured, skipping actual delivery"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_email() -> OutboundEmail {
        OutboundEmail {
            to: "student@example.com".to_string(),
            subject: "Hello".to_string(),
            body: "Plain body".to_string(),
            is_html: false,
            attachment: None,
        }
    }

    // -- config ---------------------------------------------------------------

    #[test]
    fn from_env_returns_none_without_smtp_host() {
        // Ensure SMTP_HOST is not set in the test environment.
        std::env::remove_var("SMTP_HOST");
        assert!(SmtpConfig::from_env().is_none());
    }

    // -- message building -----------------------------------------------------

    #[test]
    fn builds_plain_text_message() {
        let message = build_message("noreply@classtrack.local", &plain_email())
            .expect("plain message should build");
        let raw = String::from_utf8_lossy(&message.formatted()).to_string();
        assert!(raw.contains("Subject: Hello"));
        assert!(raw.contains("Plain body"));
    }

    #[test]
    fn builds_html_message() {
        let mut email = plain_email();
        email.is_html = true;
        email.body = "<h1>Hi</h1>".to_string();
        let message =
            build_message("noreply@classtrack.local", &email).expect("html message should build");
        let raw = String::from_utf8_lossy(&message.formatted()).to_string();
        assert!(raw.contains("text/html"));
    }

    #[test]
    fn builds_message_with_csv_attachment() {
        let mut email = plain_email();
        email.attachment = Some(Attachment {
            file_name: "report.csv".to_string(),
            content_type: "text/csv".to_string(),
            bytes: b"a,b\n1,2\n".to_vec(),
        });
        let message = build_message("noreply@classtrack.local", &email)
            .expect("attachment message should build");
        let raw = String::from_utf8_lossy(&message.formatted()).to_string();
        assert!(raw.contains("multipart/mixed"));
        assert!(raw.contains("report.csv"));
    }

    #[test]
    fn rejects_unparseable_recipient() {
        let mut email = plain_email();
        email.to = "not-an-address".to_string();
        let err = build_message("noreply@classtrack.local", &email)
            .expect_err("invalid recipient must fail");
        assert!(err.to_string().contains("Email address parse error"));
    }

    // -- error display --------------------------------------------------------

    #[test]
    fn transport_error_display_build() {
        let err = TransportError::Build("missing body".to_string());
        assert_eq!(err.to_string(), "Email build error: missing body");
    }
}

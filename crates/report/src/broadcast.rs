//! Broadcast mail fan-out to the student roster.
//!
//! Used by both the admin broadcast endpoint and the nightly broadcast job.
//! Each recipient goes through the queued dispatch path, so delivery
//! failures are retried by the sweep instead of aborting the fan-out.

use classtrack_db::repositories::StudentRepo;
use classtrack_db::DbPool;
use classtrack_notify::{EmailDispatcher, NotifyError, TemplateRenderer};

/// Queue a templated email to every student with an address.
///
/// Returns the number of recipients queued. A single student failing to
/// queue is logged and skipped.
pub async fn send_to_students(
    pool: &DbPool,
    dispatcher: &EmailDispatcher,
    subject: &str,
    message: &str,
) -> Result<usize, NotifyError> {
    let students = StudentRepo::list_with_email(pool).await?;

    let mut queued = 0;
    for student in &students {
        let Some(email) = student.email.as_deref() else {
            continue;
        };

        let mut ctx = tera::Context::new();
        ctx.insert("subject", subject);
        ctx.insert("message", message);
        ctx.insert("name", &student.name);
        if let Some(branch) = &student.branch {
            ctx.insert("branch", branch);
        }

        match dispatcher
            .enqueue_templated(email, subject, TemplateRenderer::STUDENT_EMAIL, &ctx)
            .await
        {
            Ok(_) => queued += 1,
            Err(e) => {
                tracing::error!(
                    student = %student.name,
                    email,
                    error = %e,
                    "Failed to queue broadcast email"
                );
            }
        }
    }

    tracing::info!(queued, total = students.len(), "Broadcast emails queued");
    Ok(queued)
}

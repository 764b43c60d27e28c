//! HTML mail body rendering.
//!
//! Templates are compiled into the binary; variables come in as a
//! [`tera::Context`] built by the producer.

use tera::Tera;

/// Renders mail bodies from embedded `tera` templates.
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Template used for broadcast and individual student emails.
    pub const STUDENT_EMAIL: &'static str = "student-email.html";

    /// Compile the embedded templates.
    pub fn new() -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.add_raw_template(
            Self::STUDENT_EMAIL,
            include_str!("../templates/student_email.html"),
        )?;
        Ok(Self { tera })
    }

    /// Render `template` with the given variables.
    pub fn render(&self, template: &str, context: &tera::Context) -> Result<String, tera::Error> {
        self.tera.render(template, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_student_email_with_name() {
        let renderer = TemplateRenderer::new().expect("templates should compile");
        let mut ctx = tera::Context::new();
        ctx.insert("subject", "Exam schedule");
        ctx.insert("message", "Finals start Monday.");
        ctx.insert("name", "Priya");

        let html = renderer
            .render(TemplateRenderer::STUDENT_EMAIL, &ctx)
            .expect("render should succeed");
        assert!(html.contains("Exam schedule"));
        assert!(html.contains("Priya"));
        assert!(html.contains("Finals start Monday."));
    }

    #[test]
    fn renders_student_email_without_name() {
        let renderer = TemplateRenderer::new().expect("templates should compile");
        let mut ctx = tera::Context::new();
        ctx.insert("subject", "Notice");
        ctx.insert("message", "Campus closed tomorrow.");

        let html = renderer
            .render(TemplateRenderer::STUDENT_EMAIL, &ctx)
            .expect("render should succeed");
        assert!(html.contains("Campus closed tomorrow."));
        assert!(!html.contains("Dear"));
    }

    #[test]
    fn unknown_template_is_an_error() {
        let renderer = TemplateRenderer::new().expect("templates should compile");
        let ctx = tera::Context::new();
        assert!(renderer.render("no-such-template", &ctx).is_err());
    }
}

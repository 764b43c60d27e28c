/// Error type for enqueue-side failures of the delivery engine.
///
/// Delivery failures themselves never surface here: the dispatcher records
/// them on the queue row instead of propagating (fire-and-forget contract).
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The producer supplied an unusable recipient; nothing was persisted.
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    /// The mail template could not be rendered.
    #[error("Template rendering failed: {0}")]
    Template(#[from] tera::Error),

    /// The queue store rejected the operation.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

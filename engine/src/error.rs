use thiserror::Error;

use fill_protocol::OperatorError;

/// The error kinds from spec.md §7. All are caught at the event boundary
/// inside the dispatcher's per-event task; nothing ever escapes the
/// dispatcher loop itself.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("transient operator error: {0}")]
    TransientOperator(#[from] OperatorError),

    #[error("validation error: {0}")]
    Validation(String),

    /// Content was empty, a known redirect URL, or a sentinel null
    /// string. Not retried; the cell is not written; the chain halts.
    /// The event is still marked `completed` (there is nothing more to
    /// do) per spec.md's documented default for this open question.
    #[error("rejected write: {0}")]
    RejectedWrite(String),

    #[error("structured output failed schema validation: {0}")]
    Schema(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl PipelineError {
    /// Whether this error kind is eligible for the dispatcher's
    /// in-process retry-with-improvement loop (subject to the retry
    /// bound being respected separately).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TransientOperator(_) | Self::Validation(_) | Self::Schema(_)
        )
    }
}

//! Crate-wide error hierarchy. Variants map 1:1 onto the error kinds of the
//! taxonomy this crate implements; [`ReviewError::is_retryable`] is the only
//! thing the scheduler's retry policy consults.

use thiserror::Error;

pub type ReviewResult<T> = Result<T, ReviewError>;

#[derive(Debug, Error)]
pub enum ReviewError {
    /// A pre-review gate rejected the review; recovered locally, never
    /// retried. The review itself ends in SKIPPED with this as the reason.
    #[error("gate failure: {0}")]
    GateFailure(String),

    /// Cooperative cancellation, not a fault: a newer commit overtook this
    /// review before the AI call was paid for.
    #[error("superseded by newer commit {0}")]
    Superseded(String),

    /// Network or 5xx from the hosting platform. Retried by the scheduler.
    #[error(transparent)]
    HostingTransient(#[from] HostingTransientError),

    /// 4xx (other than 401) from the hosting platform. Terminal.
    #[error("hosting platform rejected the request: {0}")]
    HostingPermanent(String),

    /// The AI endpoint raised or returned an error envelope. Retried.
    #[error("ai endpoint error: {0}")]
    AiError(String),

    /// A logic fault, not an external condition — e.g. a scheduled job
    /// referencing an installation the store no longer has.
    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),
}

/// Wrapper so `#[from]` can distinguish a transient hosting failure from the
/// rest of [`hosting_client::HostingError`]'s variants at the `?` boundary.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct HostingTransientError(pub String);

impl ReviewError {
    /// Only `HostingTransient` and `AiError` are retried by the scheduler's
    /// worker loop; every other kind already resolved the Review to a
    /// terminal status and retrying would repeat settled work.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReviewError::HostingTransient(_) | ReviewError::AiError(_))
    }
}

impl From<hosting_client::HostingError> for ReviewError {
    fn from(err: hosting_client::HostingError) -> Self {
        if err.is_retryable() {
            ReviewError::HostingTransient(HostingTransientError(err.to_string()))
        } else {
            ReviewError::HostingPermanent(err.to_string())
        }
    }
}

impl From<ai_reviewer::AiError> for ReviewError {
    fn from(err: ai_reviewer::AiError) -> Self {
        ReviewError::AiError(err.to_string())
    }
}

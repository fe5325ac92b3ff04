use thiserror::Error;

pub type AiResult<T> = Result<T, AiError>;

/// Failures talking to the AI endpoint. Decode failures of the *review
/// JSON itself* are not represented here — [`crate::AiReviewer::review`]
/// degrades gracefully instead of erroring on those; see its docs.
#[derive(Debug, Error)]
pub enum AiError {
    #[error("network or 5xx failure: {0}")]
    Transient(String),

    #[error("ai endpoint rejected the request ({status}): {snippet}")]
    Permanent { status: u16, snippet: String },

    #[error("failed to decode ai endpoint response envelope: {0}")]
    Decode(String),
}

impl AiError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, AiError::Transient(_))
    }

    pub fn from_status(status: reqwest::StatusCode, snippet: String) -> Self {
        if status.is_server_error() {
            AiError::Transient(format!("{status}: {snippet}"))
        } else {
            AiError::Permanent {
                status: status.as_u16(),
                snippet,
            }
        }
    }
}

impl From<reqwest::Error> for AiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            AiError::Transient(err.to_string())
        } else {
            AiError::Decode(err.to_string())
        }
    }
}

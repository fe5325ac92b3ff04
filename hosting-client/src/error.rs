use thiserror::Error;

pub type HostingResult<T> = Result<T, HostingError>;

/// Failures from talking to the hosting platform. The split between
/// `Transient` and `Permanent` is what the scheduler's retry policy keys
/// on — see [`HostingError::is_retryable`].
#[derive(Debug, Error)]
pub enum HostingError {
    #[error("network or 5xx failure: {0}")]
    Transient(String),

    #[error("hosting platform rejected the request ({status}): {snippet}")]
    Permanent { status: u16, snippet: String },

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("failed to decode response body: {0}")]
    Decode(String),
}

impl HostingError {
    /// Only network failures and 5xx responses are worth retrying;
    /// anything else is a terminal mistake (bad payload, missing
    /// resource, revoked install) that retrying won't fix.
    pub fn is_retryable(&self) -> bool {
        matches!(self, HostingError::Transient(_))
    }

    pub fn from_status(status: reqwest::StatusCode, snippet: String) -> Self {
        if status.is_server_error() {
            HostingError::Transient(format!("{status}: {snippet}"))
        } else {
            HostingError::Permanent {
                status: status.as_u16(),
                snippet,
            }
        }
    }
}

impl From<reqwest::Error> for HostingError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            HostingError::Transient(err.to_string())
        } else {
            HostingError::Decode(err.to_string())
        }
    }
}

use thiserror::Error;

/// Failures from parsing a single hunk header. The top-level diff parser
/// never propagates these — a malformed header just means that hunk is
/// skipped, matching the leniency of the platform diffs we're fed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid hunk header: {0}")]
    InvalidHunkHeader(String),

    #[error("hunk header count out of range: {0}")]
    Overflow(String),
}

/// Failures building a [`crate::path_filter::PathFilter`] from configured
/// glob patterns.
#[derive(Debug, Error)]
pub enum PathFilterError {
    #[error("invalid glob pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

//! Authenticated REST client for the code-hosting platform.
//!
//! Wraps installation-token exchange (app JWT -> per-installation access
//! token, cached with a safety margin) behind a small set of operations:
//! fetching pull request metadata/diffs/files, posting reviews and issue
//! comments, and managing check runs.

mod auth;
mod client;
mod error;
mod types;

pub use auth::{TokenCache, generate_app_jwt};
pub use client::{HostingClient, HostingClientConfig};
pub use error::{HostingError, HostingResult};
pub use types::{
    AccessTokenResponse, CheckRunOutput, CheckRunResponse, CommitRef, CreateCheckRunRequest,
    CreateReviewRequest, CreateReviewResponse, IssueCommentRequest, IssueCommentResponse,
    PullRequestFile, PullRequestMeta, ReactionRequest, ReviewCommentPayload,
    UpdateCheckRunRequest, User,
};

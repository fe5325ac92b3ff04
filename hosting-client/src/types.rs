//! Wire shapes for the hosting platform's REST API. Only the fields the
//! pipeline actually consumes are modeled.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestMeta {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub changed_files: u32,
    pub head: CommitRef,
    pub base: CommitRef,
    pub user: User,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitRef {
    pub sha: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestFile {
    pub filename: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ReviewCommentPayload<'a> {
    pub path: &'a str,
    pub position: u32,
    pub body: &'a str,
}

#[derive(Debug, Serialize)]
pub struct CreateReviewRequest<'a> {
    pub commit_id: &'a str,
    pub body: &'a str,
    pub event: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<ReviewCommentPayload<'a>>,
}

#[derive(Debug, Deserialize)]
pub struct CreateReviewResponse {
    pub id: u64,
}

#[derive(Debug, Serialize, Default)]
pub struct CheckRunOutput<'a> {
    pub title: &'a str,
    pub summary: &'a str,
}

#[derive(Debug, Serialize)]
pub struct CreateCheckRunRequest<'a> {
    pub name: &'a str,
    pub head_sha: &'a str,
    pub status: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<CheckRunOutput<'a>>,
}

#[derive(Debug, Serialize)]
pub struct UpdateCheckRunRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<CheckRunOutput<'a>>,
}

#[derive(Debug, Deserialize)]
pub struct CheckRunResponse {
    pub id: u64,
}

#[derive(Debug, Serialize)]
pub struct IssueCommentRequest<'a> {
    pub body: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct IssueCommentResponse {
    pub id: u64,
}

#[derive(Debug, Serialize)]
pub struct ReactionRequest<'a> {
    pub content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct AccessTokenResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

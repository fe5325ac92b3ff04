//! Deserialization shapes for the hosting platform's webhook payloads
//! (grounded in the source's `schemas/github_webhooks.py`). Only the
//! fields the dispatcher actually reads are modeled.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookUser {
    pub login: String,
    pub id: i64,
    #[serde(rename = "type", default = "default_user_type")]
    pub user_type: String,
}

fn default_user_type() -> String {
    "User".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookRepository {
    pub id: i64,
    pub full_name: String,
    #[serde(default = "default_branch")]
    pub default_branch: String,
}

fn default_branch() -> String {
    "main".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookInstallation {
    pub id: i64,
    pub account: WebhookUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestHead {
    pub sha: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestBase {
    pub sha: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestBody {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub head: PullRequestHead,
    pub base: PullRequestBase,
    #[serde(default)]
    pub changed_files: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestEvent {
    pub action: String,
    pub number: u64,
    pub pull_request: PullRequestBody,
    pub repository: WebhookRepository,
    pub installation: WebhookInstallation,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueComment {
    pub id: u64,
    pub body: String,
    pub user: WebhookUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    pub number: u64,
    /// Present (as an object, possibly `{}`) only when the issue is a PR.
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueCommentEvent {
    pub action: String,
    pub issue: Issue,
    pub comment: IssueComment,
    pub repository: WebhookRepository,
    pub installation: WebhookInstallation,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstallationEvent {
    pub action: String,
    pub installation: WebhookInstallation,
    #[serde(default)]
    pub repositories: Vec<WebhookRepository>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstallationRepositoriesEvent {
    pub action: String,
    pub installation: WebhookInstallation,
    #[serde(default)]
    pub repositories_added: Vec<WebhookRepository>,
    #[serde(default)]
    pub repositories_removed: Vec<WebhookRepository>,
}

//! The data model of §3: Installation, Repository, Review, ReviewComment,
//! UsageRecord, plus the small enums they carry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installation {
    pub id: i64,
    pub account_login: String,
    pub account_type: String,
    pub is_active: bool,
    pub suspended_at: Option<DateTime<Utc>>,
    pub monthly_budget_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub installation_id: i64,
    pub host_repo_id: i64,
    pub full_name: String,
    pub default_branch: String,
    pub is_enabled: bool,
    pub auto_review: bool,
    pub monthly_budget_cents: Option<i64>,
    pub config_yaml: Option<String>,
    pub config_fetched_at: Option<DateTime<Utc>>,
}

impl Repository {
    pub fn effective_budget_cents(&self, installation: &Installation) -> i64 {
        self.monthly_budget_cents.unwrap_or(installation.monthly_budget_cents)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Skipped,
    Superseded,
}

impl ReviewStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ReviewStatus::Completed | ReviewStatus::Failed | ReviewStatus::Skipped | ReviewStatus::Superseded
        )
    }

    /// The check-run conclusion a terminal review status maps to (§4.5
    /// step 14 / §8 property 6). Non-terminal statuses have no mapping.
    pub fn check_run_conclusion(self) -> Option<&'static str> {
        match self {
            ReviewStatus::Completed => Some("success"),
            ReviewStatus::Failed => Some("failure"),
            ReviewStatus::Skipped => Some("skipped"),
            ReviewStatus::Superseded => Some("cancelled"),
            ReviewStatus::Pending | ReviewStatus::InProgress => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewTrigger {
    PrOpened,
    PrSynchronize,
    PrReopened,
    Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentSeverity {
    Critical,
    Warning,
    Suggestion,
    Nitpick,
    Praise,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub repository_full_name: String,
    pub pr_number: u64,
    pub head_sha: String,
    pub base_sha: String,
    pub status: ReviewStatus,
    pub trigger: ReviewTrigger,
    pub triggered_by: Option<String>,

    pub summary: Option<String>,
    pub risk_level: Option<RiskLevel>,
    pub comments_posted: u32,
    pub files_reviewed: u32,
    pub host_review_id: Option<u64>,
    pub check_run_id: Option<u64>,

    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_cents: i64,

    pub config_snapshot: Option<serde_json::Value>,
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    pub user_prompt: Option<String>,
    pub error_message: Option<String>,

    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewComment {
    pub review_id: i64,
    pub file_path: String,
    pub line_number: u32,
    pub diff_position: u32,
    pub severity: CommentSeverity,
    pub category: String,
    pub message: String,
    pub suggested_fix: Option<String>,
    pub host_comment_id: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageDelta {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_cents: i64,
    pub reviews: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub installation_id: i64,
    pub year: i32,
    pub month: u32,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_cost_cents: i64,
    pub total_reviews: u32,
}

//! The persistence abstraction of §3a. A trait rather than a SQL driver —
//! see `DESIGN.md` for why. Native async-fn-in-trait, so `Store` is not
//! `dyn`-safe; callers are generic over `S: Store` instead of boxing a
//! trait object, which is both simpler and avoids a hand-rolled
//! `Pin<Box<dyn Future>>` shim.

mod memory;

pub use memory::InMemoryStore;

use chrono::{DateTime, Utc};

use crate::error::ReviewResult;
use crate::models::{
    Installation, Repository, Review, ReviewComment, ReviewStatus, ReviewTrigger, UsageDelta,
    UsageRecord,
};

/// Fields supplied when a Review is first created, in PENDING.
pub struct NewReview {
    pub repository_full_name: String,
    pub pr_number: u64,
    pub trigger: ReviewTrigger,
    pub triggered_by: Option<String>,
}

/// A non-terminal-usage-affecting transition: PENDING→IN_PROGRESS, or to
/// any terminal status except the COMPLETED+usage case (see
/// `complete_review_with_usage`).
#[derive(Default)]
pub struct ReviewTransition {
    pub status: Option<ReviewStatus>,
    pub head_sha: Option<String>,
    pub base_sha: Option<String>,
    pub files_reviewed: Option<u32>,
    pub check_run_id: Option<u64>,
    pub config_snapshot: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// The fields set on the terminal COMPLETED transition, bundled with the
/// usage delta so both land in the same store call (§9).
pub struct ReviewCompletion {
    pub summary: String,
    pub risk_level: crate::models::RiskLevel,
    pub comments_posted: u32,
    pub host_review_id: Option<u64>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_cents: i64,
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    pub user_prompt: Option<String>,
    pub completed_at: DateTime<Utc>,
}

/// The entities of §3 behind one trait, mirroring exactly the queries the
/// rest of the spec requires — no object-graph traversal, only
/// foreign-key-keyed lookups (§9).
pub trait Store: Send + Sync {
    async fn get_installation(&self, id: i64) -> ReviewResult<Option<Installation>>;
    async fn upsert_installation(&self, installation: Installation) -> ReviewResult<Installation>;
    async fn delete_installation(&self, id: i64) -> ReviewResult<()>;

    async fn get_repository(&self, full_name: &str) -> ReviewResult<Option<Repository>>;
    async fn upsert_repository(&self, repository: Repository) -> ReviewResult<Repository>;
    async fn delete_repository(&self, host_repo_id: i64) -> ReviewResult<()>;
    async fn set_repository_config(
        &self,
        full_name: &str,
        config_yaml: Option<String>,
        fetched_at: DateTime<Utc>,
    ) -> ReviewResult<()>;
    async fn list_repositories_for_installation(
        &self,
        installation_id: i64,
    ) -> ReviewResult<Vec<Repository>>;

    async fn create_review(&self, new: NewReview) -> ReviewResult<Review>;
    async fn transition_review(&self, id: i64, update: ReviewTransition) -> ReviewResult<Review>;
    async fn complete_review_with_usage(
        &self,
        id: i64,
        completion: ReviewCompletion,
        delta: UsageDelta,
    ) -> ReviewResult<Review>;
    async fn find_review(&self, id: i64) -> ReviewResult<Option<Review>>;
    async fn add_review_comments(
        &self,
        review_id: i64,
        comments: Vec<ReviewComment>,
    ) -> ReviewResult<()>;

    async fn get_usage_record(
        &self,
        installation_id: i64,
        year: i32,
        month: u32,
    ) -> ReviewResult<Option<UsageRecord>>;
}

//! In-memory `Store` implementation: one mutex-guarded map per entity
//! kind. Each public method is a single critical section, giving the same
//! atomicity/upsert guarantees a relational store's transaction would
//! (§3a) — in particular, `complete_review_with_usage` holds both the
//! reviews map and the usage map under one lock acquisition sequence so
//! the terminal transition and the usage upsert are never observed apart.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};

use crate::error::{ReviewError, ReviewResult};
use crate::models::{
    Installation, Repository, Review, ReviewComment, ReviewStatus, UsageDelta, UsageRecord,
};

use super::{NewReview, ReviewCompletion, ReviewTransition, Store};

#[derive(Default)]
pub struct InMemoryStore {
    installations: Mutex<HashMap<i64, Installation>>,
    repositories: Mutex<HashMap<String, Repository>>,
    reviews: Mutex<HashMap<i64, Review>>,
    comments: Mutex<Vec<ReviewComment>>,
    usage: Mutex<HashMap<(i64, i32, u32), UsageRecord>>,
    next_review_id: AtomicI64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for InMemoryStore {
    async fn get_installation(&self, id: i64) -> ReviewResult<Option<Installation>> {
        Ok(self.installations.lock().expect("store poisoned").get(&id).cloned())
    }

    async fn upsert_installation(&self, installation: Installation) -> ReviewResult<Installation> {
        let mut map = self.installations.lock().expect("store poisoned");
        map.insert(installation.id, installation.clone());
        Ok(installation)
    }

    async fn delete_installation(&self, id: i64) -> ReviewResult<()> {
        self.installations.lock().expect("store poisoned").remove(&id);
        let mut repos = self.repositories.lock().expect("store poisoned");
        repos.retain(|_, repo| repo.installation_id != id);
        Ok(())
    }

    async fn get_repository(&self, full_name: &str) -> ReviewResult<Option<Repository>> {
        Ok(self.repositories.lock().expect("store poisoned").get(full_name).cloned())
    }

    async fn upsert_repository(&self, repository: Repository) -> ReviewResult<Repository> {
        let mut map = self.repositories.lock().expect("store poisoned");
        map.insert(repository.full_name.clone(), repository.clone());
        Ok(repository)
    }

    async fn delete_repository(&self, host_repo_id: i64) -> ReviewResult<()> {
        self.repositories
            .lock()
            .expect("store poisoned")
            .retain(|_, repo| repo.host_repo_id != host_repo_id);
        Ok(())
    }

    async fn set_repository_config(
        &self,
        full_name: &str,
        config_yaml: Option<String>,
        fetched_at: DateTime<Utc>,
    ) -> ReviewResult<()> {
        let mut map = self.repositories.lock().expect("store poisoned");
        let repo = map.get_mut(full_name).ok_or_else(|| {
            ReviewError::InternalInvariant(format!("repository {full_name} not found"))
        })?;
        repo.config_yaml = config_yaml;
        repo.config_fetched_at = Some(fetched_at);
        Ok(())
    }

    async fn list_repositories_for_installation(
        &self,
        installation_id: i64,
    ) -> ReviewResult<Vec<Repository>> {
        Ok(self
            .repositories
            .lock()
            .expect("store poisoned")
            .values()
            .filter(|repo| repo.installation_id == installation_id)
            .cloned()
            .collect())
    }

    async fn create_review(&self, new: NewReview) -> ReviewResult<Review> {
        let id = self.next_review_id.fetch_add(1, Ordering::SeqCst) + 1;
        let review = Review {
            id,
            repository_full_name: new.repository_full_name,
            pr_number: new.pr_number,
            head_sha: String::new(),
            base_sha: String::new(),
            status: ReviewStatus::Pending,
            trigger: new.trigger,
            triggered_by: new.triggered_by,
            summary: None,
            risk_level: None,
            comments_posted: 0,
            files_reviewed: 0,
            host_review_id: None,
            check_run_id: None,
            input_tokens: 0,
            output_tokens: 0,
            cost_cents: 0,
            config_snapshot: None,
            model: None,
            system_prompt: None,
            user_prompt: None,
            error_message: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        };
        self.reviews.lock().expect("store poisoned").insert(id, review.clone());
        Ok(review)
    }

    async fn transition_review(&self, id: i64, update: ReviewTransition) -> ReviewResult<Review> {
        let mut map = self.reviews.lock().expect("store poisoned");
        let review = map
            .get_mut(&id)
            .ok_or_else(|| ReviewError::InternalInvariant(format!("review {id} not found")))?;

        if let Some(status) = update.status {
            review.status = status;
        }
        if let Some(sha) = update.head_sha {
            review.head_sha = sha;
        }
        if let Some(sha) = update.base_sha {
            review.base_sha = sha;
        }
        if let Some(n) = update.files_reviewed {
            review.files_reviewed = n;
        }
        if let Some(id) = update.check_run_id {
            review.check_run_id = Some(id);
        }
        if let Some(snapshot) = update.config_snapshot {
            review.config_snapshot = Some(snapshot);
        }
        if let Some(msg) = update.error_message {
            review.error_message = Some(msg);
        }
        if let Some(ts) = update.started_at {
            review.started_at = Some(ts);
        }
        if let Some(ts) = update.completed_at {
            review.completed_at = Some(ts);
        }
        Ok(review.clone())
    }

    async fn complete_review_with_usage(
        &self,
        id: i64,
        completion: ReviewCompletion,
        delta: UsageDelta,
    ) -> ReviewResult<Review> {
        let mut reviews = self.reviews.lock().expect("store poisoned");
        let review = reviews
            .get_mut(&id)
            .ok_or_else(|| ReviewError::InternalInvariant(format!("review {id} not found")))?;

        review.status = ReviewStatus::Completed;
        review.summary = Some(completion.summary);
        review.risk_level = Some(completion.risk_level);
        review.comments_posted = completion.comments_posted;
        review.host_review_id = completion.host_review_id;
        review.input_tokens = completion.input_tokens;
        review.output_tokens = completion.output_tokens;
        review.cost_cents = completion.cost_cents;
        review.model = completion.model;
        review.system_prompt = completion.system_prompt;
        review.user_prompt = completion.user_prompt;
        review.completed_at = Some(completion.completed_at);

        let installation_id = {
            let repos = self.repositories.lock().expect("store poisoned");
            repos
                .get(&review.repository_full_name)
                .map(|repo| repo.installation_id)
                .ok_or_else(|| {
                    ReviewError::InternalInvariant(format!(
                        "repository {} not found",
                        review.repository_full_name
                    ))
                })?
        };

        let year = completion.completed_at.format("%Y").to_string().parse::<i32>().unwrap();
        let month = completion.completed_at.format("%m").to_string().parse::<u32>().unwrap();

        let mut usage = self.usage.lock().expect("store poisoned");
        let record = usage.entry((installation_id, year, month)).or_insert(UsageRecord {
            installation_id,
            year,
            month,
            total_input_tokens: 0,
            total_output_tokens: 0,
            total_cost_cents: 0,
            total_reviews: 0,
        });
        record.total_input_tokens += delta.input_tokens;
        record.total_output_tokens += delta.output_tokens;
        record.total_cost_cents += delta.cost_cents;
        record.total_reviews += delta.reviews;

        Ok(review.clone())
    }

    async fn find_review(&self, id: i64) -> ReviewResult<Option<Review>> {
        Ok(self.reviews.lock().expect("store poisoned").get(&id).cloned())
    }

    async fn add_review_comments(
        &self,
        review_id: i64,
        comments: Vec<ReviewComment>,
    ) -> ReviewResult<()> {
        let mut store = self.comments.lock().expect("store poisoned");
        store.extend(comments.into_iter().map(|mut comment| {
            comment.review_id = review_id;
            comment
        }));
        Ok(())
    }

    async fn get_usage_record(
        &self,
        installation_id: i64,
        year: i32,
        month: u32,
    ) -> ReviewResult<Option<UsageRecord>> {
        Ok(self
            .usage
            .lock()
            .expect("store poisoned")
            .get(&(installation_id, year, month))
            .copied())
    }
}

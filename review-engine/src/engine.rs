//! The pipeline state machine (§4.5): gates → fetch → supersede-check →
//! AI call → publish → persist. Grounded in the source's
//! `ReviewEngine.review_pull_request`.

use std::sync::Arc;

use ai_reviewer::{AiReviewer, ReviewRequest, build_context_blob};
use chrono::Utc;
use diff_core::{FileDiff, PathFilter, build_position_index, parse_unified_diff};
use hosting_client::HostingClient;
use tracing::{info, warn};

use crate::budget::{budget_exceeded_comment, calculate_cost_cents, check_budget};
use crate::config::Config;
use crate::error::{ReviewError, ReviewResult};
use crate::models::{CommentSeverity, Review, ReviewComment, ReviewStatus, ReviewTrigger, RiskLevel, UsageDelta};
use crate::review_config::{ConfigLoader, ReviewConfig};
use crate::store::{NewReview, ReviewCompletion, ReviewTransition, Store};

const CONTEXT_FILE_LIMIT: usize = 5;

pub struct ReviewEngine<S: Store> {
    store: Arc<S>,
    hosting: Arc<HostingClient>,
    ai: Arc<AiReviewer>,
    config_loader: ConfigLoader,
    config: Arc<Config>,
}

impl<S: Store> ReviewEngine<S> {
    pub fn new(
        store: Arc<S>,
        hosting: Arc<HostingClient>,
        ai: Arc<AiReviewer>,
        config: Arc<Config>,
    ) -> Self {
        let config_loader = ConfigLoader::new(Arc::clone(&hosting));
        Self { store, hosting, ai, config_loader, config }
    }

    pub async fn review_pull_request(
        &self,
        installation_id: i64,
        repo_full_name: &str,
        pr_number: u64,
        trigger: ReviewTrigger,
        triggered_by: Option<String>,
        expected_head_sha: Option<String>,
    ) -> ReviewResult<Review> {
        let (owner, repo_name) = repo_full_name.split_once('/').ok_or_else(|| {
            ReviewError::InternalInvariant(format!("malformed repo full name {repo_full_name}"))
        })?;

        let installation = self
            .store
            .get_installation(installation_id)
            .await?
            .ok_or_else(|| ReviewError::InternalInvariant(format!("installation {installation_id} not found")))?;

        let repo = self.store.get_repository(repo_full_name).await?.ok_or_else(|| {
            ReviewError::InternalInvariant(format!("repository {repo_full_name} not found"))
        })?;

        let review = self.store.create_review(NewReview {
            repository_full_name: repo_full_name.to_string(),
            pr_number,
            trigger,
            triggered_by,
        }).await?;

        match self
            .run_pipeline(installation_id, owner, repo_name, repo_full_name, pr_number, trigger, &installation, &repo, review.id, expected_head_sha)
            .await
        {
            Ok(final_review) => Ok(final_review),
            Err(err) => {
                let (status, message) = match &err {
                    ReviewError::GateFailure(reason) => {
                        info!(repo_full_name, pr_number, reason, "review skipped");
                        (ReviewStatus::Skipped, reason.clone())
                    }
                    ReviewError::Superseded(sha) => {
                        let short = &sha[..sha.len().min(8)];
                        info!(repo_full_name, pr_number, "review superseded by newer commit {short}");
                        (ReviewStatus::Superseded, format!("Superseded by newer commit {short}"))
                    }
                    other => (ReviewStatus::Failed, other.to_string()),
                };
                self.store.transition_review(review.id, ReviewTransition {
                    status: Some(status),
                    error_message: Some(message),
                    completed_at: Some(Utc::now()),
                    ..Default::default()
                }).await?;
                if let Ok(Some(review)) = self.store.find_review(review.id).await {
                    self.finalize_check_run(installation_id, owner, repo_name, &review).await;
                }
                Err(err)
            }
        }
    }

    /// The pre-review gates (§7 GateFailure), carried through as `Err`s so
    /// `review_pull_request`'s single match centralizes every terminal
    /// transition the same way it already did for FAILED.
    #[allow(clippy::too_many_arguments)]
    async fn run_pipeline(
        &self,
        installation_id: i64,
        owner: &str,
        repo_name: &str,
        repo_full_name: &str,
        pr_number: u64,
        trigger: ReviewTrigger,
        installation: &crate::models::Installation,
        repo: &crate::models::Repository,
        review_id: i64,
        expected_head_sha: Option<String>,
    ) -> ReviewResult<Review> {
        if !repo.is_enabled {
            return Err(ReviewError::GateFailure("Reviews disabled for this repository".to_string()));
        }

        let config = self.config_loader.load(self.store.as_ref(), installation_id, repo).await?;

        if trigger != ReviewTrigger::Command && !config.auto_review {
            return Err(ReviewError::GateFailure("Auto-review disabled".to_string()));
        }

        if trigger != ReviewTrigger::Command {
            let trigger_name = match trigger {
                ReviewTrigger::PrOpened => "opened",
                ReviewTrigger::PrSynchronize => "synchronize",
                ReviewTrigger::PrReopened => "reopened",
                ReviewTrigger::Command => unreachable!(),
            };
            if !config.review_on.iter().any(|t| t == trigger_name) {
                return Err(ReviewError::GateFailure(format!("Trigger {trigger_name} not enabled")));
            }
        }

        let budget = check_budget(self.store.as_ref(), installation, repo).await?;
        if !budget.has_budget {
            let comment = budget_exceeded_comment(budget.budget_cents);
            if let Err(err) = self.hosting.create_issue_comment(installation_id, owner, repo_name, pr_number, &comment).await {
                warn!(repo_full_name, pr_number, error = %err, "failed to post budget-exceeded comment");
            }
            return Err(ReviewError::GateFailure("Budget exceeded".to_string()));
        }

        let config_snapshot = serde_json::to_value(&config).ok();
        self.store.transition_review(review_id, ReviewTransition {
            status: Some(ReviewStatus::InProgress),
            config_snapshot,
            started_at: Some(Utc::now()),
            ..Default::default()
        }).await?;

        self.run_in_progress(installation_id, owner, repo_name, repo_full_name, pr_number, review_id, expected_head_sha, &config).await
    }

    /// Everything from the first hosting call onward — the part of the
    /// pipeline that can fail with a genuine (retryable or not) error
    /// rather than a gate short-circuit.
    async fn run_in_progress(
        &self,
        installation_id: i64,
        owner: &str,
        repo_name: &str,
        repo_full_name: &str,
        pr_number: u64,
        review_id: i64,
        expected_head_sha: Option<String>,
        config: &ReviewConfig,
    ) -> ReviewResult<Review> {
        let pr = self.hosting.get_pull_request(installation_id, owner, repo_name, pr_number).await?;

        self.store.transition_review(review_id, ReviewTransition {
            head_sha: Some(pr.head.sha.clone()),
            base_sha: Some(pr.base.sha.clone()),
            ..Default::default()
        }).await?;

        match self
            .hosting
            .create_check_run(installation_id, owner, repo_name, "AI Code Review", &pr.head.sha, "in_progress")
            .await
        {
            Ok(id) => {
                self.store.transition_review(review_id, ReviewTransition {
                    check_run_id: Some(id),
                    ..Default::default()
                }).await?;
            }
            Err(err) => {
                warn!(repo_full_name, pr_number, error = %err, "failed to create check run, continuing without one");
            }
        };

        if pr.changed_files > config.max_files {
            let comment = format!(
                "**AI Review skipped**: This PR changes {} files, which exceeds the limit of {}. \
                 Use `@reviewer review path/to/specific/dir` to review specific paths.",
                pr.changed_files, config.max_files
            );
            let _ = self.hosting.create_issue_comment(installation_id, owner, repo_name, pr_number, &comment).await;
            return Err(ReviewError::GateFailure(format!("Too many files: {}", pr.changed_files)));
        }

        let diff_text = self.hosting.get_pull_request_diff(installation_id, owner, repo_name, pr_number).await?;

        if diff_text.len() > self.config.max_diff_size_bytes {
            let comment = format!(
                "**AI Review skipped**: Diff size exceeds {}KB limit.",
                self.config.max_diff_size_bytes / 1000
            );
            let _ = self.hosting.create_issue_comment(installation_id, owner, repo_name, pr_number, &comment).await;
            return Err(ReviewError::GateFailure("Diff too large".to_string()));
        }

        let parsed_files = parse_unified_diff(&diff_text);
        let filter = PathFilter::new(&config.paths.include, &config.paths.exclude).map_err(|err| {
            ReviewError::InternalInvariant(format!("invalid path filter pattern: {err}"))
        })?;
        let filtered_files: Vec<FileDiff> = filter.filter(parsed_files);

        if filtered_files.is_empty() {
            return self.finish_no_files(installation_id, owner, repo_name, review_id).await;
        }

        let context_blob = self.load_context_files(installation_id, owner, repo_name, &pr.head.sha, &config.context_files).await;

        if let Some(expected) = &expected_head_sha {
            if expected != &pr.head.sha {
                return Err(ReviewError::Superseded(pr.head.sha.clone()));
            }
        }

        let current_pr = self.hosting.get_pull_request(installation_id, owner, repo_name, pr_number).await?;
        if current_pr.head.sha != pr.head.sha {
            return Err(ReviewError::Superseded(current_pr.head.sha.clone()));
        }

        let rules = config.to_rule_set();
        let model = config.model.clone().unwrap_or_else(|| self.config.default_model.clone());
        let request = ReviewRequest {
            pr_title: &pr.title,
            pr_body: pr.body.as_deref(),
            diff_text: &diff_text,
            context_blob: context_blob.as_deref(),
            rules: &rules,
            languages: &config.languages,
            frameworks: &config.frameworks,
            additional_instructions: config.additional_instructions.as_deref(),
            model: &model,
            max_tokens: self.config.max_tokens_per_review,
        };

        let ai_review = self.ai.review(&request).await?;

        let cost_cents = calculate_cost_cents(
            ai_review.input_tokens,
            ai_review.output_tokens,
            self.config.input_token_cost_cents_per_million,
            self.config.output_token_cost_cents_per_million,
        );

        let position_index = build_position_index(&filtered_files);

        let mut host_comments: Vec<(String, u32, String)> = Vec::new();
        let mut stored_comments: Vec<ReviewComment> = Vec::new();

        for comment in &ai_review.comments {
            let Some(position) = position_index.get(&comment.file).and_then(|by_line| by_line.get(&comment.line)) else {
                continue;
            };

            let severity = map_severity(comment.severity);
            let body = format_comment_body(severity, &comment.category, &comment.message, comment.suggested_fix.as_deref());

            host_comments.push((comment.file.clone(), position.diff_position, body));
            stored_comments.push(ReviewComment {
                review_id,
                file_path: comment.file.clone(),
                line_number: comment.line,
                diff_position: position.diff_position,
                severity,
                category: comment.category.clone(),
                message: comment.message.clone(),
                suggested_fix: comment.suggested_fix.clone(),
                host_comment_id: None,
            });
        }

        let risk_label = match ai_review.risk_level {
            ai_reviewer::RiskLevel::Low => "LOW",
            ai_reviewer::RiskLevel::Medium => "MEDIUM",
            ai_reviewer::RiskLevel::High => "HIGH",
            ai_reviewer::RiskLevel::Critical => "CRITICAL",
        };
        let summary_body = format!(
            "## AI Code Review\n\n**Risk Level**: {risk_label}\n\n### Summary\n{}\n\n---\n<sub>Reviewed {} files | {} comments | Cost: ${:.3}</sub>\n",
            ai_review.summary,
            filtered_files.len(),
            host_comments.len(),
            cost_cents as f64 / 100.0,
        );

        let comments_for_post = if self.config.enable_line_comments { host_comments.clone() } else { Vec::new() };
        let host_review_id = self
            .hosting
            .create_review(installation_id, owner, repo_name, pr_number, &pr.head.sha, &summary_body, "COMMENT", &comments_for_post)
            .await?;

        if !stored_comments.is_empty() {
            self.store.add_review_comments(review_id, stored_comments).await?;
        }

        let completed_at = Utc::now();
        let completion = ReviewCompletion {
            summary: ai_review.summary.clone(),
            risk_level: map_risk(ai_review.risk_level),
            comments_posted: host_comments.len() as u32,
            host_review_id: Some(host_review_id),
            input_tokens: ai_review.input_tokens,
            output_tokens: ai_review.output_tokens,
            cost_cents,
            model: Some(model),
            system_prompt: None,
            user_prompt: None,
            completed_at,
        };
        let delta = UsageDelta {
            input_tokens: ai_review.input_tokens,
            output_tokens: ai_review.output_tokens,
            cost_cents,
            reviews: 1,
        };
        self.store.transition_review(review_id, ReviewTransition {
            files_reviewed: Some(filtered_files.len() as u32),
            ..Default::default()
        }).await?;
        let final_review = self.store.complete_review_with_usage(review_id, completion, delta).await?;

        self.finalize_check_run(installation_id, owner, repo_name, &final_review).await;

        info!(repo_full_name, pr_number, cost_cents, "review completed");
        Ok(final_review)
    }

    async fn load_context_files(
        &self,
        installation_id: i64,
        owner: &str,
        repo_name: &str,
        git_ref: &str,
        paths: &[String],
    ) -> Option<String> {
        if paths.is_empty() {
            return None;
        }
        let mut files = Vec::new();
        for path in paths.iter().take(CONTEXT_FILE_LIMIT) {
            if let Ok(content) = self.hosting.get_file_content(installation_id, owner, repo_name, path, git_ref).await {
                files.push((path.clone(), content));
            }
        }
        build_context_blob(&files)
    }

    async fn finish_no_files(
        &self,
        installation_id: i64,
        owner: &str,
        repo_name: &str,
        review_id: i64,
    ) -> ReviewResult<Review> {
        let completion = ReviewCompletion {
            summary: "No files to review after applying path filters.".to_string(),
            risk_level: RiskLevel::Low,
            comments_posted: 0,
            host_review_id: None,
            input_tokens: 0,
            output_tokens: 0,
            cost_cents: 0,
            model: None,
            system_prompt: None,
            user_prompt: None,
            completed_at: Utc::now(),
        };
        let delta = UsageDelta { reviews: 1, ..Default::default() };
        let review = self.store.complete_review_with_usage(review_id, completion, delta).await?;
        self.finalize_check_run(installation_id, owner, repo_name, &review).await;
        Ok(review)
    }

    async fn finalize_check_run(&self, installation_id: i64, owner: &str, repo_name: &str, review: &Review) {
        let Some(check_run_id) = review.check_run_id else { return };
        let Some(conclusion) = review.status.check_run_conclusion() else { return };

        let (title, summary) = match review.status {
            ReviewStatus::Completed => {
                let risk = review.risk_level.map(risk_label).unwrap_or("OK");
                let mut summary = review.summary.clone().unwrap_or_else(|| "Review completed successfully.".to_string());
                if review.comments_posted > 0 {
                    summary.push_str(&format!("\n\n**{} comments** posted.", review.comments_posted));
                }
                (format!("Review complete - {risk}"), summary)
            }
            ReviewStatus::Superseded => (
                "Review cancelled".to_string(),
                review.error_message.clone().unwrap_or_else(|| "Superseded by newer commit.".to_string()),
            ),
            ReviewStatus::Skipped => (
                "Review skipped".to_string(),
                review.error_message.clone().unwrap_or_else(|| "Review was skipped.".to_string()),
            ),
            ReviewStatus::Failed => (
                "Review failed".to_string(),
                review.error_message.clone().unwrap_or_else(|| "An error occurred during review.".to_string()),
            ),
            ReviewStatus::Pending | ReviewStatus::InProgress => return,
        };

        if let Err(err) = self
            .hosting
            .update_check_run(installation_id, owner, repo_name, check_run_id, Some("completed"), Some(conclusion), &title, &summary)
            .await
        {
            warn!(owner, repo_name, error = %err, "failed to update check run");
        }
    }
}

fn risk_label(risk: RiskLevel) -> &'static str {
    match risk {
        RiskLevel::Low => "LOW",
        RiskLevel::Medium => "MEDIUM",
        RiskLevel::High => "HIGH",
        RiskLevel::Critical => "CRITICAL",
    }
}

fn map_risk(risk: ai_reviewer::RiskLevel) -> RiskLevel {
    match risk {
        ai_reviewer::RiskLevel::Low => RiskLevel::Low,
        ai_reviewer::RiskLevel::Medium => RiskLevel::Medium,
        ai_reviewer::RiskLevel::High => RiskLevel::High,
        ai_reviewer::RiskLevel::Critical => RiskLevel::Critical,
    }
}

fn map_severity(severity: ai_reviewer::Severity) -> CommentSeverity {
    match severity {
        ai_reviewer::Severity::Critical => CommentSeverity::Critical,
        ai_reviewer::Severity::Warning => CommentSeverity::Warning,
        ai_reviewer::Severity::Suggestion => CommentSeverity::Suggestion,
        ai_reviewer::Severity::Nitpick => CommentSeverity::Nitpick,
        ai_reviewer::Severity::Praise => CommentSeverity::Praise,
    }
}

fn format_comment_body(severity: CommentSeverity, category: &str, message: &str, suggested_fix: Option<&str>) -> String {
    let tag = match severity {
        CommentSeverity::Critical => "[CRITICAL]",
        CommentSeverity::Warning => "[WARNING]",
        CommentSeverity::Suggestion => "[SUGGESTION]",
        CommentSeverity::Nitpick => "[NITPICK]",
        CommentSeverity::Praise => "[PRAISE]",
    };
    let category = title_case(category);
    let mut body = format!("{tag} **{category}**: {message}");
    if let Some(fix) = suggested_fix {
        body.push_str(&format!("\n\n```suggestion\n{fix}\n```"));
    }
    body
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

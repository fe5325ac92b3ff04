//! Maps inbound webhook events onto scheduled jobs or direct store writes
//! (§4.6, grounded in the source's `api/webhooks.py` and
//! `services/installation_manager.py`).

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::command_parser::contains_any_trigger;
use crate::config::Config;
use crate::error::ReviewResult;
use crate::models::{Installation, ReviewTrigger};
use crate::scheduler::{JobHandler, JobPayload, Scheduler};
use crate::store::Store;
use crate::webhook_events::{
    InstallationEvent, InstallationRepositoriesEvent, IssueCommentEvent, PullRequestEvent,
};

pub struct EventDispatcher<S: Store, H: JobHandler> {
    store: Arc<S>,
    scheduler: Arc<Scheduler<H>>,
    config: Arc<Config>,
}

impl<S: Store, H: JobHandler> EventDispatcher<S, H> {
    pub fn new(store: Arc<S>, scheduler: Arc<Scheduler<H>>, config: Arc<Config>) -> Self {
        Self { store, scheduler, config }
    }

    /// `opened`/`synchronize`/`reopened` schedule a debounced, deduplicated
    /// review job; other actions (`closed`, `edited`, ...) are ignored.
    pub async fn handle_pull_request(&self, event: PullRequestEvent) -> ReviewResult<()> {
        let trigger = match event.action.as_str() {
            "opened" => ReviewTrigger::PrOpened,
            "synchronize" => ReviewTrigger::PrSynchronize,
            "reopened" => ReviewTrigger::PrReopened,
            _ => return Ok(()),
        };

        let lock_key = format!("pr:{}:{}", event.repository.full_name, event.number);
        let payload = JobPayload::ProcessPullRequest {
            installation_id: event.installation.id,
            repo_full_name: event.repository.full_name.clone(),
            pr_number: event.number,
            trigger,
            expected_head_sha: Some(event.pull_request.head.sha.clone()),
        };

        info!(
            repo = event.repository.full_name,
            number = event.number,
            delay_secs = self.config.review_debounce_seconds,
            "scheduling review"
        );
        self.scheduler
            .submit(lock_key, payload, Duration::from_secs(self.config.review_debounce_seconds))
            .await;
        Ok(())
    }

    /// Only comments on PRs (not plain issues) that mention a configured
    /// trigger phrase dispatch — checked against the full configured list,
    /// not a single hardcoded phrase (§9).
    pub async fn handle_issue_comment(&self, event: IssueCommentEvent) -> ReviewResult<()> {
        if event.action != "created" || event.issue.pull_request.is_none() {
            return Ok(());
        }
        if !contains_any_trigger(&event.comment.body, &self.config.bot_triggers) {
            return Ok(());
        }

        let lock_key = format!("comment:{}:{}:{}", event.repository.full_name, event.issue.number, event.comment.id);
        let payload = JobPayload::ProcessCommentCommand {
            installation_id: event.installation.id,
            repo_full_name: event.repository.full_name.clone(),
            pr_number: event.issue.number,
            comment_body: event.comment.body.clone(),
            comment_author: event.comment.user.login.clone(),
        };
        self.scheduler.submit(lock_key, payload, Duration::ZERO).await;
        Ok(())
    }

    /// Installation lifecycle is handled synchronously against the store —
    /// no review work is ever involved.
    pub async fn handle_installation(&self, event: InstallationEvent) -> ReviewResult<()> {
        match event.action.as_str() {
            "created" => {
                let installation = Installation {
                    id: event.installation.id,
                    account_login: event.installation.account.login.clone(),
                    account_type: event.installation.account.user_type.clone(),
                    is_active: true,
                    suspended_at: None,
                    monthly_budget_cents: self.config.default_monthly_budget_cents,
                };
                self.store.upsert_installation(installation).await?;

                for repo in event.repositories {
                    let repository = crate::models::Repository {
                        installation_id: event.installation.id,
                        host_repo_id: repo.id,
                        full_name: repo.full_name,
                        default_branch: repo.default_branch,
                        is_enabled: true,
                        auto_review: true,
                        monthly_budget_cents: None,
                        config_yaml: None,
                        config_fetched_at: None,
                    };
                    self.store.upsert_repository(repository).await?;
                }
            }
            "deleted" => {
                self.store.delete_installation(event.installation.id).await?;
            }
            "suspend" | "unsuspend" => {
                if let Some(mut installation) = self.store.get_installation(event.installation.id).await? {
                    installation.is_active = event.action == "unsuspend";
                    installation.suspended_at = if installation.is_active { None } else { Some(chrono::Utc::now()) };
                    self.store.upsert_installation(installation).await?;
                }
            }
            other => {
                info!(action = other, "ignoring unrecognized installation action");
            }
        }
        Ok(())
    }

    pub async fn handle_installation_repositories(&self, event: InstallationRepositoriesEvent) -> ReviewResult<()> {
        let Some(_installation) = self.store.get_installation(event.installation.id).await? else {
            return Ok(());
        };

        match event.action.as_str() {
            "added" => {
                for repo in event.repositories_added {
                    let repository = crate::models::Repository {
                        installation_id: event.installation.id,
                        host_repo_id: repo.id,
                        full_name: repo.full_name,
                        default_branch: repo.default_branch,
                        is_enabled: true,
                        auto_review: true,
                        monthly_budget_cents: None,
                        config_yaml: None,
                        config_fetched_at: None,
                    };
                    self.store.upsert_repository(repository).await?;
                }
            }
            "removed" => {
                for repo in event.repositories_removed {
                    self.store.delete_repository(repo.id).await?;
                }
            }
            other => {
                info!(action = other, "ignoring unrecognized installation_repositories action");
            }
        }
        Ok(())
    }
}

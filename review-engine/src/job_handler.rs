//! Adapts [`ReviewEngine`] to the [`JobHandler`] the scheduler dispatches
//! onto (grounded in the source's `tasks/review_tasks.py` task bodies).

use std::sync::Arc;

use hosting_client::HostingClient;
use tracing::info;

use crate::command_parser::{CommandType, help_message, parse_command};
use crate::config::Config;
use crate::engine::ReviewEngine;
use crate::error::ReviewResult;
use crate::models::ReviewTrigger;
use crate::scheduler::{JobHandler, JobPayload};
use crate::store::Store;

pub struct ReviewJobHandler<S: Store> {
    engine: Arc<ReviewEngine<S>>,
    hosting: Arc<HostingClient>,
    config: Arc<Config>,
}

impl<S: Store> ReviewJobHandler<S> {
    pub fn new(engine: Arc<ReviewEngine<S>>, hosting: Arc<HostingClient>, config: Arc<Config>) -> Self {
        Self { engine, hosting, config }
    }
}

impl<S: Store> JobHandler for ReviewJobHandler<S> {
    async fn handle(&self, payload: &JobPayload) -> ReviewResult<()> {
        match payload {
            JobPayload::ProcessPullRequest { installation_id, repo_full_name, pr_number, trigger, expected_head_sha } => {
                self.engine
                    .review_pull_request(*installation_id, repo_full_name, *pr_number, *trigger, None, expected_head_sha.clone())
                    .await?;
                Ok(())
            }
            JobPayload::ProcessCommentCommand { installation_id, repo_full_name, pr_number, comment_body, comment_author } => {
                self.process_comment_command(*installation_id, repo_full_name, *pr_number, comment_body, comment_author).await
            }
        }
    }
}

impl<S: Store> ReviewJobHandler<S> {
    async fn process_comment_command(
        &self,
        installation_id: i64,
        repo_full_name: &str,
        pr_number: u64,
        comment_body: &str,
        comment_author: &str,
    ) -> ReviewResult<()> {
        let Some((owner, repo_name)) = repo_full_name.split_once('/') else {
            return Ok(());
        };

        let Some(parsed) = parse_command(comment_body, &self.config.bot_triggers) else {
            return Ok(());
        };

        match parsed.command_type {
            CommandType::Help => {
                let message = help_message(&self.config.bot_triggers);
                let _ = self.hosting.create_issue_comment(installation_id, owner, repo_name, pr_number, &message).await;
            }
            CommandType::Review => {
                // TODO: scope the review to parsed.args paths instead of the whole PR.
                self.engine
                    .review_pull_request(
                        installation_id,
                        repo_full_name,
                        pr_number,
                        ReviewTrigger::Command,
                        Some(comment_author.to_string()),
                        None,
                    )
                    .await?;
            }
            CommandType::Config => {
                let _ = self
                    .hosting
                    .create_issue_comment(installation_id, owner, repo_name, pr_number, "Config display not yet implemented.")
                    .await;
            }
            CommandType::Ignore => {
                let _ = self
                    .hosting
                    .create_issue_comment(installation_id, owner, repo_name, pr_number, "Automatic reviews disabled for this PR.")
                    .await;
            }
            CommandType::Explain | CommandType::Security => {
                info!(command = ?parsed.command_type, "command recognized but not yet implemented");
                let message = format!("Command `{:?}` not yet implemented.", parsed.command_type);
                let _ = self.hosting.create_issue_comment(installation_id, owner, repo_name, pr_number, &message).await;
            }
        }
        Ok(())
    }
}

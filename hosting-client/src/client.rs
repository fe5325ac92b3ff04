//! The authenticated REST client itself.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use tracing::{debug, instrument, warn};

use crate::auth::{TokenCache, generate_app_jwt};
use crate::error::{HostingError, HostingResult};
use crate::types::{
    AccessTokenResponse, CheckRunOutput, CheckRunResponse, CreateCheckRunRequest,
    CreateReviewRequest, CreateReviewResponse, IssueCommentRequest, IssueCommentResponse,
    PullRequestFile, PullRequestMeta, ReactionRequest, ReviewCommentPayload,
    UpdateCheckRunRequest,
};

const API_VERSION: &str = "2022-11-28";
const RESPONSE_SNIPPET_CHARS: usize = 300;

#[derive(Clone)]
pub struct HostingClientConfig {
    pub base_url: String,
    pub app_id: String,
    pub private_key_pem: Arc<Vec<u8>>,
}

/// One `HostingClient` is shared across every installation the process
/// serves; the installation id is a parameter on each call, not part of
/// the client's identity.
pub struct HostingClient {
    http: Client,
    cfg: HostingClientConfig,
    tokens: Arc<TokenCache>,
}

impl HostingClient {
    pub fn new(cfg: HostingClientConfig, tokens: Arc<TokenCache>) -> HostingResult<Self> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self { http, cfg, tokens })
    }

    async fn installation_token(&self, installation_id: i64) -> HostingResult<String> {
        if let Some(token) = self.tokens.get(installation_id) {
            return Ok(token);
        }
        self.refresh_token(installation_id).await
    }

    async fn refresh_token(&self, installation_id: i64) -> HostingResult<String> {
        let app_jwt = generate_app_jwt(&self.cfg.app_id, &self.cfg.private_key_pem)?;
        let url = format!(
            "{}/app/installations/{}/access_tokens",
            self.cfg.base_url, installation_id
        );
        let resp = self
            .http
            .post(&url)
            .bearer_auth(app_jwt)
            .header("Accept", "application/vnd.github.v3+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .send()
            .await?;
        let resp = Self::ensure_success(resp).await?;
        let body: AccessTokenResponse = resp
            .json()
            .await
            .map_err(|err| HostingError::Decode(err.to_string()))?;
        self.tokens
            .insert(installation_id, body.token.clone(), body.expires_at);
        Ok(body.token)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.cfg.base_url, path);
        self.http
            .request(method, url)
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    /// Sends an authenticated request, retrying once after invalidating the
    /// cached token if the platform responds 401.
    async fn authed(
        &self,
        installation_id: i64,
        method: Method,
        path: &str,
        configure: impl Fn(RequestBuilder) -> RequestBuilder,
    ) -> HostingResult<Response> {
        let mut token = self.installation_token(installation_id).await?;
        let mut retried = false;
        loop {
            let builder = configure(self.request(method.clone(), path).bearer_auth(&token));
            let resp = builder.send().await?;
            if resp.status() == StatusCode::UNAUTHORIZED && !retried {
                retried = true;
                warn!(installation_id, path, "got 401, refreshing installation token");
                self.tokens.invalidate(installation_id);
                token = self.refresh_token(installation_id).await?;
                continue;
            }
            return Ok(resp);
        }
    }

    async fn ensure_success(resp: Response) -> HostingResult<Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        Err(HostingError::from_status(status, snippet(&text)))
    }

    #[instrument(skip(self), fields(installation_id, owner, repo))]
    pub async fn get_pull_request(
        &self,
        installation_id: i64,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> HostingResult<PullRequestMeta> {
        let path = format!("/repos/{owner}/{repo}/pulls/{number}");
        let resp = self
            .authed(installation_id, Method::GET, &path, |rb| {
                rb.header("Accept", "application/vnd.github.v3+json")
            })
            .await?;
        let resp = Self::ensure_success(resp).await?;
        resp.json()
            .await
            .map_err(|err| HostingError::Decode(err.to_string()))
    }

    #[instrument(skip(self), fields(installation_id, owner, repo))]
    pub async fn get_pull_request_diff(
        &self,
        installation_id: i64,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> HostingResult<String> {
        let path = format!("/repos/{owner}/{repo}/pulls/{number}");
        let resp = self
            .authed(installation_id, Method::GET, &path, |rb| {
                rb.header("Accept", "application/vnd.github.v3.diff")
            })
            .await?;
        let resp = Self::ensure_success(resp).await?;
        Ok(resp.text().await?)
    }

    #[instrument(skip(self), fields(installation_id, owner, repo))]
    pub async fn get_pull_request_files(
        &self,
        installation_id: i64,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> HostingResult<Vec<PullRequestFile>> {
        let mut files = Vec::new();
        let mut page: u32 = 1;
        loop {
            let path = format!("/repos/{owner}/{repo}/pulls/{number}/files");
            let resp = self
                .authed(installation_id, Method::GET, &path, |rb| {
                    rb.query(&[("per_page", "100".to_string()), ("page", page.to_string())])
                })
                .await?;
            let resp = Self::ensure_success(resp).await?;
            let batch: Vec<PullRequestFile> = resp
                .json()
                .await
                .map_err(|err| HostingError::Decode(err.to_string()))?;
            if batch.is_empty() {
                break;
            }
            debug!(page, got = batch.len(), "fetched page of pull request files");
            files.extend(batch);
            page += 1;
        }
        Ok(files)
    }

    #[instrument(skip(self), fields(installation_id, owner, repo))]
    pub async fn get_file_content(
        &self,
        installation_id: i64,
        owner: &str,
        repo: &str,
        file_path: &str,
        git_ref: &str,
    ) -> HostingResult<String> {
        let path = format!("/repos/{owner}/{repo}/contents/{file_path}");
        let resp = self
            .authed(installation_id, Method::GET, &path, |rb| {
                rb.query(&[("ref", git_ref)])
                    .header("Accept", "application/vnd.github.v3.raw")
            })
            .await?;
        let resp = Self::ensure_success(resp).await?;
        Ok(resp.text().await?)
    }

    #[instrument(skip(self, body, comments), fields(installation_id, owner, repo))]
    pub async fn create_review(
        &self,
        installation_id: i64,
        owner: &str,
        repo: &str,
        number: u64,
        commit_sha: &str,
        body: &str,
        event: &str,
        comments: &[(String, u32, String)],
    ) -> HostingResult<u64> {
        let payload_comments: Vec<ReviewCommentPayload> = comments
            .iter()
            .map(|(path, position, body)| ReviewCommentPayload {
                path,
                position: *position,
                body,
            })
            .collect();
        let payload = CreateReviewRequest {
            commit_id: commit_sha,
            body,
            event,
            comments: payload_comments,
        };
        let path = format!("/repos/{owner}/{repo}/pulls/{number}/reviews");
        let resp = self
            .authed(installation_id, Method::POST, &path, |rb| rb.json(&payload))
            .await?;
        let resp = Self::ensure_success(resp).await?;
        let out: CreateReviewResponse = resp
            .json()
            .await
            .map_err(|err| HostingError::Decode(err.to_string()))?;
        Ok(out.id)
    }

    #[instrument(skip(self, body), fields(installation_id, owner, repo))]
    pub async fn create_issue_comment(
        &self,
        installation_id: i64,
        owner: &str,
        repo: &str,
        issue_number: u64,
        body: &str,
    ) -> HostingResult<u64> {
        let payload = IssueCommentRequest { body };
        let path = format!("/repos/{owner}/{repo}/issues/{issue_number}/comments");
        let resp = self
            .authed(installation_id, Method::POST, &path, |rb| rb.json(&payload))
            .await?;
        let resp = Self::ensure_success(resp).await?;
        let out: IssueCommentResponse = resp
            .json()
            .await
            .map_err(|err| HostingError::Decode(err.to_string()))?;
        Ok(out.id)
    }

    #[instrument(skip(self), fields(installation_id, owner, repo))]
    pub async fn add_reaction(
        &self,
        installation_id: i64,
        owner: &str,
        repo: &str,
        comment_id: u64,
        reaction: &str,
    ) -> HostingResult<()> {
        let payload = ReactionRequest { content: reaction };
        let path = format!("/repos/{owner}/{repo}/issues/comments/{comment_id}/reactions");
        let resp = self
            .authed(installation_id, Method::POST, &path, |rb| {
                rb.json(&payload)
                    .header("Accept", "application/vnd.github.squirrel-girl-preview+json")
            })
            .await?;
        Self::ensure_success(resp).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(installation_id, owner, repo))]
    pub async fn create_check_run(
        &self,
        installation_id: i64,
        owner: &str,
        repo: &str,
        name: &str,
        head_sha: &str,
        status: &str,
    ) -> HostingResult<u64> {
        let payload = CreateCheckRunRequest {
            name,
            head_sha,
            status,
            output: None,
        };
        let path = format!("/repos/{owner}/{repo}/check-runs");
        let resp = self
            .authed(installation_id, Method::POST, &path, |rb| rb.json(&payload))
            .await?;
        let resp = Self::ensure_success(resp).await?;
        let out: CheckRunResponse = resp
            .json()
            .await
            .map_err(|err| HostingError::Decode(err.to_string()))?;
        Ok(out.id)
    }

    #[instrument(skip(self, title, summary), fields(installation_id, owner, repo))]
    pub async fn update_check_run(
        &self,
        installation_id: i64,
        owner: &str,
        repo: &str,
        check_run_id: u64,
        status: Option<&str>,
        conclusion: Option<&str>,
        title: &str,
        summary: &str,
    ) -> HostingResult<()> {
        let payload = UpdateCheckRunRequest {
            status,
            conclusion,
            output: Some(CheckRunOutput { title, summary }),
        };
        let path = format!("/repos/{owner}/{repo}/check-runs/{check_run_id}");
        let resp = self
            .authed(installation_id, Method::PATCH, &path, |rb| rb.json(&payload))
            .await?;
        Self::ensure_success(resp).await?;
        Ok(())
    }
}

fn snippet(text: &str) -> String {
    let truncated: String = text.chars().take(RESPONSE_SNIPPET_CHARS).collect();
    if truncated.len() < text.len() {
        format!("{truncated}…")
    } else {
        truncated
    }
}

//! The single inbound webhook endpoint: signature verification, event-type
//! switch, dispatch (§6, grounded in the source's `api/webhooks.py`).

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde_json::{Value, json};
use tracing::warn;

use crate::core::app_state::AppState;
use crate::error_handler::{AppError, AppResult};
use crate::webhook_signature;
use review_engine::{InstallationEvent, InstallationRepositoriesEvent, IssueCommentEvent, PullRequestEvent};

const SIGNATURE_HEADER: &str = "x-hub-signature-256";
const EVENT_HEADER: &str = "x-github-event";

pub async fn github_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<Value>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::InvalidSignature)?;

    if !webhook_signature::verify(&state.config.webhook_secret, &body, signature) {
        warn!("rejected webhook with invalid signature");
        return Err(AppError::InvalidSignature);
    }

    let event_name = headers
        .get(EVENT_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("missing X-GitHub-Event header".to_string()))?
        .to_string();

    match event_name.as_str() {
        "pull_request" => {
            let event: PullRequestEvent = serde_json::from_slice(&body)
                .map_err(|err| AppError::BadRequest(err.to_string()))?;
            state.dispatcher.handle_pull_request(event).await?;
            Ok(Json(json!({"status": "queued"})))
        }
        "issue_comment" => {
            let event: IssueCommentEvent = serde_json::from_slice(&body)
                .map_err(|err| AppError::BadRequest(err.to_string()))?;
            state.dispatcher.handle_issue_comment(event).await?;
            Ok(Json(json!({"status": "queued"})))
        }
        "installation" => {
            let event: InstallationEvent = serde_json::from_slice(&body)
                .map_err(|err| AppError::BadRequest(err.to_string()))?;
            state.dispatcher.handle_installation(event).await?;
            Ok(Json(json!({"status": "processed"})))
        }
        "installation_repositories" => {
            let event: InstallationRepositoriesEvent = serde_json::from_slice(&body)
                .map_err(|err| AppError::BadRequest(err.to_string()))?;
            state.dispatcher.handle_installation_repositories(event).await?;
            Ok(Json(json!({"status": "processed"})))
        }
        "ping" => Ok(Json(json!({"status": "pong"}))),
        other => Ok(Json(json!({"status": "ignored", "event": other}))),
    }
}

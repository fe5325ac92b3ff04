use std::time::{Duration, Instant};

use reqwest::header;
use tracing::{debug, error, info, warn};

use crate::error::{AiError, AiResult};
use crate::prompt::{build_system_prompt, build_user_prompt, strip_code_fence};
use crate::types::{AiReview, RawReviewJson, ReviewRequest, RiskLevel};
use crate::wire::{Message, MessagesRequest, MessagesResponse};

const MAX_SUMMARY_EXCERPT_CHARS: usize = 280;

#[derive(Clone)]
pub struct AiReviewerConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

/// Thin, non-streaming client around a single chat-style AI endpoint.
///
/// Mirrors the shape of a minimal OpenAI-style chat client: one
/// preconfigured [`reqwest::Client`] with auth headers baked in, one POST
/// per review, normalized errors. The difference from a generic chat
/// client is [`AiReviewer::review`]'s JSON-degradation contract: malformed
/// model output never becomes an error, it becomes a low-confidence
/// [`AiReview`].
pub struct AiReviewer {
    client: reqwest::Client,
    url: String,
}

impl AiReviewer {
    pub fn new(cfg: AiReviewerConfig) -> AiResult<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            "x-api-key",
            header::HeaderValue::from_str(&cfg.api_key)
                .map_err(|err| AiError::Decode(format!("invalid api key header: {err}")))?,
        );
        headers.insert("anthropic-version", header::HeaderValue::from_static("2023-06-01"));
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .default_headers(headers)
            .build()?;

        let url = format!("{}/v1/messages", cfg.base_url.trim_end_matches('/'));
        Ok(Self { client, url })
    }

    /// Performs one review call. Transport and non-2xx failures return
    /// `Err`; a malformed-but-200 response degrades to a placeholder
    /// [`AiReview`] instead (per the component's documented contract) and
    /// still carries the real token usage from the envelope.
    pub async fn review(&self, req: &ReviewRequest<'_>) -> AiResult<AiReview> {
        let started = Instant::now();
        let system = build_system_prompt(req);
        let user = build_user_prompt(req);

        let body = MessagesRequest {
            model: req.model,
            max_tokens: req.max_tokens,
            system: &system,
            messages: vec![Message { role: "user", content: &user }],
        };

        debug!(model = req.model, diff_len = req.diff_text.len(), "POST {}", self.url);

        let resp = self.client.post(&self.url).json(&body).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            let snippet: String = text.chars().take(300).collect();
            error!(%status, %snippet, latency_ms = started.elapsed().as_millis(), "ai endpoint returned non-success status");
            return Err(AiError::from_status(status, snippet));
        }

        let envelope: MessagesResponse = resp
            .json()
            .await
            .map_err(|err| AiError::Decode(err.to_string()))?;

        let raw_text = envelope
            .content
            .first()
            .map(|block| block.text.as_str())
            .unwrap_or_default();

        info!(
            input_tokens = envelope.usage.input_tokens,
            output_tokens = envelope.usage.output_tokens,
            latency_ms = started.elapsed().as_millis(),
            "ai review call completed"
        );

        let review = match serde_json::from_str::<RawReviewJson>(strip_code_fence(raw_text)) {
            Ok(parsed) => AiReview {
                summary: parsed.summary,
                risk_level: parsed.risk_level,
                comments: parsed.comments,
                input_tokens: envelope.usage.input_tokens,
                output_tokens: envelope.usage.output_tokens,
            },
            Err(err) => {
                warn!(error = %err, "failed to decode ai review json, degrading to placeholder");
                degraded_review(raw_text, envelope.usage.input_tokens, envelope.usage.output_tokens)
            }
        };

        Ok(review)
    }
}

fn degraded_review(raw_text: &str, input_tokens: u64, output_tokens: u64) -> AiReview {
    let excerpt: String = raw_text.chars().take(MAX_SUMMARY_EXCERPT_CHARS).collect();
    AiReview {
        summary: format!("AI response could not be parsed as structured review JSON. Raw excerpt: {excerpt}"),
        risk_level: RiskLevel::Medium,
        comments: Vec::new(),
        input_tokens,
        output_tokens,
    }
}

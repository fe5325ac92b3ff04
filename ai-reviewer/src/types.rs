//! Public request/response shapes. `ai-reviewer` knows nothing about the
//! `review-engine` crate's `ReviewConfig` — callers flatten the pieces the
//! prompt needs into a [`RuleSet`] and [`ReviewRequest`] themselves.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    pub security: bool,
    pub performance: bool,
    pub style: bool,
    pub bugs: bool,
    pub documentation: bool,
    /// `(name, description)` pairs for repo-defined custom rules.
    pub custom: Vec<(String, String)>,
}

pub struct ReviewRequest<'a> {
    pub pr_title: &'a str,
    pub pr_body: Option<&'a str>,
    pub diff_text: &'a str,
    /// Concatenated context files, already truncated to the 5-file /
    /// 5000-byte-per-file limit by the caller.
    pub context_blob: Option<&'a str>,
    pub rules: &'a RuleSet,
    pub languages: &'a [String],
    pub frameworks: &'a [String],
    pub additional_instructions: Option<&'a str>,
    pub model: &'a str,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// Mirrors `review_engine::models::CommentSeverity`'s domain — `ai-reviewer`
/// doesn't depend on `review-engine` (the dependency runs the other way), so
/// the five-value vocabulary is duplicated here rather than shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Suggestion,
    Nitpick,
    Praise,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AiReviewComment {
    pub file: String,
    pub line: u32,
    pub severity: Severity,
    pub category: String,
    pub message: String,
    #[serde(default)]
    pub suggested_fix: Option<String>,
}

/// The structured outcome of one review call — either parsed straight from
/// the model's JSON, or a degraded placeholder when that parse failed.
#[derive(Debug, Clone)]
pub struct AiReview {
    pub summary: String,
    pub risk_level: RiskLevel,
    pub comments: Vec<AiReviewComment>,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// The raw JSON shape the model is instructed to produce, before token
/// counts (which come from the envelope, not the model's own text) are
/// attached.
#[derive(Debug, Deserialize)]
pub(crate) struct RawReviewJson {
    pub summary: String,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub comments: Vec<AiReviewComment>,
}

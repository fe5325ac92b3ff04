//! The `.aireviewer.yaml` shape (§6) and the loader that fetches, caches,
//! and falls back to defaults for it (grounded in the source's
//! `load_repo_config`).

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use hosting_client::HostingClient;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ReviewResult;
use crate::store::Store;

const CONFIG_CACHE_TTL_MINUTES: i64 = 5;
const CONFIG_FILE_PATH: &str = ".aireviewer.yaml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathRules {
    #[serde(default = "default_include")]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

fn default_include() -> Vec<String> {
    vec!["**/*".to_string()]
}

impl Default for PathRules {
    fn default() -> Self {
        Self { include: default_include(), exclude: Vec::new() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleToggles {
    #[serde(default = "default_true")]
    pub security: bool,
    #[serde(default = "default_true")]
    pub performance: bool,
    #[serde(default = "default_true")]
    pub style: bool,
    #[serde(default = "default_true")]
    pub bugs: bool,
    #[serde(default)]
    pub documentation: bool,
    #[serde(default)]
    pub custom: std::collections::BTreeMap<String, String>,
}

fn default_true() -> bool {
    true
}

impl Default for RuleToggles {
    fn default() -> Self {
        Self {
            security: true,
            performance: true,
            style: true,
            bugs: true,
            documentation: false,
            custom: Default::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    #[serde(default)]
    pub paths: PathRules,
    #[serde(default)]
    pub rules: RuleToggles,
    #[serde(default = "default_true")]
    pub auto_review: bool,
    #[serde(default = "default_review_on")]
    pub review_on: Vec<String>,
    #[serde(default = "default_max_files")]
    pub max_files: u32,
    #[serde(default)]
    pub context_files: Vec<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub frameworks: Vec<String>,
    #[serde(default)]
    pub additional_instructions: Option<String>,
}

fn default_review_on() -> Vec<String> {
    vec!["opened".to_string(), "synchronize".to_string()]
}

fn default_max_files() -> u32 {
    50
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            paths: PathRules::default(),
            rules: RuleToggles::default(),
            auto_review: true,
            review_on: default_review_on(),
            max_files: default_max_files(),
            context_files: Vec::new(),
            model: None,
            languages: Vec::new(),
            frameworks: Vec::new(),
            additional_instructions: None,
        }
    }
}

impl ReviewConfig {
    pub fn to_rule_set(&self) -> ai_reviewer::RuleSet {
        ai_reviewer::RuleSet {
            security: self.rules.security,
            performance: self.rules.performance,
            style: self.rules.style,
            bugs: self.rules.bugs,
            documentation: self.rules.documentation,
            custom: self.rules.custom.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        }
    }
}

/// Fetches `.aireviewer.yaml` from a repo's default branch, with a 5-minute
/// cache TTL keyed off `Repository.config_fetched_at` and a fall back to
/// all-defaults on any miss — missing file, fetch error, or parse error.
pub struct ConfigLoader {
    hosting: Arc<HostingClient>,
}

impl ConfigLoader {
    pub fn new(hosting: Arc<HostingClient>) -> Self {
        Self { hosting }
    }

    pub async fn load<S: Store>(
        &self,
        store: &S,
        installation_id: i64,
        repo: &crate::models::Repository,
    ) -> ReviewResult<ReviewConfig> {
        if let Some(fetched_at) = repo.config_fetched_at {
            if Utc::now() - fetched_at < ChronoDuration::minutes(CONFIG_CACHE_TTL_MINUTES) {
                if let Some(yaml) = &repo.config_yaml {
                    return Ok(parse_or_default(yaml));
                }
            }
        }

        let (owner, name) = repo
            .full_name
            .split_once('/')
            .unwrap_or((repo.full_name.as_str(), ""));

        let config = match self
            .hosting
            .get_file_content(installation_id, owner, name, CONFIG_FILE_PATH, &repo.default_branch)
            .await
        {
            Ok(raw) => {
                let parsed = parse_or_default(&raw);
                store
                    .set_repository_config(&repo.full_name, Some(raw), Utc::now())
                    .await?;
                parsed
            }
            Err(err) => {
                debug!(repo = %repo.full_name, error = %err, "no .aireviewer.yaml, using defaults");
                store.set_repository_config(&repo.full_name, None, Utc::now()).await?;
                ReviewConfig::default()
            }
        };

        Ok(config)
    }
}

fn parse_or_default(yaml: &str) -> ReviewConfig {
    match serde_yml::from_str::<ReviewConfig>(yaml) {
        Ok(config) => config,
        Err(err) => {
            warn!(error = %err, "failed to parse .aireviewer.yaml, using defaults");
            ReviewConfig::default()
        }
    }
}

//! Layered environment-variable configuration, validated at startup
//! (grounded in the teacher's `RagConfig::from_env`/`validate` pattern).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{0} is invalid: {1}")]
    Invalid(&'static str, String),
}

#[derive(Debug, Clone)]
pub struct Config {
    // Accepted but unused by the in-memory store; see DESIGN.md.
    pub database_url: Option<String>,
    pub scheduler_queue_url: Option<String>,

    pub github_api_base_url: String,
    pub app_id: String,
    pub app_private_key_pem: Vec<u8>,
    pub webhook_secret: String,

    pub ai_api_key: String,
    pub ai_endpoint_base_url: String,
    pub default_model: String,
    pub max_tokens_per_review: u32,
    pub input_token_cost_cents_per_million: f64,
    pub output_token_cost_cents_per_million: f64,

    pub default_monthly_budget_cents: i64,
    pub max_files_per_review: u32,
    pub max_diff_size_bytes: usize,
    pub enable_line_comments: bool,
    pub review_debounce_seconds: u64,
    pub bot_triggers: Vec<String>,

    pub host: String,
    pub port: u16,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        use std::env;

        let required = |key: &'static str| -> Result<String, ConfigError> {
            env::var(key).map_err(|_| ConfigError::Missing(key))
        };

        let parse_or = |key: &str, default: &str| -> String {
            env::var(key).unwrap_or_else(|_| default.to_string())
        };

        let app_id = required("APP_ID")?;
        let app_private_key_pem = required("APP_PRIVATE_KEY_PEM")?.into_bytes();
        let webhook_secret = required("WEBHOOK_SECRET")?;
        let ai_api_key = required("AI_API_KEY")?;

        let max_tokens_per_review = parse_or("MAX_TOKENS_PER_REVIEW", "4096")
            .parse()
            .map_err(|_| ConfigError::Invalid("MAX_TOKENS_PER_REVIEW", "not a u32".into()))?;

        let input_token_cost_cents_per_million = parse_or("INPUT_TOKEN_COST_CENTS_PER_MILLION", "300")
            .parse()
            .map_err(|_| {
                ConfigError::Invalid("INPUT_TOKEN_COST_CENTS_PER_MILLION", "not a number".into())
            })?;

        let output_token_cost_cents_per_million =
            parse_or("OUTPUT_TOKEN_COST_CENTS_PER_MILLION", "1500").parse().map_err(|_| {
                ConfigError::Invalid("OUTPUT_TOKEN_COST_CENTS_PER_MILLION", "not a number".into())
            })?;

        let default_monthly_budget_cents = parse_or("DEFAULT_MONTHLY_BUDGET_CENTS", "2000")
            .parse()
            .map_err(|_| {
                ConfigError::Invalid("DEFAULT_MONTHLY_BUDGET_CENTS", "not an i64".into())
            })?;

        let max_files_per_review = parse_or("MAX_FILES_PER_REVIEW", "50")
            .parse()
            .map_err(|_| ConfigError::Invalid("MAX_FILES_PER_REVIEW", "not a u32".into()))?;

        let max_diff_size_bytes = parse_or("MAX_DIFF_SIZE_BYTES", "1000000")
            .parse()
            .map_err(|_| ConfigError::Invalid("MAX_DIFF_SIZE_BYTES", "not a usize".into()))?;

        let enable_line_comments = parse_or("ENABLE_LINE_COMMENTS", "true")
            .eq_ignore_ascii_case("true");

        let review_debounce_seconds = parse_or("REVIEW_DEBOUNCE_SECONDS", "30")
            .parse()
            .map_err(|_| ConfigError::Invalid("REVIEW_DEBOUNCE_SECONDS", "not a u64".into()))?;

        let bot_triggers = env::var("BOT_TRIGGERS")
            .map(|raw| raw.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_else(|_| {
                vec!["@reviewer".to_string(), "@procrasturbate".to_string(), "it's gooning time".to_string()]
            });

        let port = parse_or("PORT", "8080")
            .parse()
            .map_err(|_| ConfigError::Invalid("PORT", "not a u16".into()))?;

        let config = Self {
            database_url: env::var("DATABASE_URL").ok(),
            scheduler_queue_url: env::var("SCHEDULER_QUEUE_URL").ok(),
            github_api_base_url: parse_or("GITHUB_API_BASE_URL", "https://api.github.com"),
            app_id,
            app_private_key_pem,
            webhook_secret,
            ai_api_key,
            ai_endpoint_base_url: parse_or("AI_ENDPOINT_BASE_URL", "https://api.anthropic.com"),
            default_model: parse_or("DEFAULT_MODEL", "claude-sonnet-4-5"),
            max_tokens_per_review,
            input_token_cost_cents_per_million,
            output_token_cost_cents_per_million,
            default_monthly_budget_cents,
            max_files_per_review,
            max_diff_size_bytes,
            enable_line_comments,
            review_debounce_seconds,
            bot_triggers,
            host: parse_or("HOST", "0.0.0.0"),
            port,
            log_level: parse_or("LOG_LEVEL", "info"),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.app_id.trim().is_empty() {
            return Err(ConfigError::Invalid("APP_ID", "empty".into()));
        }
        if self.app_private_key_pem.is_empty() {
            return Err(ConfigError::Invalid("APP_PRIVATE_KEY_PEM", "empty".into()));
        }
        if self.webhook_secret.trim().is_empty() {
            return Err(ConfigError::Invalid("WEBHOOK_SECRET", "empty".into()));
        }
        if !(self.ai_endpoint_base_url.starts_with("http://")
            || self.ai_endpoint_base_url.starts_with("https://"))
        {
            return Err(ConfigError::Invalid(
                "AI_ENDPOINT_BASE_URL",
                self.ai_endpoint_base_url.clone(),
            ));
        }
        if self.bot_triggers.is_empty() {
            return Err(ConfigError::Invalid("BOT_TRIGGERS", "empty".into()));
        }
        Ok(())
    }
}

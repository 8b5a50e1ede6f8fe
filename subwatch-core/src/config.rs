use crate::error::{ConfigError, CoreError};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 300;
pub const MIN_POLL_INTERVAL_SECS: u64 = 10;

const DEFAULT_STATE_FILE: &str = "seen_items.json";
const DEFAULT_USER_AGENT: &str = "subwatch/0.1";
const DEFAULT_LLM_API_BASE: &str = "https://api.openai.com/v1";

/// Optional AI relevance gate. Present only when the full set of LLM
/// variables is configured.
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub api_key: String,
    pub model: String,
    pub prompt: String,
    pub api_base: String,
}

/// Process-wide configuration, loaded once at startup from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub reddit_client_id: String,
    pub reddit_client_secret: String,
    pub reddit_user_agent: String,
    pub discord_webhook_url: String,
    pub subreddits: Vec<String>,
    pub search_term: String,
    pub state_file: PathBuf,
    pub poll_interval_secs: u64,
    pub ai: Option<AiConfig>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_source(&|name| env::var(name).ok())
    }

    fn from_source(get: &impl Fn(&str) -> Option<String>) -> Result<Self, CoreError> {
        let reddit_client_id = require(get, "REDDIT_CLIENT_ID")?;
        let reddit_client_secret = require(get, "REDDIT_CLIENT_SECRET")?;
        let discord_webhook_url = require(get, "DISCORD_WEBHOOK_URL")?;
        let subreddits = parse_subreddits(&require(get, "SUBREDDITS")?)?;
        let search_term = require(get, "SEARCH_TERM")?;

        let reddit_user_agent =
            non_empty(get("REDDIT_USER_AGENT")).unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let state_file = PathBuf::from(
            non_empty(get("STATE_FILE")).unwrap_or_else(|| DEFAULT_STATE_FILE.to_string()),
        );
        let poll_interval_secs = parse_poll_interval(get("POLL_INTERVAL_SECS"))?;
        let ai = resolve_ai_config(get)?;

        Ok(Self {
            reddit_client_id,
            reddit_client_secret,
            reddit_user_agent,
            discord_webhook_url,
            subreddits,
            search_term,
            state_file,
            poll_interval_secs,
            ai,
        })
    }
}

fn require(get: &impl Fn(&str) -> Option<String>, name: &str) -> Result<String, CoreError> {
    non_empty(get(name)).ok_or_else(|| {
        CoreError::Config(ConfigError::MissingEnvironmentVariable {
            var_name: name.to_string(),
        })
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_subreddits(raw: &str) -> Result<Vec<String>, CoreError> {
    let subreddits: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if subreddits.is_empty() {
        return Err(CoreError::Config(ConfigError::InvalidValue {
            field: "SUBREDDITS".to_string(),
            value: raw.to_string(),
        }));
    }
    Ok(subreddits)
}

fn parse_poll_interval(raw: Option<String>) -> Result<u64, CoreError> {
    let interval = match non_empty(raw) {
        None => DEFAULT_POLL_INTERVAL_SECS,
        Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
            CoreError::Config(ConfigError::InvalidValue {
                field: "POLL_INTERVAL_SECS".to_string(),
                value: raw.clone(),
            })
        })?,
    };

    if interval < MIN_POLL_INTERVAL_SECS {
        return Err(CoreError::Config(ConfigError::ValidationFailed {
            reason: format!(
                "poll interval {interval}s is below the {MIN_POLL_INTERVAL_SECS}s floor"
            ),
        }));
    }
    Ok(interval)
}

fn resolve_ai_config(
    get: &impl Fn(&str) -> Option<String>,
) -> Result<Option<AiConfig>, CoreError> {
    let api_key = non_empty(get("LLM_API_KEY"));
    let model = non_empty(get("LLM_MODEL"));
    let prompt = non_empty(get("LLM_PROMPT"));

    match (api_key, model, prompt) {
        (Some(api_key), Some(model), Some(prompt)) => Ok(Some(AiConfig {
            api_key,
            model,
            prompt,
            api_base: non_empty(get("LLM_API_BASE"))
                .unwrap_or_else(|| DEFAULT_LLM_API_BASE.to_string()),
        })),
        (None, None, None) => Ok(None),
        _ => Err(CoreError::Config(ConfigError::ValidationFailed {
            reason: "LLM_API_KEY, LLM_MODEL and LLM_PROMPT must be set together".to_string(),
        })),
    }
}

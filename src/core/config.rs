use std::env;
use std::str::FromStr;

use crate::openai::CompletionParams;

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_TOKEN_BUDGET: usize = 3500;
pub const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub openai_model: String,
    pub openai_api_hostname: String,
    pub openai_api_key: String,
    pub completion_params: CompletionParams,
    pub token_budget: usize,
    pub max_retries: u32,
}

// Unset or unparseable numeric settings fall back to the default
// rather than failing the whole run.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    parse_or(key, env::var(key).ok(), default)
}

fn parse_or<T: FromStr>(key: &str, value: Option<String>, default: T) -> T {
    match value {
        Some(val) => val.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid value for {}: {}", key, val);
            default
        }),
        None => default,
    }
}

// A session needs at least one attempt at a well formed reply
fn retries_or_default(retries: u32) -> u32 {
    if retries == 0 {
        tracing::warn!(
            "Ignoring ELICIT_MAX_RETRIES=0, using {}",
            DEFAULT_MAX_RETRIES
        );
        return DEFAULT_MAX_RETRIES;
    }
    retries
}

impl Default for AppConfig {
    fn default() -> Self {
        let openai_api_hostname = env::var("ELICIT_LLM_HOST")
            .unwrap_or_else(|_| "https://api.openai.com".to_string());
        let openai_api_key =
            env::var("OPENAI_API_KEY").unwrap_or_else(|_| "thiswontworkforopenai".to_string());
        let openai_model =
            env::var("ELICIT_LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let defaults = CompletionParams::default();
        let completion_params = CompletionParams {
            temperature: env_or("ELICIT_TEMPERATURE", defaults.temperature),
            max_tokens: env_or("ELICIT_MAX_TOKENS", defaults.max_tokens),
        };
        let token_budget = env_or("ELICIT_TOKEN_BUDGET", DEFAULT_TOKEN_BUDGET);
        let max_retries = retries_or_default(env_or("ELICIT_MAX_RETRIES", DEFAULT_MAX_RETRIES));

        Self {
            openai_model,
            openai_api_hostname,
            openai_api_key,
            completion_params,
            token_budget,
            max_retries,
        }
    }
}

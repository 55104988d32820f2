//! Environment-backed configuration
//!
//! Timeout values live here so a stalled model or database call can never
//! hang a pipeline instance indefinitely.

use crate::error::{InsightError, Result};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 30;
const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub database_url: String,
    pub model_timeout: Duration,
    pub query_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| InsightError::Config("OPENAI_API_KEY is not set".to_string()))?;
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| InsightError::Config("DATABASE_URL is not set".to_string()))?;

        Ok(Self {
            api_key,
            base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            model: std::env::var("INSIGHTS_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            database_url,
            model_timeout: Duration::from_secs(env_secs(
                "INSIGHTS_MODEL_TIMEOUT_SECS",
                DEFAULT_MODEL_TIMEOUT_SECS,
            )),
            query_timeout: Duration::from_secs(env_secs(
                "INSIGHTS_QUERY_TIMEOUT_SECS",
                DEFAULT_QUERY_TIMEOUT_SECS,
            )),
        })
    }
}

fn env_secs(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

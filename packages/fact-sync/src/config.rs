//! Environment configuration for the sync job.
//!
//! Required: instance URL, login credentials, and the static API token,
//! plus the target indicator and acting user for written facts. The rest
//! has workable defaults.

use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

use crate::transform::FactTemplate;

/// Everything the job needs before it runs.
#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub login: String,
    pub password: String,
    pub api_token: String,
    /// Row cap for the event query. The API has no cursor, so this is the
    /// whole working set.
    pub event_limit: u32,
    pub template: FactTemplate,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            base_url: env::var("KPI_BASE_URL").context("KPI_BASE_URL must be set")?,
            login: env::var("KPI_LOGIN").context("KPI_LOGIN must be set")?,
            password: env::var("KPI_PASSWORD").context("KPI_PASSWORD must be set")?,
            api_token: env::var("KPI_API_TOKEN").context("KPI_API_TOKEN must be set")?,
            event_limit: env::var("KPI_EVENT_LIMIT")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("KPI_EVENT_LIMIT must be a valid number")?,
            template: FactTemplate {
                period_key: env::var("KPI_PERIOD_KEY").unwrap_or_else(|_| "month".to_string()),
                indicator_to_mo_id: env::var("KPI_INDICATOR_TO_MO_ID")
                    .context("KPI_INDICATOR_TO_MO_ID must be set")?,
                auth_user_id: env::var("KPI_AUTH_USER_ID")
                    .context("KPI_AUTH_USER_ID must be set")?,
                value: env::var("KPI_FACT_VALUE").unwrap_or_else(|_| "1".to_string()),
                is_plan: env::var("KPI_FACT_IS_PLAN").unwrap_or_default(),
                comment: env::var("KPI_FACT_COMMENT").unwrap_or_default(),
            },
        })
    }
}
